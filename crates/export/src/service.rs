use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use regpilot_core::ExportFormat;
use tracing::{info, warn};

use crate::doc::DocRenderer;
use crate::error::ExportError;
use crate::markdown::{first_heading, strip_markdown};
use crate::pdf::{layout_document, render_pdf, PageSetup};

const DEFAULT_STEM: &str = "Document";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub content: String,
    pub filename: Option<String>,
    pub report_type: Option<String>,
    pub title: Option<String>,
}

impl ExportRequest {
    pub fn new(format: ExportFormat, content: impl Into<String>) -> Self {
        Self { format, content: content.into(), filename: None, report_type: None, title: None }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_report_type(mut self, report_type: impl Into<String>) -> Self {
        self.report_type = Some(report_type.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    fn resolved_title(&self) -> String {
        self.title
            .clone()
            .filter(|title| !title.trim().is_empty())
            .or_else(|| first_heading(&self.content))
            .unwrap_or_else(|| DEFAULT_STEM.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportArtifact {
    pub filename: String,
    pub format: ExportFormat,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// `pre_submission` -> `Pre_Submission`; anything that is not alphanumeric separates words.
fn title_case_stem(value: &str) -> Option<String> {
    let words: Vec<String> = value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
                }
                None => String::new(),
            }
        })
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join("_"))
    }
}

/// `<Title_Cased_Report_Type>_<YYYY-MM-DD>.<ext>`; falls back to the title, then `Document`.
pub fn default_filename(
    report_type: Option<&str>,
    title: Option<&str>,
    format: ExportFormat,
    date: NaiveDate,
) -> String {
    let stem = report_type
        .and_then(title_case_stem)
        .or_else(|| title.and_then(title_case_stem))
        .unwrap_or_else(|| DEFAULT_STEM.to_string());
    format!("{stem}_{}.{}", date.format("%Y-%m-%d"), format.extension())
}

fn ensure_extension(filename: &str, format: ExportFormat) -> String {
    let suffix = format!(".{}", format.extension());
    if filename.to_ascii_lowercase().ends_with(&suffix) {
        filename.to_string()
    } else {
        format!("{filename}{suffix}")
    }
}

fn strip_pdf_extension(filename: &str) -> String {
    let stem_len = filename.len().saturating_sub(".pdf".len());
    match filename.get(stem_len..) {
        Some(suffix) if suffix.eq_ignore_ascii_case(".pdf") => filename[..stem_len].to_string(),
        _ => filename.to_string(),
    }
}

/// Produces downloadable artifacts from Markdown content.
#[derive(Clone, Debug)]
pub struct ExportService {
    doc: DocRenderer,
    page: PageSetup,
}

impl ExportService {
    pub fn new() -> Result<Self, ExportError> {
        Ok(Self { doc: DocRenderer::new()?, page: PageSetup::default() })
    }

    pub fn with_page_setup(mut self, page: PageSetup) -> Self {
        self.page = page;
        self
    }

    pub fn export(&self, request: &ExportRequest) -> Result<ExportArtifact, ExportError> {
        self.export_at(request, Utc::now())
    }

    pub fn export_at(
        &self,
        request: &ExportRequest,
        now: DateTime<Utc>,
    ) -> Result<ExportArtifact, ExportError> {
        if request.content.trim().is_empty() {
            return Err(ExportError::EmptyContent);
        }

        let title = request.resolved_title();
        let bytes = match request.format {
            ExportFormat::Txt => strip_markdown(&request.content).into_bytes(),
            ExportFormat::Doc => self.doc.render(&title, &request.content, now)?.into_bytes(),
            ExportFormat::Pdf => {
                let layout = layout_document(&request.content, self.page, now)?;
                render_pdf(&title, &layout)?
            }
        };

        let filename = match request.filename.as_deref().filter(|name| !name.trim().is_empty()) {
            Some(name) => ensure_extension(name.trim(), request.format),
            None => default_filename(
                request.report_type.as_deref(),
                request.title.as_deref(),
                request.format,
                now.date_naive(),
            ),
        };

        info!(
            event_name = "export.artifact.created",
            format = %request.format,
            filename = %filename,
            byte_len = bytes.len(),
            "export artifact created"
        );
        Ok(ExportArtifact {
            filename,
            format: request.format,
            mime_type: request.format.mime_type(),
            bytes,
        })
    }

    /// PDF failures fall back to a plain-text export of the same content.
    pub fn export_with_fallback(
        &self,
        request: &ExportRequest,
    ) -> Result<ExportArtifact, ExportError> {
        match self.export(request) {
            Ok(artifact) => Ok(artifact),
            Err(error @ ExportError::EmptyContent) => Err(error),
            Err(error) if request.format == ExportFormat::Pdf => {
                warn!(
                    event_name = "export.pdf.fallback_to_txt",
                    error = %error,
                    "pdf generation failed; exporting plain text instead"
                );
                let mut fallback = request.clone();
                fallback.format = ExportFormat::Txt;
                fallback.filename = request.filename.as_deref().map(strip_pdf_extension);
                self.export(&fallback)
            }
            Err(error) => Err(error),
        }
    }
}

/// Writes the artifact into `dir`, creating the directory if needed.
pub async fn write_artifact(artifact: &ExportArtifact, dir: &Path) -> Result<PathBuf, ExportError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ExportError::Io { path: dir.to_path_buf(), source })?;

    let path = dir.join(&artifact.filename);
    tokio::fs::write(&path, &artifact.bytes)
        .await
        .map_err(|source| ExportError::Io { path: path.clone(), source })?;

    info!(
        event_name = "export.artifact.written",
        path = %path.display(),
        "export artifact written"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use regpilot_core::ExportFormat;

    use super::{default_filename, write_artifact, ExportRequest, ExportService};
    use crate::error::ExportError;
    use crate::pdf::PageSetup;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).expect("valid date")
    }

    #[test]
    fn default_filename_title_cases_the_report_type() {
        assert_eq!(
            default_filename(Some("pre_submission"), None, ExportFormat::Pdf, date()),
            "Pre_Submission_2026-03-14.pdf"
        );
        assert_eq!(
            default_filename(None, Some("device description"), ExportFormat::Doc, date()),
            "Device_Description_2026-03-14.doc"
        );
        assert_eq!(
            default_filename(Some("  "), None, ExportFormat::Txt, date()),
            "Document_2026-03-14.txt"
        );
    }

    #[test]
    fn txt_export_strips_markdown() {
        let service = ExportService::new().expect("service");
        let artifact = service
            .export(&ExportRequest::new(ExportFormat::Txt, "# Summary\n\n**Safe** and effective"))
            .expect("export");

        assert_eq!(artifact.mime_type, "text/plain;charset=utf-8");
        let text = String::from_utf8(artifact.bytes).expect("utf8");
        assert_eq!(text, "Summary\n\nSafe and effective");
    }

    #[test]
    fn doc_export_uses_msword_mime_and_explicit_filename() {
        let service = ExportService::new().expect("service");
        let artifact = service
            .export(
                &ExportRequest::new(ExportFormat::Doc, "# Summary\n\n- one")
                    .with_filename("summary_final"),
            )
            .expect("export");

        assert_eq!(artifact.filename, "summary_final.doc");
        assert_eq!(artifact.mime_type, "application/msword");
        let html = String::from_utf8(artifact.bytes).expect("utf8");
        assert!(html.contains("<title>Summary</title>"));
        assert!(html.contains("<li>one</li>"));
    }

    #[test]
    fn pdf_export_names_file_from_report_type_and_date() {
        let service = ExportService::new().expect("service");
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 8, 0, 0).single().expect("timestamp");
        let artifact = service
            .export_at(
                &ExportRequest::new(ExportFormat::Pdf, "# Plan\n\nBody")
                    .with_report_type("post-market surveillance"),
                now,
            )
            .expect("export");

        assert_eq!(artifact.filename, "Post_Market_Surveillance_2026-03-14.pdf");
        assert!(artifact.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn empty_content_is_rejected() {
        let service = ExportService::new().expect("service");
        let error = service
            .export_with_fallback(&ExportRequest::new(ExportFormat::Pdf, "   "))
            .expect_err("nothing to export");
        assert!(matches!(error, ExportError::EmptyContent));
    }

    #[test]
    fn failed_pdf_falls_back_to_txt() {
        let service = ExportService::new()
            .expect("service")
            .with_page_setup(PageSetup { margin_mm: 150.0, ..PageSetup::default() });

        let artifact = service
            .export_with_fallback(
                &ExportRequest::new(ExportFormat::Pdf, "# Report\n\nBody")
                    .with_filename("report.pdf"),
            )
            .expect("fallback succeeds");

        assert_eq!(artifact.format, ExportFormat::Txt);
        assert_eq!(artifact.filename, "report.txt");
        assert_eq!(artifact.bytes, b"Report\n\nBody".to_vec());

        let shouted = service
            .export_with_fallback(
                &ExportRequest::new(ExportFormat::Pdf, "# Report").with_filename("Report.PDF"),
            )
            .expect("fallback succeeds");
        assert_eq!(shouted.filename, "Report.txt");
    }

    #[tokio::test]
    async fn artifacts_are_written_into_the_output_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = ExportService::new().expect("service");
        let artifact = service
            .export(&ExportRequest::new(ExportFormat::Txt, "hello").with_filename("notes"))
            .expect("export");

        let target = dir.path().join("exports");
        let path = write_artifact(&artifact, &target).await.expect("write");

        assert_eq!(path, target.join("notes.txt"));
        assert_eq!(tokio::fs::read_to_string(&path).await.expect("read"), "hello");
    }
}
