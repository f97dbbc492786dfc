//! Word-compatible export: styled HTML inside an Office HTML shell, served as
//! `application/msword`. Word opens it; it is not a binary .doc.

use chrono::{DateTime, Utc};
use tera::{Context, Tera};

use crate::error::ExportError;
use crate::markdown::markdown_to_html;

// The registered name ends in `.html` so tera autoescapes the title.
const TEMPLATE_NAME: &str = "word_document.html";

#[derive(Clone, Debug)]
pub struct DocRenderer {
    tera: Tera,
}

impl DocRenderer {
    pub fn new() -> Result<Self, ExportError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, include_str!("../templates/word_document.html.tera"))?;
        Ok(Self { tera })
    }

    pub fn render(
        &self,
        title: &str,
        markdown: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<String, ExportError> {
        let mut context = Context::new();
        context.insert("title", title);
        context.insert("generated_at", &generated_at.format("%Y-%m-%d %H:%M UTC").to_string());
        context.insert("body", &markdown_to_html(markdown));
        Ok(self.tera.render(TEMPLATE_NAME, &context)?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::DocRenderer;

    #[test]
    fn wraps_styled_html_in_word_shell() {
        let renderer = DocRenderer::new().expect("template loads");
        let html = renderer
            .render("Pre-Submission", "# Overview\n\n**Bold** claim", Utc::now())
            .expect("render");

        assert!(html.contains("urn:schemas-microsoft-com:office:word"));
        assert!(html.contains("<title>Pre-Submission</title>"));
        assert!(html.contains(">Overview</h1>"));
        assert!(html.contains("<span style=\"font-weight: bold;\">Bold</span>"));
    }

    #[test]
    fn title_is_escaped_but_body_is_not() {
        let renderer = DocRenderer::new().expect("template loads");
        let html = renderer.render("R&D <draft>", "plain", Utc::now()).expect("render");

        assert!(html.contains("<title>R&amp;D &lt;draft&gt;</title>"));
        assert!(html.contains("<p style="));
    }
}
