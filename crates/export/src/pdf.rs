//! Paginated PDF rendering.
//!
//! Layout and drawing are separate steps. [`layout_document`] turns Markdown blocks
//! into positioned runs on A4 pages; [`render_pdf`] draws that layout with printpdf's
//! built-in Helvetica and Courier faces.

use chrono::{DateTime, Utc};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rect, Rgb,
};
use printpdf::path::PaintMode;
use tracing::debug;

use crate::error::ExportError;
use crate::markdown::{parse_blocks, Block, ListMarker};

const PT_TO_MM: f32 = 0.352_778;
const LINE_SPACING: f32 = 1.35;
const BODY_SIZE: f32 = 11.0;
const CODE_SIZE: f32 = 9.0;
const FOOTER_SIZE: f32 = 8.0;
const LIST_INDENT_MM: f32 = 6.0;
const MARKER_WIDTH_MM: f32 = 5.0;
const BULLET_SIZE_MM: f32 = 1.2;
const CODE_PADDING_MM: f32 = 1.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSetup {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margin_mm: f32,
    pub footer_mm: f32,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self { width_mm: 210.0, height_mm: 297.0, margin_mm: 20.0, footer_mm: 12.0 }
    }
}

impl PageSetup {
    fn content_width(&self) -> f32 {
        self.width_mm - 2.0 * self.margin_mm
    }

    fn top(&self) -> f32 {
        self.height_mm - self.margin_mm
    }

    fn bottom(&self) -> f32 {
        self.margin_mm + self.footer_mm
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
    Mono,
}

impl Face {
    /// Average glyph advance as a fraction of the font size.
    fn advance(self) -> f32 {
        match self {
            Self::Regular => 0.50,
            Self::Bold => 0.55,
            Self::Mono => 0.60,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunKind {
    Heading(u8),
    Body,
    ListMarker,
    Code,
    Footer,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    pub kind: RunKind,
    pub text: String,
    pub face: Face,
    pub size_pt: f32,
    pub x_mm: f32,
    pub y_mm: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shade {
    pub x_mm: f32,
    pub y_mm: f32,
    pub width_mm: f32,
    pub height_mm: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageLayout {
    pub runs: Vec<TextRun>,
    pub shades: Vec<Shade>,
    /// Filled squares drawn as bullet glyphs; the built-in fonts carry no bullet character.
    pub bullets: Vec<Shade>,
}

impl PageLayout {
    pub fn footer(&self) -> Option<&str> {
        self.runs.iter().find(|run| run.kind == RunKind::Footer).map(|run| run.text.as_str())
    }

    pub fn headings(&self) -> impl Iterator<Item = (u8, &str)> {
        self.runs.iter().filter_map(|run| match run.kind {
            RunKind::Heading(level) => Some((level, run.text.as_str())),
            _ => None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DocumentLayout {
    pub setup: PageSetup,
    pub pages: Vec<PageLayout>,
}

impl DocumentLayout {
    pub fn headings(&self) -> Vec<(u8, String)> {
        self.pages
            .iter()
            .flat_map(|page| page.headings().map(|(level, text)| (level, text.to_string())))
            .collect()
    }
}

pub fn heading_size(level: u8) -> f32 {
    match level {
        1 => 20.0,
        2 => 16.0,
        3 => 14.0,
        4 => 12.5,
        _ => BODY_SIZE,
    }
}

fn line_height(size_pt: f32) -> f32 {
    size_pt * PT_TO_MM * LINE_SPACING
}

/// Greedy word wrap against an estimated glyph advance.
pub fn wrap_text(text: &str, width_mm: f32, size_pt: f32, face: Face) -> Vec<String> {
    let char_width = size_pt * PT_TO_MM * face.advance();
    let max_chars = ((width_mm / char_width).floor() as usize).max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let split_at = word.char_indices().nth(max_chars).map_or(word.len(), |(i, _)| i);
            let tail = word.split_off(split_at);
            lines.push(word);
            word = tail;
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

struct Cursor {
    setup: PageSetup,
    pages: Vec<PageLayout>,
    y: f32,
}

impl Cursor {
    fn new(setup: PageSetup) -> Self {
        Self { setup, pages: vec![PageLayout::default()], y: setup.top() }
    }

    /// Reserves `height` on the current page, starting a new page when it does not fit.
    /// Returns the baseline for the reserved line.
    fn reserve(&mut self, height: f32) -> f32 {
        let fits = self.y - height >= self.setup.bottom();
        let page_has_content = self.pages.last().is_some_and(|page| !page.runs.is_empty());
        if !fits && page_has_content {
            self.pages.push(PageLayout::default());
            self.y = self.setup.top();
        }
        self.y -= height;
        self.y + height * 0.25
    }

    fn gap(&mut self, height: f32) {
        if self.pages.last().is_some_and(|page| !page.runs.is_empty()) {
            self.y -= height;
        }
    }

    fn page(&mut self) -> &mut PageLayout {
        if self.pages.is_empty() {
            self.pages.push(PageLayout::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn text(&mut self, kind: RunKind, face: Face, size_pt: f32, x_mm: f32, text: String) -> f32 {
        let baseline = self.reserve(line_height(size_pt));
        self.page().runs.push(TextRun { kind, text, face, size_pt, x_mm, y_mm: baseline });
        baseline
    }
}

/// Lays Markdown out on pages. Footers read `Page N of M` followed by `generated_at`.
pub fn layout_document(
    markdown: &str,
    setup: PageSetup,
    generated_at: DateTime<Utc>,
) -> Result<DocumentLayout, ExportError> {
    if setup.content_width() <= 0.0 || setup.top() - setup.bottom() < line_height(heading_size(1))
    {
        return Err(ExportError::Layout(format!(
            "page {}x{}mm with {}mm margins has no printable area",
            setup.width_mm, setup.height_mm, setup.margin_mm
        )));
    }

    let left = setup.margin_mm;
    let width = setup.content_width();
    let mut cursor = Cursor::new(setup);

    for block in parse_blocks(markdown) {
        match block {
            Block::Heading { level, text } => {
                let size = heading_size(level);
                cursor.gap(line_height(size) * 0.5);
                for line in wrap_text(&text, width, size, Face::Bold) {
                    cursor.text(RunKind::Heading(level), Face::Bold, size, left, line);
                }
                cursor.gap(1.5);
            }
            Block::Paragraph(text) => {
                for line in wrap_text(&text, width, BODY_SIZE, Face::Regular) {
                    cursor.text(RunKind::Body, Face::Regular, BODY_SIZE, left, line);
                }
                cursor.gap(2.5);
            }
            Block::ListItem { marker, depth, text } => {
                let marker_x = left + LIST_INDENT_MM * depth as f32;
                let text_x = marker_x + MARKER_WIDTH_MM;
                let lines = wrap_text(&text, width - (text_x - left), BODY_SIZE, Face::Regular);
                for (index, line) in lines.into_iter().enumerate() {
                    let baseline =
                        cursor.text(RunKind::Body, Face::Regular, BODY_SIZE, text_x, line);
                    if index > 0 {
                        continue;
                    }
                    match marker {
                        ListMarker::Bullet => cursor.page().bullets.push(Shade {
                            x_mm: marker_x + 1.0,
                            y_mm: baseline + 0.6,
                            width_mm: BULLET_SIZE_MM,
                            height_mm: BULLET_SIZE_MM,
                        }),
                        ListMarker::Number(number) => cursor.page().runs.push(TextRun {
                            kind: RunKind::ListMarker,
                            text: format!("{number}."),
                            face: Face::Regular,
                            size_pt: BODY_SIZE,
                            x_mm: marker_x,
                            y_mm: baseline,
                        }),
                    }
                }
                cursor.gap(1.0);
            }
            Block::Code(lines) => {
                let height = line_height(CODE_SIZE);
                for source_line in lines {
                    let wrapped = wrap_text(
                        &source_line,
                        width - 2.0 * CODE_PADDING_MM,
                        CODE_SIZE,
                        Face::Mono,
                    );
                    // Blank source lines still occupy a shaded row.
                    let wrapped = if wrapped.is_empty() { vec![String::new()] } else { wrapped };
                    for line in wrapped {
                        let baseline = cursor.text(
                            RunKind::Code,
                            Face::Mono,
                            CODE_SIZE,
                            left + CODE_PADDING_MM,
                            line,
                        );
                        cursor.page().shades.push(Shade {
                            x_mm: left,
                            y_mm: baseline - height * 0.25,
                            width_mm: width,
                            height_mm: height,
                        });
                    }
                }
                cursor.gap(2.5);
            }
            Block::Rule => cursor.gap(line_height(BODY_SIZE)),
        }
    }

    let total = cursor.pages.len();
    let stamp = generated_at.format("%Y-%m-%d %H:%M UTC");
    for (index, page) in cursor.pages.iter_mut().enumerate() {
        page.runs.push(TextRun {
            kind: RunKind::Footer,
            text: format!("Page {} of {total}  |  Generated {stamp}", index + 1),
            face: Face::Regular,
            size_pt: FOOTER_SIZE,
            x_mm: left,
            y_mm: setup.margin_mm,
        });
    }

    debug!(
        event_name = "export.pdf.layout_computed",
        page_count = total,
        "pdf layout computed"
    );
    Ok(DocumentLayout { setup, pages: cursor.pages })
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    mono: IndirectFontRef,
}

impl Fonts {
    fn face(&self, face: Face) -> &IndirectFontRef {
        match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
            Face::Mono => &self.mono,
        }
    }
}

fn fill(layer: &PdfLayerReference, grey: f32) {
    layer.set_fill_color(Color::Rgb(Rgb::new(grey, grey, grey, None)));
}

fn fill_rect(layer: &PdfLayerReference, shade: &Shade) {
    layer.add_rect(
        Rect::new(
            Mm(shade.x_mm),
            Mm(shade.y_mm),
            Mm(shade.x_mm + shade.width_mm),
            Mm(shade.y_mm + shade.height_mm),
        )
        .with_mode(PaintMode::Fill),
    );
}

/// Draws a computed layout and returns the PDF bytes.
pub fn render_pdf(title: &str, layout: &DocumentLayout) -> Result<Vec<u8>, ExportError> {
    let setup = layout.setup;
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(setup.width_mm), Mm(setup.height_mm), "Layer 1");
    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
        mono: doc.add_builtin_font(BuiltinFont::Courier)?,
    };

    for (index, page) in layout.pages.iter().enumerate() {
        let (page_index, layer_index) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(setup.width_mm), Mm(setup.height_mm), "Layer 1")
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);

        fill(&layer, 0.94);
        for shade in &page.shades {
            fill_rect(&layer, shade);
        }
        fill(&layer, 0.1);
        for bullet in &page.bullets {
            fill_rect(&layer, bullet);
        }
        for run in &page.runs {
            if run.text.is_empty() {
                continue;
            }
            layer.use_text(
                run.text.as_str(),
                run.size_pt,
                Mm(run.x_mm),
                Mm(run.y_mm),
                fonts.face(run.face),
            );
        }
    }

    Ok(doc.save_to_bytes()?)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{layout_document, render_pdf, wrap_text, Face, PageSetup, RunKind};
    use crate::error::ExportError;

    fn generated_at() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).single().expect("valid timestamp")
    }

    #[test]
    fn headings_are_sized_by_level() {
        let layout =
            layout_document("# Title\n\n## Section\n\nBody", PageSetup::default(), generated_at())
                .expect("layout");

        let runs = &layout.pages[0].runs;
        let title = runs.iter().find(|run| run.text == "Title").expect("title run");
        let section = runs.iter().find(|run| run.text == "Section").expect("section run");
        let body = runs.iter().find(|run| run.text == "Body").expect("body run");

        assert_eq!(title.kind, RunKind::Heading(1));
        assert!(title.size_pt > section.size_pt);
        assert!(section.size_pt > body.size_pt);
        assert!(title.y_mm > section.y_mm && section.y_mm > body.y_mm);
    }

    #[test]
    fn lists_get_bullets_and_numerals() {
        let layout = layout_document(
            "- first\n- second\n\n3. third\n4. fourth",
            PageSetup::default(),
            generated_at(),
        )
        .expect("layout");
        let page = &layout.pages[0];

        assert_eq!(page.bullets.len(), 2);
        let numerals: Vec<&str> = page
            .runs
            .iter()
            .filter(|run| run.kind == RunKind::ListMarker)
            .map(|run| run.text.as_str())
            .collect();
        assert_eq!(numerals, vec!["3.", "4."]);
    }

    #[test]
    fn code_lines_are_monospaced_on_shaded_rows() {
        let layout = layout_document(
            "```\nfn main() {}\n\nlet x = 1;\n```",
            PageSetup::default(),
            generated_at(),
        )
        .expect("layout");
        let page = &layout.pages[0];

        let code_runs: Vec<_> = page.runs.iter().filter(|run| run.kind == RunKind::Code).collect();
        assert_eq!(code_runs.len(), 3);
        assert!(code_runs.iter().all(|run| run.face == Face::Mono));
        assert_eq!(page.shades.len(), 3);
    }

    #[test]
    fn long_documents_paginate_with_numbered_footers() {
        let paragraph = "Biocompatibility testing followed ISO 10993-1 for every patient-contacting \
                         component of the delivery system. ";
        let markdown = (0..60).map(|_| paragraph).collect::<Vec<_>>().join("\n\n");

        let layout =
            layout_document(&markdown, PageSetup::default(), generated_at()).expect("layout");

        assert!(layout.pages.len() > 1);
        let total = layout.pages.len();
        for (index, page) in layout.pages.iter().enumerate() {
            let footer = page.footer().expect("footer");
            assert!(footer.starts_with(&format!("Page {} of {total}", index + 1)));
            assert!(footer.ends_with("Generated 2026-03-14 09:30 UTC"));

            let bottom = layout.setup.margin_mm + layout.setup.footer_mm;
            assert!(page
                .runs
                .iter()
                .filter(|run| run.kind != RunKind::Footer)
                .all(|run| run.y_mm >= bottom - 1.0));
        }
    }

    #[test]
    fn wrap_respects_width_and_splits_long_words() {
        let lines = wrap_text("alpha beta gamma delta", 20.0, 11.0, Face::Regular);
        assert!(lines.len() > 1);
        assert_eq!(lines.join(" "), "alpha beta gamma delta");

        let long = "x".repeat(200);
        let lines = wrap_text(&long, 30.0, 11.0, Face::Regular);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), long);
    }

    #[test]
    fn page_without_printable_area_is_rejected() {
        let setup = PageSetup { margin_mm: 120.0, ..PageSetup::default() };
        let error = layout_document("# Title", setup, generated_at()).expect_err("no room");
        assert!(matches!(error, ExportError::Layout(_)));
    }

    #[test]
    fn rendered_bytes_are_a_pdf() {
        let markdown = "# Title\n\n- item\n\n```\ncode\n```";
        let layout =
            layout_document(markdown, PageSetup::default(), generated_at()).expect("layout");
        let bytes = render_pdf("Title", &layout).expect("render");
        assert!(bytes.starts_with(b"%PDF"));
    }
}
