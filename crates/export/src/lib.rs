//! Markdown export to PDF, Word-compatible HTML and plain text.

pub mod doc;
pub mod error;
pub mod markdown;
pub mod pdf;
pub mod service;

pub use error::ExportError;
pub use markdown::{markdown_to_html, strip_markdown};
pub use pdf::{layout_document, DocumentLayout, PageSetup};
pub use service::{default_filename, write_artifact, ExportArtifact, ExportRequest, ExportService};
