use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export: document content is empty")]
    EmptyContent,
    #[error("page layout failed: {0}")]
    Layout(String),
    #[error("pdf engine failed: {0}")]
    Pdf(String),
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<printpdf::Error> for ExportError {
    fn from(value: printpdf::Error) -> Self {
        Self::Pdf(value.to_string())
    }
}
