use failure::Fail;

use crate::models::document::Document;

/// Produces a printable file from an approved document.
pub trait Renderer: Send + Sync {
    fn render(&self, document: &Document) -> Result<Vec<u8>, failure::Error>;

    /// Extension of files this renderer produces.
    fn extension(&self) -> &str {
        "pdf"
    }
}

/// Keeps generated files.
pub trait FileStore: Send + Sync {
    /// Save a file, returning a reference under which it can later be found.
    fn save(&self, name: &str, data: &[u8]) -> Result<String, failure::Error>;
}

/// File generation failed.
///
/// The document itself is unaffected. Generation can be attempted again.
#[derive(Debug, DomainError, Fail)]
pub enum RenderError {
    #[fail(display = "Cannot render document: {}", _0)]
    #[domain(internal)]
    Render(failure::Error),
    #[fail(display = "Cannot store generated file: {}", _0)]
    #[domain(internal)]
    Save(failure::Error),
}
