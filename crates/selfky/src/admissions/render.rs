use super::domain::{AdmitCard, Application};

/// Rendered admit-card document handed back to the download endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("renderer backend failed: {0}")]
    Backend(String),
}

/// Document rendering seam. The core decides *whether* issuance is allowed
/// and what data populates the card; producing printable bytes is delegated
/// to an external library behind this trait.
pub trait AdmitCardRenderer: Send + Sync {
    fn render(&self, application: &Application, card: &AdmitCard)
        -> Result<RenderedDocument, RenderError>;
}
