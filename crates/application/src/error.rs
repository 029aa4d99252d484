use photo_lab_domain::DomainError;

#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("render target error: {0}")]
    RenderTarget(String),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("write error: {0}")]
    Write(String),
    #[error("render backend error: {0}")]
    Backend(String),
}
