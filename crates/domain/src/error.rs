#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("bitmap dimensions must be non-zero, got {width}x{height}")]
    EmptyBitmap { width: u32, height: u32 },
    #[error("bitmap of {width}x{height} expects {expected} pixels, got {actual}")]
    PixelCountMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("parameter key must look like <Stage>.<Parameter>, got {0:?}")]
    MalformedParameterKey(String),
    #[error("effect chain has no parameter {0}")]
    UnknownParameter(String),
}
