mod adjustment;
mod bitmap;
mod chain;
mod effects;
mod error;

pub use adjustment::{AdjustmentField, AdjustmentSet};
pub use bitmap::{Bitmap, PixelSize, Rgba};
pub use chain::{
    Backdrop, Effect, EffectChain, EffectStage, ParameterKey, ParameterTable, StageInput,
    BLUR_STAGE, CONTRAST_STAGE, EXPOSURE_STAGE, SATURATION_STAGE, TEMPERATURE_AND_TINT_STAGE,
};
pub use effects::{
    apply_effect, gaussian_kernel, render_stages, white_balance_gains, LUMA_REC709,
    REFERENCE_DPI, WHITE_BALANCE_GAIN,
};
pub use error::DomainError;
