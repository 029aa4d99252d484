mod compositor;
mod config;
mod error;
mod export;
mod item;
mod live;
mod model;
mod ports;
mod propagation;
mod session;

pub use compositor::{decode_source, OfflineCompositor};
pub use config::{OutputFormat, RenderConfig};
pub use error::ApplicationError;
pub use export::{ExportCoordinator, ExportOutcome, ExportProgress, ExportState};
pub use item::ImageItem;
pub use live::{CompileOutcome, LiveRenderBinding};
pub use model::{AdjustmentChanged, AdjustmentModel, SubscriptionId};
pub use ports::{
    BrushCompiler, BrushHandle, DestinationPicker, DisplaySurface, FileTypeChoice, ImageDecoder,
    ImageEncoder, OffscreenRenderer, OffscreenTarget, PickOutcome, SaveRequest, SpriteVisual,
    StorageFile, JPEG_FILES, PNG_FILES,
};
pub use propagation::{parameter_key_for, ParameterPropagator};
pub use session::EditingSession;
