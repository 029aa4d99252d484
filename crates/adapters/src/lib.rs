pub mod codec;
pub mod fs;
pub mod logging;
pub mod render;
pub mod surface;

use std::path::PathBuf;
use std::rc::Rc;

use photo_lab_application::{
    ApplicationError, DestinationPicker, DisplaySurface, EditingSession, ExportCoordinator,
    ImageItem, OfflineCompositor, RenderConfig,
};
use tracing::info;

pub use codec::{ImageCrateDecoder, ImageCrateEncoder};
pub use fs::{FsStorageFile, PresetDestinationPicker};
pub use logging::init_logging;
pub use render::{
    default_executor, CpuStageExecutor, ExecutorBrushCompiler, ExecutorOffscreenRenderer,
    StageExecutor, WgpuStageExecutor,
};
pub use surface::HeadlessSurface;

/// Opens the photo at `source` with the default render backend.
pub fn open_session(
    source: impl Into<PathBuf>,
    surface: Box<dyn DisplaySurface>,
    picker: Box<dyn DestinationPicker>,
    config: RenderConfig,
) -> Result<EditingSession, ApplicationError> {
    open_session_with(default_executor(), source, surface, picker, config)
}

/// Opens the photo at `source`, rendering live frames and exports with
/// `executor`.
pub fn open_session_with(
    executor: Rc<dyn StageExecutor>,
    source: impl Into<PathBuf>,
    surface: Box<dyn DisplaySurface>,
    picker: Box<dyn DestinationPicker>,
    config: RenderConfig,
) -> Result<EditingSession, ApplicationError> {
    let item = ImageItem::load(Box::new(FsStorageFile::new(source)), &ImageCrateDecoder)?;
    info!(
        path = %item.path().display(),
        width = item.pixel_size().width,
        height = item.pixel_size().height,
        backend = executor.name(),
        "loaded image"
    );

    let compositor = OfflineCompositor::new(
        Box::new(ExecutorOffscreenRenderer::new(Rc::clone(&executor))),
        &config,
    );
    let exporter = ExportCoordinator::new(
        compositor,
        Box::new(ImageCrateDecoder),
        Box::new(ImageCrateEncoder),
        picker,
        config,
    );
    Ok(EditingSession::open(
        item,
        surface,
        Box::new(ExecutorBrushCompiler::new(executor)),
        exporter,
    ))
}
