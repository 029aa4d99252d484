use std::cell::RefCell;
use std::rc::Rc;

use photo_lab_domain::{AdjustmentField, Bitmap};
use tracing::debug;

use crate::{
    ApplicationError, BrushCompiler, CompileOutcome, DisplaySurface, ExportCoordinator,
    ExportOutcome, ExportState, ImageItem, LiveRenderBinding, ParameterPropagator,
    SubscriptionId,
};

/// Everything the detail page owns while one photo is open.
pub struct EditingSession {
    item: ImageItem,
    surface: Box<dyn DisplaySurface>,
    binding: Rc<RefCell<LiveRenderBinding>>,
    exporter: ExportCoordinator,
    pane_open: bool,
    subscription: SubscriptionId,
}

impl EditingSession {
    /// Opens `item` for editing with neutral adjustments and the pane closed.
    pub fn open(
        mut item: ImageItem,
        surface: Box<dyn DisplaySurface>,
        compiler: Box<dyn BrushCompiler>,
        exporter: ExportCoordinator,
    ) -> Self {
        item.adjustments_mut().reset();
        let binding = Rc::new(RefCell::new(LiveRenderBinding::new(compiler)));
        let subscription =
            ParameterPropagator::new(Rc::clone(&binding)).attach(item.adjustments_mut());
        debug!(path = %item.path().display(), "opened editing session");
        Self {
            item,
            surface,
            binding,
            exporter,
            pane_open: false,
            subscription,
        }
    }

    pub fn item(&self) -> &ImageItem {
        &self.item
    }

    pub fn is_pane_open(&self) -> bool {
        self.pane_open
    }

    pub fn is_compiled(&self) -> bool {
        self.binding.borrow().is_compiled()
    }

    /// Closes an open pane; otherwise compiles the live brush if needed and
    /// opens the pane. Returns whether the pane is now open.
    pub fn toggle_edit_pane(&mut self) -> Result<bool, ApplicationError> {
        if self.pane_open {
            self.pane_open = false;
            return Ok(false);
        }

        let snapshot = self.item.adjustments().snapshot();
        let outcome = self
            .binding
            .borrow_mut()
            .compile(&snapshot, self.surface.as_mut())?;
        if let CompileOutcome::Compiled(brush) = outcome {
            debug!(brush = brush.get(), "edit pane compiled live brush");
        }
        self.pane_open = true;
        Ok(true)
    }

    pub fn set_adjustment(&mut self, field: AdjustmentField, value: f32) {
        self.item.adjustments_mut().set(field, value);
    }

    pub fn reset_adjustments(&mut self) {
        self.item.adjustments_mut().reset();
    }

    /// Next live frame over the displayed image.
    pub fn compose_preview(&mut self) -> Result<Option<Bitmap>, ApplicationError> {
        self.binding.borrow_mut().compose_frame(self.item.image())
    }

    pub async fn export(&mut self) -> Result<ExportOutcome, ApplicationError> {
        let outcome = self.exporter.export(&mut self.item).await?;
        if let ExportOutcome::Exported {
            replaced_item: true,
            ..
        } = outcome
        {
            self.subscription = ParameterPropagator::new(Rc::clone(&self.binding))
                .attach(self.item.adjustments_mut());
        }
        Ok(outcome)
    }

    pub fn export_state(&self) -> ExportState {
        self.exporter.state()
    }

    /// Detaches propagation and hands the item back.
    pub fn close(mut self) -> ImageItem {
        self.item.adjustments_mut().unsubscribe(self.subscription);
        self.item
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use photo_lab_domain::{ParameterKey, PixelSize};

    use super::*;
    use crate::compositor::fakes::FakeRenderer;
    use crate::export::fakes::{gray, raw_bytes, Disk, MemoryFile, RawDecoder, RawEncoder};
    use crate::live::fakes::{CompilerLog, FakeCompiler, FakeSurface};
    use crate::{
        ApplicationError, DestinationPicker, OfflineCompositor, PickOutcome, RenderConfig,
        SaveRequest,
    };

    struct FixedPicker {
        disk: Disk,
        path: &'static str,
    }

    impl DestinationPicker for FixedPicker {
        fn pick_save_file(
            &mut self,
            _request: &SaveRequest,
        ) -> Result<PickOutcome, ApplicationError> {
            Ok(PickOutcome::Picked(Box::new(MemoryFile::new(&self.disk, self.path))))
        }
    }

    fn session(destination: &'static str) -> (EditingSession, Rc<RefCell<CompilerLog>>) {
        let disk: Disk = Rc::default();
        disk.borrow_mut()
            .insert("/photos/a.jpg".into(), raw_bytes(&gray(2, 2, 0.5)));
        let item = ImageItem::load(Box::new(MemoryFile::new(&disk, "/photos/a.jpg")), &RawDecoder)
            .expect("load item");
        let config = RenderConfig::default();
        let exporter = ExportCoordinator::new(
            OfflineCompositor::new(Box::new(FakeRenderer::default()), &config),
            Box::new(RawDecoder),
            Box::new(RawEncoder::default()),
            Box::new(FixedPicker {
                disk,
                path: destination,
            }),
            config,
        );
        let compiler = FakeCompiler::default();
        let log = compiler.log.clone();
        let session = EditingSession::open(
            item,
            Box::new(FakeSurface::new(2, 2)),
            Box::new(compiler),
            exporter,
        );
        (session, log)
    }

    #[test]
    fn opening_resets_adjustments_and_keeps_the_pane_closed() {
        let (session, log) = session("/photos/a.jpg");

        assert!(!session.is_pane_open());
        assert!(!session.is_compiled());
        assert!(!session.item().adjustments().needs_saved());
        assert!(log.borrow().compiled.is_empty());
    }

    #[test]
    fn toggling_compiles_once() {
        let (mut session, log) = session("/photos/a.jpg");

        assert!(session.toggle_edit_pane().expect("open pane"));
        assert!(!session.toggle_edit_pane().expect("close pane"));
        assert!(session.toggle_edit_pane().expect("reopen pane"));

        assert!(session.is_compiled());
        assert_eq!(log.borrow().compiled.len(), 1);
    }

    #[test]
    fn edits_made_before_the_pane_opens_show_up_in_the_preview() {
        let (mut session, log) = session("/photos/a.jpg");
        session.set_adjustment(AdjustmentField::Exposure, 2.0);
        assert_eq!(session.compose_preview().expect("frame"), None);

        session.toggle_edit_pane().expect("open pane");

        let log = log.borrow();
        let compiled = &log.compiled[0].0;
        assert_eq!(compiled.get(&ParameterKey::EXPOSURE), Some(&2.0));
        let frame = session.compose_preview().expect("frame").expect("compiled");
        assert_eq!(frame.pixel(0, 0), Some([1.0, 1.0, 1.0, 1.0]));
    }

    #[test]
    fn edits_after_compile_update_one_parameter() {
        let (mut session, log) = session("/photos/a.jpg");
        session.toggle_edit_pane().expect("open pane");

        session.set_adjustment(AdjustmentField::Blur, 3.0);

        let log = log.borrow();
        let inputs = &log.inputs;
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].1, ParameterKey::BLUR_AMOUNT);
    }

    #[tokio::test]
    async fn export_to_a_new_file_keeps_propagation_attached() {
        let (mut session, log) = session("/photos/b.png");
        session.toggle_edit_pane().expect("open pane");
        session.set_adjustment(AdjustmentField::Contrast, 0.5);

        let outcome = session.export().await.expect("export");

        assert!(matches!(
            outcome,
            ExportOutcome::Exported {
                replaced_item: true,
                ..
            }
        ));
        assert_eq!(session.item().path(), Path::new("/photos/b.png"));
        assert_eq!(session.export_state(), ExportState::Done);
        let pushed_before = log.borrow().inputs.len();

        session.set_adjustment(AdjustmentField::Tint, 0.2);

        let log = log.borrow();
        let inputs = &log.inputs;
        assert_eq!(inputs.len(), pushed_before + 1);
        assert_eq!(inputs[pushed_before].1, ParameterKey::TINT);
    }

    #[tokio::test]
    async fn export_over_the_source_resets_the_live_brush() {
        let (mut session, log) = session("/photos/a.jpg");
        session.toggle_edit_pane().expect("open pane");
        session.set_adjustment(AdjustmentField::Saturation, 0.0);

        session.export().await.expect("export");

        assert_eq!(session.item().path(), Path::new("/photos/a.jpg"));
        assert_eq!(session.item().pixel_size(), PixelSize::new(2, 2));
        let last = *log.borrow().inputs.last().expect("reset pushed values");
        assert_eq!((last.1, last.2), (ParameterKey::SATURATION, 1.0));
    }

    #[test]
    fn closing_detaches_propagation() {
        let (mut session, log) = session("/photos/a.jpg");
        session.toggle_edit_pane().expect("open pane");

        let mut item = session.close();
        item.adjustments_mut().set(AdjustmentField::Exposure, 1.0);

        assert!(log.borrow().inputs.is_empty());
    }
}
