use photo_lab_domain::{AdjustmentSet, Backdrop, Bitmap, EffectChain, ParameterKey};
use tracing::{debug, info};

use crate::{ApplicationError, BrushCompiler, BrushHandle, DisplaySurface, SpriteVisual};

enum BindingState {
    Uncompiled,
    Compiled { visual: SpriteVisual },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileOutcome {
    Compiled(BrushHandle),
    /// The session already had a brush; nothing was rebuilt.
    AlreadyCompiled(BrushHandle),
}

impl CompileOutcome {
    pub fn brush(self) -> BrushHandle {
        match self {
            Self::Compiled(brush) | Self::AlreadyCompiled(brush) => brush,
        }
    }
}

/// The preview brush of one editing session.
///
/// A binding compiles at most once. Until then, parameter pushes are dropped:
/// the chain is built from the model's values at compile time, so edits made
/// earlier still show up.
pub struct LiveRenderBinding {
    compiler: Box<dyn BrushCompiler>,
    state: BindingState,
}

impl LiveRenderBinding {
    pub fn new(compiler: Box<dyn BrushCompiler>) -> Self {
        Self {
            compiler,
            state: BindingState::Uncompiled,
        }
    }

    #[tracing::instrument(skip_all)]
    pub fn compile(
        &mut self,
        snapshot: &AdjustmentSet,
        surface: &mut dyn DisplaySurface,
    ) -> Result<CompileOutcome, ApplicationError> {
        if let BindingState::Compiled { visual } = self.state {
            debug!(brush = visual.brush.get(), "live brush already compiled");
            return Ok(CompileOutcome::AlreadyCompiled(visual.brush));
        }

        let chain = EffectChain::build(snapshot, Backdrop);
        let inputs = chain.parameter_keys();
        let brush = self.compiler.compile(&chain, &inputs)?;

        let visual = SpriteVisual {
            brush,
            size: surface.native_pixel_size(),
        };
        surface.set_background_visual(visual);
        self.state = BindingState::Compiled { visual };

        info!(
            brush = brush.get(),
            width = visual.size.width,
            height = visual.size.height,
            inputs = inputs.len(),
            "compiled live brush"
        );
        Ok(CompileOutcome::Compiled(brush))
    }

    /// Returns whether the value reached a brush.
    pub fn update_parameter(
        &mut self,
        key: ParameterKey,
        value: f32,
    ) -> Result<bool, ApplicationError> {
        let BindingState::Compiled { visual } = self.state else {
            return Ok(false);
        };
        self.compiler.set_input(visual.brush, key, value)?;
        Ok(true)
    }

    /// Next preview frame over `backdrop`, or `None` before compilation.
    pub fn compose_frame(
        &mut self,
        backdrop: &Bitmap,
    ) -> Result<Option<Bitmap>, ApplicationError> {
        let BindingState::Compiled { visual } = self.state else {
            return Ok(None);
        };
        self.compiler.compose_frame(visual.brush, backdrop).map(Some)
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self.state, BindingState::Compiled { .. })
    }

    pub fn visual(&self) -> Option<SpriteVisual> {
        match self.state {
            BindingState::Compiled { visual } => Some(visual),
            BindingState::Uncompiled => None,
        }
    }
}


#[cfg(test)]
mod tests {
    use photo_lab_domain::{AdjustmentField, PixelSize};

    use super::fakes::{FakeCompiler, FakeSurface};
    use super::*;

    #[test]
    fn compile_attaches_visual_sized_to_surface() {
        let compiler = FakeCompiler::default();
        let log = compiler.log.clone();
        let mut binding = LiveRenderBinding::new(Box::new(compiler));
        let mut surface = FakeSurface::new(640, 480);

        let outcome = binding
            .compile(&AdjustmentSet::default(), &mut surface)
            .expect("compile");

        assert!(matches!(outcome, CompileOutcome::Compiled(_)));
        assert!(binding.is_compiled());
        let visuals = surface.visuals.borrow();
        assert_eq!(visuals.len(), 1);
        assert_eq!(visuals[0].size, PixelSize::new(640, 480));
        assert_eq!(visuals[0].brush, outcome.brush());
        assert_eq!(log.borrow().compiled[0].1, ParameterKey::ALL.to_vec());
    }

    #[test]
    fn second_compile_reuses_the_first_brush() {
        let compiler = FakeCompiler::default();
        let log = compiler.log.clone();
        let mut binding = LiveRenderBinding::new(Box::new(compiler));
        let mut surface = FakeSurface::new(4, 4);

        let first = binding
            .compile(&AdjustmentSet::default(), &mut surface)
            .expect("first compile");
        let mut edited = AdjustmentSet::default();
        edited.set(AdjustmentField::Exposure, 1.0);
        let second = binding.compile(&edited, &mut surface).expect("second compile");

        assert_eq!(second, CompileOutcome::AlreadyCompiled(first.brush()));
        assert_eq!(log.borrow().compiled.len(), 1);
        assert_eq!(surface.visuals.borrow().len(), 1);
        assert_eq!(binding.visual().map(|visual| visual.brush), Some(first.brush()));
    }

    #[test]
    fn updates_before_compile_are_dropped() {
        let compiler = FakeCompiler::default();
        let log = compiler.log.clone();
        let mut binding = LiveRenderBinding::new(Box::new(compiler));

        let delivered = binding
            .update_parameter(ParameterKey::EXPOSURE, 2.0)
            .expect("update");

        assert!(!delivered);
        assert!(log.borrow().inputs.is_empty());
        let backdrop = Bitmap::filled(PixelSize::new(1, 1), [0.5; 4]).expect("backdrop");
        assert_eq!(binding.compose_frame(&backdrop).expect("frame"), None);
    }

    #[test]
    fn snapshot_values_seed_the_compiled_chain() {
        let compiler = FakeCompiler::default();
        let log = compiler.log.clone();
        let mut binding = LiveRenderBinding::new(Box::new(compiler));
        let mut snapshot = AdjustmentSet::default();
        snapshot.set(AdjustmentField::Exposure, 2.0);

        binding
            .compile(&snapshot, &mut FakeSurface::new(2, 2))
            .expect("compile");

        let log = log.borrow();
        let compiled = &log.compiled[0].0;
        assert_eq!(compiled.get(&ParameterKey::EXPOSURE), Some(&2.0));
    }

    #[test]
    fn updates_after_compile_reach_the_brush() {
        let compiler = FakeCompiler::default();
        let log = compiler.log.clone();
        let mut binding = LiveRenderBinding::new(Box::new(compiler));
        let brush = binding
            .compile(&AdjustmentSet::default(), &mut FakeSurface::new(2, 2))
            .expect("compile")
            .brush();

        let delivered = binding
            .update_parameter(ParameterKey::TINT, 0.3)
            .expect("update");

        assert!(delivered);
        assert_eq!(log.borrow().inputs, vec![(brush, ParameterKey::TINT, 0.3)]);
    }
}
