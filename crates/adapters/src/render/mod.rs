mod cpu;
mod gpu;

use std::collections::HashMap;
use std::rc::Rc;

use photo_lab_application::{
    ApplicationError, BrushCompiler, BrushHandle, OffscreenRenderer, OffscreenTarget,
};
use photo_lab_domain::{
    Backdrop, Bitmap, EffectChain, EffectStage, ParameterKey, ParameterTable, PixelSize,
};
use tracing::{debug, info, warn};

pub use cpu::CpuStageExecutor;
pub use gpu::WgpuStageExecutor;

/// Evaluates a linear run of chain stages against a bitmap.
pub trait StageExecutor {
    fn name(&self) -> &'static str;

    fn execute(
        &self,
        stages: &[EffectStage],
        source: &Bitmap,
        pixel_scale: f32,
    ) -> Result<Bitmap, ApplicationError>;
}

struct LiveBrush {
    chain: EffectChain<Backdrop>,
    inputs: Vec<ParameterKey>,
}

/// Brush compiler that keeps each brush's chain and re-runs it per frame.
pub struct ExecutorBrushCompiler {
    executor: Rc<dyn StageExecutor>,
    brushes: HashMap<BrushHandle, LiveBrush>,
    next_handle: u64,
}

impl ExecutorBrushCompiler {
    pub fn new(executor: Rc<dyn StageExecutor>) -> Self {
        Self {
            executor,
            brushes: HashMap::new(),
            next_handle: 0,
        }
    }

    fn brush_mut(&mut self, brush: BrushHandle) -> Result<&mut LiveBrush, ApplicationError> {
        self.brushes
            .get_mut(&brush)
            .ok_or_else(|| ApplicationError::Backend(format!("unknown brush {}", brush.get())))
    }
}

impl BrushCompiler for ExecutorBrushCompiler {
    fn compile(
        &mut self,
        chain: &EffectChain<Backdrop>,
        inputs: &[ParameterKey],
    ) -> Result<BrushHandle, ApplicationError> {
        let available = chain.parameter_keys();
        if let Some(missing) = inputs.iter().find(|key| !available.contains(key)) {
            return Err(ApplicationError::Backend(format!(
                "chain has no parameter {missing}"
            )));
        }

        self.next_handle += 1;
        let handle = BrushHandle::new(self.next_handle);
        self.brushes.insert(
            handle,
            LiveBrush {
                chain: chain.clone(),
                inputs: inputs.to_vec(),
            },
        );
        debug!(
            brush = handle.get(),
            backend = self.executor.name(),
            "registered brush"
        );
        Ok(handle)
    }

    fn set_input(
        &mut self,
        brush: BrushHandle,
        key: ParameterKey,
        value: f32,
    ) -> Result<(), ApplicationError> {
        let live = self.brush_mut(brush)?;
        if !live.inputs.contains(&key) {
            return Err(ApplicationError::Backend(format!(
                "{key} is not an input of brush {}",
                brush.get()
            )));
        }
        let mut table = ParameterTable::new();
        table.insert(key, value);
        live.chain = live.chain.with_parameters(&table);
        Ok(())
    }

    fn compose_frame(
        &mut self,
        brush: BrushHandle,
        backdrop: &Bitmap,
    ) -> Result<Bitmap, ApplicationError> {
        let executor = Rc::clone(&self.executor);
        let live = self.brush_mut(brush)?;
        executor.execute(live.chain.stages(), backdrop, 1.0)
    }
}

/// Offscreen renderer drawing export chains through a [`StageExecutor`].
pub struct ExecutorOffscreenRenderer {
    executor: Rc<dyn StageExecutor>,
}

impl ExecutorOffscreenRenderer {
    pub fn new(executor: Rc<dyn StageExecutor>) -> Self {
        Self { executor }
    }
}

impl OffscreenRenderer for ExecutorOffscreenRenderer {
    fn allocate(
        &mut self,
        size: PixelSize,
        dpi: f32,
    ) -> Result<OffscreenTarget, ApplicationError> {
        OffscreenTarget::new(size, dpi)
    }

    #[tracing::instrument(skip_all, fields(backend = self.executor.name()))]
    fn draw(
        &mut self,
        target: &mut OffscreenTarget,
        chain: &EffectChain<Bitmap>,
    ) -> Result<(), ApplicationError> {
        if chain.source().size() != target.size() {
            return Err(ApplicationError::RenderTarget(format!(
                "source is {}x{} but target is {}x{}",
                chain.source().width(),
                chain.source().height(),
                target.size().width,
                target.size().height
            )));
        }
        let rendered = self
            .executor
            .execute(chain.stages(), chain.source(), target.pixel_scale())?;
        target.draw_bitmap(&rendered)
    }
}

/// The GPU executor when an adapter is available, otherwise the CPU one.
pub fn default_executor() -> Rc<dyn StageExecutor> {
    match WgpuStageExecutor::new() {
        Ok(executor) => {
            info!(backend = executor.name(), "using gpu stage executor");
            Rc::new(executor)
        }
        Err(error) => {
            warn!(%error, "gpu unavailable, falling back to cpu stage executor");
            Rc::new(CpuStageExecutor)
        }
    }
}
