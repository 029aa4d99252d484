use photo_lab_application::ApplicationError;
use photo_lab_domain::{render_stages, Bitmap, EffectStage};

use super::StageExecutor;

/// Runs the domain's stage math on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuStageExecutor;

impl StageExecutor for CpuStageExecutor {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn execute(
        &self,
        stages: &[EffectStage],
        source: &Bitmap,
        pixel_scale: f32,
    ) -> Result<Bitmap, ApplicationError> {
        Ok(render_stages(stages, source, pixel_scale))
    }
}
