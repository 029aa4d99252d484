use photo_lab_domain::{AdjustmentSet, Bitmap, EffectChain, Rgba};
use tracing::debug;

use crate::{ApplicationError, ImageDecoder, OffscreenRenderer, RenderConfig, StorageFile};

/// Renders adjustments into a new bitmap at full source resolution.
pub struct OfflineCompositor {
    renderer: Box<dyn OffscreenRenderer>,
    reference_dpi: f32,
    clear_color: Rgba,
}

impl OfflineCompositor {
    pub fn new(renderer: Box<dyn OffscreenRenderer>, config: &RenderConfig) -> Self {
        Self {
            renderer,
            reference_dpi: config.reference_dpi,
            clear_color: config.clear_color,
        }
    }

    #[tracing::instrument(skip_all, fields(width = source.width(), height = source.height()))]
    pub fn render(
        &mut self,
        snapshot: &AdjustmentSet,
        source: Bitmap,
    ) -> Result<Bitmap, ApplicationError> {
        let size = source.size();
        let mut target = self.renderer.allocate(size, self.reference_dpi)?;
        target.clear(self.clear_color);

        let chain = EffectChain::build(snapshot, source);
        self.renderer.draw(&mut target, &chain)?;
        debug!(dpi = target.dpi(), "rendered export chain");
        Ok(target.into_bitmap())
    }
}

/// Reads `file` fully and decodes it.
pub fn decode_source(
    file: &dyn StorageFile,
    decoder: &dyn ImageDecoder,
) -> Result<Bitmap, ApplicationError> {
    let mut stream = file.open_readable()?;
    decoder.decode(stream.as_mut())
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::cell::Cell;
    use std::rc::Rc;

    use photo_lab_domain::PixelSize;

    use super::*;
    use crate::OffscreenTarget;

    /// Evaluates chains with the domain stage math.
    #[derive(Default)]
    pub struct FakeRenderer {
        pub draws: Rc<Cell<u32>>,
        pub fail_allocation: bool,
    }

    impl OffscreenRenderer for FakeRenderer {
        fn allocate(
            &mut self,
            size: PixelSize,
            dpi: f32,
        ) -> Result<OffscreenTarget, ApplicationError> {
            if self.fail_allocation {
                return Err(ApplicationError::RenderTarget("device lost".to_string()));
            }
            OffscreenTarget::new(size, dpi)
        }

        fn draw(
            &mut self,
            target: &mut OffscreenTarget,
            chain: &EffectChain<Bitmap>,
        ) -> Result<(), ApplicationError> {
            self.draws.set(self.draws.get() + 1);
            let rendered = chain.render(target.pixel_scale());
            target.draw_bitmap(&rendered)
        }
    }
}
