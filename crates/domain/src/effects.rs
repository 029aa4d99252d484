//! Per-pixel definitions of the chain's stages.
//!
//! Every render backend evaluates the same definitions, so a frame shown in
//! the live preview and a file written by export agree for equal values.
//! Each stage clamps its parameter to the stage's range and clamps colour
//! channels to `[0, 1]` on output. Alpha passes through the colour stages.

use crate::{Bitmap, Effect, EffectStage};

/// Density at which blur amounts are measured (one DIP per pixel).
pub const REFERENCE_DPI: f32 = 96.0;

const SATURATION_RANGE: (f32, f32) = (0.0, 1.0);
const CONTRAST_RANGE: (f32, f32) = (-1.0, 1.0);
const EXPOSURE_RANGE: (f32, f32) = (-2.0, 2.0);
const WHITE_BALANCE_RANGE: (f32, f32) = (-1.0, 1.0);
const BLUR_RANGE: (f32, f32) = (0.0, 250.0);

/// Channel gain per unit of temperature or tint.
pub const WHITE_BALANCE_GAIN: f32 = 0.25;

/// Rec. 709 luminance weights.
pub const LUMA_REC709: [f32; 3] = [0.2126, 0.7152, 0.0722];

impl Effect {
    /// This effect with its parameters clamped to the ranges the stage
    /// honours. NaN falls back to the stage's identity value.
    pub fn effective(&self) -> Effect {
        match *self {
            Self::Saturation { saturation } => Self::Saturation {
                saturation: clamp_parameter(saturation, SATURATION_RANGE, 1.0),
            },
            Self::Contrast { contrast } => Self::Contrast {
                contrast: clamp_parameter(contrast, CONTRAST_RANGE, 0.0),
            },
            Self::Exposure { exposure } => Self::Exposure {
                exposure: clamp_parameter(exposure, EXPOSURE_RANGE, 0.0),
            },
            Self::TemperatureAndTint { temperature, tint } => Self::TemperatureAndTint {
                temperature: clamp_parameter(temperature, WHITE_BALANCE_RANGE, 0.0),
                tint: clamp_parameter(tint, WHITE_BALANCE_RANGE, 0.0),
            },
            Self::GaussianBlur { blur_amount } => Self::GaussianBlur {
                blur_amount: clamp_parameter(blur_amount, BLUR_RANGE, 0.0),
            },
        }
    }

    /// Whether the effective parameters leave every pixel untouched.
    pub fn is_identity(&self) -> bool {
        match self.effective() {
            Self::Saturation { saturation } => saturation == 1.0,
            Self::Contrast { contrast } => contrast == 0.0,
            Self::Exposure { exposure } => exposure == 0.0,
            Self::TemperatureAndTint { temperature, tint } => temperature == 0.0 && tint == 0.0,
            Self::GaussianBlur { blur_amount } => blur_amount == 0.0,
        }
    }
}

fn clamp_parameter(value: f32, (min, max): (f32, f32), identity: f32) -> f32 {
    if value.is_nan() {
        identity
    } else {
        value.clamp(min, max)
    }
}

/// Runs `stages` in order against `source`.
///
/// The chain is linear, so each stage is applied in place to its
/// predecessor's output.
pub fn render_stages(stages: &[EffectStage], source: &Bitmap, pixel_scale: f32) -> Bitmap {
    let mut current = source.clone();
    for stage in stages {
        apply_effect(stage.effect(), &mut current, pixel_scale);
    }
    current
}

pub fn apply_effect(effect: &Effect, bitmap: &mut Bitmap, pixel_scale: f32) {
    if effect.is_identity() {
        return;
    }

    match effect.effective() {
        Effect::Saturation { saturation } => map_rgb(bitmap, |rgb| saturate(rgb, saturation)),
        Effect::Contrast { contrast } => {
            let factor = (2.0 * contrast).exp2();
            map_rgb(bitmap, |rgb| rgb.map(|c| (c - 0.5) * factor + 0.5));
        }
        Effect::Exposure { exposure } => {
            let gain = exposure.exp2();
            map_rgb(bitmap, |rgb| rgb.map(|c| c * gain));
        }
        Effect::TemperatureAndTint { temperature, tint } => {
            let gains = white_balance_gains(temperature, tint);
            map_rgb(bitmap, |rgb| [rgb[0] * gains[0], rgb[1] * gains[1], rgb[2] * gains[2]]);
        }
        Effect::GaussianBlur { blur_amount } => {
            gaussian_blur(bitmap, blur_amount * pixel_scale);
        }
    }
}

fn map_rgb(bitmap: &mut Bitmap, transform: impl Fn([f32; 3]) -> [f32; 3]) {
    for pixel in bitmap.pixels_mut() {
        let out = transform([pixel[0], pixel[1], pixel[2]]);
        pixel[0] = out[0].clamp(0.0, 1.0);
        pixel[1] = out[1].clamp(0.0, 1.0);
        pixel[2] = out[2].clamp(0.0, 1.0);
    }
}

fn saturate(rgb: [f32; 3], saturation: f32) -> [f32; 3] {
    let luma = rgb[0] * LUMA_REC709[0] + rgb[1] * LUMA_REC709[1] + rgb[2] * LUMA_REC709[2];
    rgb.map(|c| luma + (c - luma) * saturation)
}

/// Red, green and blue multipliers. Warm temperatures lift red and cut
/// blue; positive tint cuts green toward magenta.
pub fn white_balance_gains(temperature: f32, tint: f32) -> [f32; 3] {
    [
        1.0 + WHITE_BALANCE_GAIN * temperature,
        1.0 - WHITE_BALANCE_GAIN * tint,
        1.0 - WHITE_BALANCE_GAIN * temperature,
    ]
}

/// Normalized 1-D Gaussian weights for a standard deviation in pixels.
/// Radius is `ceil(3σ)`, so the kernel has `2·radius + 1` taps.
pub fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return vec![1.0];
    }

    let radius = (3.0 * sigma).ceil() as i32;
    let denom = 2.0 * f64::from(sigma) * f64::from(sigma);
    let weights: Vec<f64> = (-radius..=radius)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.iter().map(|w| (w / sum) as f32).collect()
}

fn gaussian_blur(bitmap: &mut Bitmap, sigma: f32) {
    let kernel = gaussian_kernel(sigma);
    if kernel.len() == 1 {
        return;
    }

    let width = bitmap.width() as usize;
    let height = bitmap.height() as usize;
    let mut tmp = vec![[0.0_f32; 4]; width * height];

    horizontal_pass(bitmap.pixels(), &mut tmp, width, height, &kernel);
    vertical_pass(&tmp, bitmap.pixels_mut(), width, height, &kernel);
}

fn horizontal_pass(src: &[[f32; 4]], dst: &mut [[f32; 4]], width: usize, height: usize, k: &[f32]) {
    let radius = (k.len() / 2) as isize;
    let last = width as isize - 1;
    for y in 0..height {
        let row = y * width;
        for x in 0..width {
            let mut acc = [0.0_f32; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sx = (x as isize + ki as isize - radius).clamp(0, last) as usize;
                let sample = src[row + sx];
                for c in 0..4 {
                    acc[c] += kw * sample[c];
                }
            }
            dst[row + x] = acc;
        }
    }
}

fn vertical_pass(src: &[[f32; 4]], dst: &mut [[f32; 4]], width: usize, height: usize, k: &[f32]) {
    let radius = (k.len() / 2) as isize;
    let last = height as isize - 1;
    for y in 0..height {
        for x in 0..width {
            let mut acc = [0.0_f32; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sy = (y as isize + ki as isize - radius).clamp(0, last) as usize;
                let sample = src[sy * width + x];
                for c in 0..4 {
                    acc[c] += kw * sample[c];
                }
            }
            dst[y * width + x] = acc.map(|v| v.clamp(0.0, 1.0));
        }
    }
}
