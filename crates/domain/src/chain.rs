//! The fixed effect chain shared by live preview and export.
//!
//! ```text
//! source -> SaturationEffect -> ContrastEffect -> ExposureEffect
//!        -> TemperatureAndTintEffect -> Blur -> output
//! ```

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::{render_stages, AdjustmentSet, Bitmap, DomainError};

pub const SATURATION_STAGE: &str = "SaturationEffect";
pub const CONTRAST_STAGE: &str = "ContrastEffect";
pub const EXPOSURE_STAGE: &str = "ExposureEffect";
pub const TEMPERATURE_AND_TINT_STAGE: &str = "TemperatureAndTintEffect";
pub const BLUR_STAGE: &str = "Blur";

const STAGE_COUNT: usize = 5;

/// Name of an updatable scalar input, written `<StageName>.<ParameterName>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParameterKey {
    stage: &'static str,
    parameter: &'static str,
}

impl ParameterKey {
    pub const SATURATION: Self = Self::new(SATURATION_STAGE, "Saturation");
    pub const CONTRAST: Self = Self::new(CONTRAST_STAGE, "Contrast");
    pub const EXPOSURE: Self = Self::new(EXPOSURE_STAGE, "Exposure");
    pub const TEMPERATURE: Self = Self::new(TEMPERATURE_AND_TINT_STAGE, "Temperature");
    pub const TINT: Self = Self::new(TEMPERATURE_AND_TINT_STAGE, "Tint");
    pub const BLUR_AMOUNT: Self = Self::new(BLUR_STAGE, "BlurAmount");

    /// Every input of the chain, in stage order.
    pub const ALL: [Self; 6] = [
        Self::SATURATION,
        Self::CONTRAST,
        Self::EXPOSURE,
        Self::TEMPERATURE,
        Self::TINT,
        Self::BLUR_AMOUNT,
    ];

    const fn new(stage: &'static str, parameter: &'static str) -> Self {
        Self { stage, parameter }
    }

}

impl Display for ParameterKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.stage, self.parameter)
    }
}

impl FromStr for ParameterKey {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let Some((stage, parameter)) = value.split_once('.') else {
            return Err(DomainError::MalformedParameterKey(value.to_string()));
        };
        if stage.is_empty() || parameter.is_empty() || parameter.contains('.') {
            return Err(DomainError::MalformedParameterKey(value.to_string()));
        }

        Self::ALL
            .into_iter()
            .find(|key| key.stage == stage && key.parameter == parameter)
            .ok_or_else(|| DomainError::UnknownParameter(value.to_string()))
    }
}

pub type ParameterTable = BTreeMap<ParameterKey, f32>;

/// A stage's operation together with the parameter values it was built with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    Saturation { saturation: f32 },
    Contrast { contrast: f32 },
    Exposure { exposure: f32 },
    TemperatureAndTint { temperature: f32, tint: f32 },
    /// Gaussian blur with a hard border: output keeps the input bounds and
    /// samples past the edge repeat the edge pixel.
    GaussianBlur { blur_amount: f32 },
}

impl Effect {
    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            Self::Saturation { .. } => &["Saturation"],
            Self::Contrast { .. } => &["Contrast"],
            Self::Exposure { .. } => &["Exposure"],
            Self::TemperatureAndTint { .. } => &["Temperature", "Tint"],
            Self::GaussianBlur { .. } => &["BlurAmount"],
        }
    }

    pub fn parameter(&self, name: &str) -> Option<f32> {
        let mut copy = *self;
        copy.parameter_mut(name).map(|value| *value)
    }

    fn parameter_mut(&mut self, name: &str) -> Option<&mut f32> {
        match (self, name) {
            (Self::Saturation { saturation }, "Saturation") => Some(saturation),
            (Self::Contrast { contrast }, "Contrast") => Some(contrast),
            (Self::Exposure { exposure }, "Exposure") => Some(exposure),
            (Self::TemperatureAndTint { temperature, .. }, "Temperature") => Some(temperature),
            (Self::TemperatureAndTint { tint, .. }, "Tint") => Some(tint),
            (Self::GaussianBlur { blur_amount }, "BlurAmount") => Some(blur_amount),
            _ => None,
        }
    }
}

/// Where a stage reads its image from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageInput {
    /// The chain root (backdrop or decoded bitmap).
    Source,
    /// Output of the stage at this index.
    Stage(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectStage {
    name: &'static str,
    input: StageInput,
    effect: Effect,
}

impl EffectStage {
    fn new(name: &'static str, input: StageInput, effect: Effect) -> Self {
        Self {
            name,
            input,
            effect,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn input(&self) -> StageInput {
        self.input
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    pub fn parameter_keys(&self) -> impl Iterator<Item = ParameterKey> + '_ {
        self.effect
            .parameter_names()
            .iter()
            .map(move |parameter| ParameterKey::new(self.name, parameter))
    }
}

/// Root of a live chain: whatever is composed behind the displayed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Backdrop;

/// The five-stage adjustment pipeline rooted at `S`.
///
/// Topology is fixed at construction. Only parameter values and the root
/// differ between a live chain (`EffectChain<Backdrop>`) and an export chain
/// (`EffectChain<Bitmap>`).
#[derive(Debug, Clone, PartialEq)]
pub struct EffectChain<S> {
    source: S,
    stages: [EffectStage; STAGE_COUNT],
}

impl<S> EffectChain<S> {
    pub fn build(snapshot: &AdjustmentSet, source: S) -> Self {
        let stages = [
            EffectStage::new(
                SATURATION_STAGE,
                StageInput::Source,
                Effect::Saturation {
                    saturation: snapshot.saturation,
                },
            ),
            EffectStage::new(
                CONTRAST_STAGE,
                StageInput::Stage(0),
                Effect::Contrast {
                    contrast: snapshot.contrast,
                },
            ),
            EffectStage::new(
                EXPOSURE_STAGE,
                StageInput::Stage(1),
                Effect::Exposure {
                    exposure: snapshot.exposure,
                },
            ),
            EffectStage::new(
                TEMPERATURE_AND_TINT_STAGE,
                StageInput::Stage(2),
                Effect::TemperatureAndTint {
                    temperature: snapshot.temperature,
                    tint: snapshot.tint,
                },
            ),
            EffectStage::new(
                BLUR_STAGE,
                StageInput::Stage(3),
                Effect::GaussianBlur {
                    blur_amount: snapshot.blur,
                },
            ),
        ];
        Self { source, stages }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn stages(&self) -> &[EffectStage] {
        &self.stages
    }

    pub fn stage(&self, name: &str) -> Option<&EffectStage> {
        self.stages.iter().find(|stage| stage.name == name)
    }

    pub fn parameter_keys(&self) -> Vec<ParameterKey> {
        self.stages
            .iter()
            .flat_map(|stage| stage.parameter_keys())
            .collect()
    }

    pub fn parameter(&self, key: ParameterKey) -> Option<f32> {
        self.stage(key.stage)?.effect.parameter(key.parameter)
    }

    pub fn parameter_values(&self) -> ParameterTable {
        self.parameter_keys()
            .into_iter()
            .filter_map(|key| self.parameter(key).map(|value| (key, value)))
            .collect()
    }

    /// Copy of this chain with parameter values taken from `values`. Keys the
    /// table does not mention keep their current value.
    pub fn with_parameters(&self, values: &ParameterTable) -> Self
    where
        S: Clone,
    {
        let mut stages = self.stages;
        for (key, value) in values {
            let slot = stages
                .iter_mut()
                .find(|stage| stage.name == key.stage)
                .and_then(|stage| stage.effect.parameter_mut(key.parameter));
            if let Some(slot) = slot {
                *slot = *value;
            }
        }
        Self {
            source: self.source.clone(),
            stages,
        }
    }

    /// Same stages, different root.
    pub fn with_source<T>(&self, source: T) -> EffectChain<T> {
        EffectChain {
            source,
            stages: self.stages,
        }
    }
}

impl EffectChain<Bitmap> {
    /// Evaluates the chain against its bitmap root. `pixel_scale` converts
    /// device-independent blur amounts into pixels.
    pub fn render(&self, pixel_scale: f32) -> Bitmap {
        render_stages(&self.stages, &self.source, pixel_scale)
    }
}
