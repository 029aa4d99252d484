use serde::{Deserialize, Serialize};

use crate::ParameterKey;

/// One of the six user-facing adjustment sliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdjustmentField {
    Saturation,
    Contrast,
    Exposure,
    Temperature,
    Tint,
    Blur,
}

impl AdjustmentField {
    pub const ALL: [AdjustmentField; 6] = [
        AdjustmentField::Saturation,
        AdjustmentField::Contrast,
        AdjustmentField::Exposure,
        AdjustmentField::Temperature,
        AdjustmentField::Tint,
        AdjustmentField::Blur,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Saturation => "saturation",
            Self::Contrast => "contrast",
            Self::Exposure => "exposure",
            Self::Temperature => "temperature",
            Self::Tint => "tint",
            Self::Blur => "blur",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    /// The live-brush input driven by this field.
    pub fn parameter_key(self) -> ParameterKey {
        match self {
            Self::Exposure => ParameterKey::EXPOSURE,
            Self::Temperature => ParameterKey::TEMPERATURE,
            Self::Tint => ParameterKey::TINT,
            Self::Contrast => ParameterKey::CONTRAST,
            Self::Saturation => ParameterKey::SATURATION,
            Self::Blur => ParameterKey::BLUR_AMOUNT,
        }
    }
}

/// Current slider values for one image. Values are stored as given; range
/// limits are applied by the effect stages when rendering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdjustmentSet {
    pub saturation: f32,
    pub contrast: f32,
    pub exposure: f32,
    pub temperature: f32,
    pub tint: f32,
    pub blur: f32,
}

impl Default for AdjustmentSet {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl AdjustmentSet {
    pub const NEUTRAL: Self = Self {
        saturation: 1.0,
        contrast: 0.0,
        exposure: 0.0,
        temperature: 0.0,
        tint: 0.0,
        blur: 0.0,
    };

    pub fn get(&self, field: AdjustmentField) -> f32 {
        match field {
            AdjustmentField::Saturation => self.saturation,
            AdjustmentField::Contrast => self.contrast,
            AdjustmentField::Exposure => self.exposure,
            AdjustmentField::Temperature => self.temperature,
            AdjustmentField::Tint => self.tint,
            AdjustmentField::Blur => self.blur,
        }
    }

    pub fn set(&mut self, field: AdjustmentField, value: f32) {
        let slot = match field {
            AdjustmentField::Saturation => &mut self.saturation,
            AdjustmentField::Contrast => &mut self.contrast,
            AdjustmentField::Exposure => &mut self.exposure,
            AdjustmentField::Temperature => &mut self.temperature,
            AdjustmentField::Tint => &mut self.tint,
            AdjustmentField::Blur => &mut self.blur,
        };
        *slot = value;
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }
}
