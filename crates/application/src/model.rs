use std::fmt::{Debug, Formatter};

use photo_lab_domain::{AdjustmentField, AdjustmentSet};

/// Emitted after every successful set, including sets to the current value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustmentChanged {
    pub field: AdjustmentField,
    pub value: f32,
}

impl AdjustmentChanged {
    pub fn name(&self) -> &'static str {
        self.field.name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type ChangeHandler = Box<dyn FnMut(&AdjustmentChanged)>;

/// The adjustments of one image item plus the handlers watching them.
///
/// Handlers run synchronously, in subscription order, before the mutating
/// call returns.
#[derive(Default)]
pub struct AdjustmentModel {
    values: AdjustmentSet,
    handlers: Vec<(SubscriptionId, ChangeHandler)>,
    next_subscription: u64,
}

impl AdjustmentModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: AdjustmentSet) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    pub fn get(&self, field: AdjustmentField) -> f32 {
        self.values.get(field)
    }

    pub fn set(&mut self, field: AdjustmentField, value: f32) {
        self.values.set(field, value);
        self.notify(field);
    }

    pub fn snapshot(&self) -> AdjustmentSet {
        self.values
    }

    /// Puts every field back to neutral, notifying once per field.
    pub fn reset(&mut self) {
        const ZEROED: [AdjustmentField; 5] = [
            AdjustmentField::Exposure,
            AdjustmentField::Blur,
            AdjustmentField::Tint,
            AdjustmentField::Temperature,
            AdjustmentField::Contrast,
        ];
        for field in ZEROED {
            self.set(field, 0.0);
        }
        self.set(AdjustmentField::Saturation, 1.0);
    }

    /// True when the image differs from its file on disk.
    pub fn needs_saved(&self) -> bool {
        !self.values.is_neutral()
    }

    pub fn subscribe(
        &mut self,
        handler: impl FnMut(&AdjustmentChanged) + 'static,
    ) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.handlers.push((id, Box::new(handler)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(existing, _)| *existing != id);
        self.handlers.len() != before
    }

    fn notify(&mut self, field: AdjustmentField) {
        let change = AdjustmentChanged {
            field,
            value: self.values.get(field),
        };
        for (_, handler) in &mut self.handlers {
            handler(&change);
        }
    }
}

impl Debug for AdjustmentModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdjustmentModel")
            .field("values", &self.values)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
