use std::cell::RefCell;
use std::rc::Rc;

use photo_lab_domain::{AdjustmentField, ParameterKey};
use tracing::{trace, warn};

use crate::{AdjustmentModel, ApplicationError, LiveRenderBinding, SubscriptionId};

/// Chain parameter driven by the adjustment called `name`.
pub fn parameter_key_for(name: &str) -> Option<ParameterKey> {
    AdjustmentField::from_name(name).map(AdjustmentField::parameter_key)
}

/// Forwards adjustment changes to exactly one parameter of the live brush.
#[derive(Clone)]
pub struct ParameterPropagator {
    binding: Rc<RefCell<LiveRenderBinding>>,
}

impl ParameterPropagator {
    pub fn new(binding: Rc<RefCell<LiveRenderBinding>>) -> Self {
        Self { binding }
    }

    /// Returns whether the value reached a compiled brush. Unknown names are
    /// ignored.
    pub fn dispatch(&self, name: &str, value: f32) -> Result<bool, ApplicationError> {
        let Some(key) = parameter_key_for(name) else {
            trace!(name, "ignoring change to unmapped adjustment");
            return Ok(false);
        };
        self.binding.borrow_mut().update_parameter(key, value)
    }

    /// Subscribes to `model`; the returned id detaches the propagator again.
    pub fn attach(self, model: &mut AdjustmentModel) -> SubscriptionId {
        model.subscribe(move |change| {
            if let Err(error) = self.dispatch(change.name(), change.value) {
                warn!(%error, adjustment = change.name(), "live parameter update failed");
            }
        })
    }
}
