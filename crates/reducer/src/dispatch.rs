//! Building one caller's update.

use ledger_core::{ActionList, RawUpdate};
use zk::FieldCodec;

/// Actions dispatched by one caller, appended to the ledger as a single update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionUpdate<A> {
    actions: Vec<A>,
}

impl<A> Default for ActionUpdate<A> {
    fn default() -> Self {
        Self {
            actions: Vec::new(),
        }
    }
}

impl<A: FieldCodec> ActionUpdate<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&mut self, action: A) {
        self.actions.push(action);
    }

    pub fn dispatch_if(&mut self, condition: bool, action: A) {
        if condition {
            self.dispatch(action);
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn actions(&self) -> &[A] {
        &self.actions
    }

    /// The committed action list this update contributes.
    pub fn to_list(&self) -> ActionList<A> {
        ActionList::from_elements(self.actions.iter().cloned())
    }

    /// Field encoding as stored by the ledger.
    pub fn to_raw(&self) -> RawUpdate {
        self.actions.iter().map(FieldCodec::to_fields).collect()
    }
}

impl<A: FieldCodec> FromIterator<A> for ActionUpdate<A> {
    fn from_iter<I: IntoIterator<Item = A>>(iter: I) -> Self {
        Self {
            actions: iter.into_iter().collect(),
        }
    }
}
