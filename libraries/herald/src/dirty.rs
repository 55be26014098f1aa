//! # DirtyState
//! Every topic carries a dirty flag. This is used to track whether the topic has been updated since listeners were last
//! notified, and who should hear about it.

use crate::ListenerKey;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DirtyState {
    /// Not dirty, no pending notifications
    #[default]
    Clean,
    /// Dirty, notify all listeners except the specified one
    DirtyExcept(ListenerKey),
    /// Dirty, notify all listeners
    DirtyAll,
}

impl DirtyState {
    /// Folds one more modification into the pending state.
    pub fn mark(self, modifier: Option<ListenerKey>) -> Self {
        use DirtyState::*;
        match (self, modifier) {
            (Clean, Some(key)) => DirtyExcept(key),
            (DirtyExcept(key1), Some(key2)) if key1 == key2 => DirtyExcept(key1),
            (Clean, None) => DirtyAll,
            (DirtyExcept(_), _) | (DirtyAll, _) => DirtyAll,
        }
    }

    pub fn is_dirty(&self) -> bool {
        !matches!(self, DirtyState::Clean)
    }

    /// The listener that must not be notified, if any.
    pub fn excluded(&self) -> Option<ListenerKey> {
        match self {
            DirtyState::DirtyExcept(key) => Some(*key),
            DirtyState::Clean | DirtyState::DirtyAll => None,
        }
    }
}
