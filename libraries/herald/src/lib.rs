//! A small publish/subscribe library for single-threaded UIs.
//! It was created for the EventHub client, so it only covers what that client needs.
//!
//! Notification strategy:
//! 1. State owners never call listeners directly. Instead, they mark a *topic* as dirty, optionally naming the listener
//!    that caused the change (the "modifier") so that it is not notified about its own write.
//! 2. Pending notifications are drained into a list of closures while the hub is borrowed, and the closures are only
//!    invoked after the borrow is released.
//! 3. Because of (2), a listener may freely read or mutate the state it is subscribed to, including triggering new
//!    notifications, without running into "already borrowed" panics.

mod channel;
mod dirty;
mod hub;

pub use channel::*;
pub use dirty::*;
pub use hub::*;

#[cfg_attr(target_arch = "wasm32", wasm_bindgen::prelude::wasm_bindgen)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ListenerKey(pub(crate) slotmap::DefaultKey);
