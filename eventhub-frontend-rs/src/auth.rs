use std::cell::RefCell;
use std::rc::Rc;

use event_utils::Identity;
use herald::ListenerKey;

use crate::session;
use crate::storage::StorageError;
use crate::token_store::TokenStore;
use crate::topic::{Channel, Topic};

/// Re-read the token and decode it. Never cached.
pub fn current_identity(tokens: &TokenStore) -> Option<Identity> {
    tokens.get().as_deref().and_then(session::resolve)
}

pub fn login(tokens: &TokenStore, token: &str) -> Result<(), StorageError> {
    tokens.set(token)
}

pub fn logout(tokens: &TokenStore) -> Result<(), StorageError> {
    tokens.clear()
}

/// A subscriber's view of who is signed in.
///
/// The identity is derived when the session is mounted and again on every [`Topic::Auth`] notification. Any number of
/// sessions can be mounted on the same [`TokenStore`]; they all converge during the same notification pass. Dropping
/// the session unsubscribes it.
pub struct AuthSession {
    identity: Rc<RefCell<Option<Identity>>>,
    channel: Channel,
    key: ListenerKey,
}

impl AuthSession {
    pub fn mount(tokens: &TokenStore) -> Self {
        Self::mount_with(tokens, |_| {})
    }

    /// `on_change` runs after every re-derivation, with the fresh identity.
    pub fn mount_with(tokens: &TokenStore, on_change: impl Fn(Option<&Identity>) + 'static) -> Self {
        let identity = Rc::new(RefCell::new(current_identity(tokens)));

        let key = tokens.channel().subscribe_to(Topic::Auth, {
            let identity = identity.clone();
            let tokens = tokens.clone();
            move || {
                let next = current_identity(&tokens);
                identity.replace(next.clone());
                on_change(next.as_ref());
            }
        });

        Self {
            identity,
            channel: tokens.channel().clone(),
            key,
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.borrow().is_some()
    }

    pub fn listener_key(&self) -> ListenerKey {
        self.key
    }
}

impl Drop for AuthSession {
    fn drop(&mut self) {
        self.channel.unsubscribe(self.key);
    }
}
