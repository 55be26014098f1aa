use std::rc::Rc;

use crate::storage::{KeyValueStorage, StorageError, TOKEN_KEY};
use crate::topic::{Channel, Topic};

/// The bearer token in durable storage. Every successful mutation broadcasts [`Topic::Auth`] synchronously, after the
/// write has landed, so listeners always read the new value.
///
/// No validation happens here; see [`crate::session::resolve`].
#[derive(Clone)]
pub struct TokenStore {
    storage: Rc<dyn KeyValueStorage>,
    channel: Channel,
}

impl TokenStore {
    pub fn new(storage: Rc<dyn KeyValueStorage>, channel: Channel) -> Self {
        Self { storage, channel }
    }

    /// An unreadable or empty entry counts as "no token".
    pub fn get(&self) -> Option<String> {
        match self.storage.get_item(TOKEN_KEY) {
            Ok(token) => token.filter(|token| !token.is_empty()),
            Err(e) => {
                log::error!("Error reading token: {e:?}");
                None
            }
        }
    }

    pub fn set(&self, token: &str) -> Result<(), StorageError> {
        self.storage.set_item(TOKEN_KEY, token)?;
        self.channel.emit(Topic::Auth);
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove_item(TOKEN_KEY)?;
        self.channel.emit(Topic::Auth);
        Ok(())
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use std::cell::RefCell;

    fn store() -> TokenStore {
        TokenStore::new(Rc::new(MemoryStorage::default()), Channel::default())
    }

    #[test]
    fn set_get_clear() {
        let tokens = store();
        assert_eq!(tokens.get(), None);
        tokens.set("a.b.c").unwrap();
        assert_eq!(tokens.get().as_deref(), Some("a.b.c"));
        tokens.clear().unwrap();
        assert_eq!(tokens.get(), None);
    }

    #[test]
    fn empty_token_is_no_token() {
        let tokens = store();
        tokens.set("").unwrap();
        assert_eq!(tokens.get(), None);
    }

    #[test]
    fn every_mutation_broadcasts_the_new_value() {
        let tokens = store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        tokens.channel().subscribe_to(Topic::Auth, {
            let seen = seen.clone();
            let tokens = tokens.clone();
            move || seen.borrow_mut().push(tokens.get())
        });

        tokens.set("a.b.c").unwrap();
        tokens.set("d.e.f").unwrap();
        tokens.clear().unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![Some("a.b.c".to_string()), Some("d.e.f".to_string()), None]
        );
    }

    #[test]
    fn survives_a_reload() {
        let storage: Rc<dyn KeyValueStorage> = Rc::new(MemoryStorage::default());
        TokenStore::new(storage.clone(), Channel::default())
            .set("a.b.c")
            .unwrap();
        let reloaded = TokenStore::new(storage, Channel::default());
        assert_eq!(reloaded.get().as_deref(), Some("a.b.c"));
    }
}
