use std::collections::BTreeSet;
use std::rc::Rc;

use event_utils::EventId;

use crate::storage::{JOINED_EVENT_IDS_KEY, KeyValueStorage, StorageError};

/// The events this browser has joined, persisted as a JSON array of ids.
///
/// This is advisory bookkeeping. It only hides the "Join" action for events the user already joined from here; it is
/// never treated as proof of attendance and never sent to the server.
pub struct JoinedSetTracker {
    storage: Rc<dyn KeyValueStorage>,
    ids: BTreeSet<EventId>,
}

impl JoinedSetTracker {
    /// Reads the persisted set once. A missing or corrupt entry starts an empty set.
    pub fn load(storage: Rc<dyn KeyValueStorage>) -> Self {
        let ids = match storage.get_item(JOINED_EVENT_IDS_KEY) {
            Ok(Some(json)) => serde_json::from_str::<BTreeSet<EventId>>(&json)
                .inspect_err(|e| log::warn!("Discarding unreadable joined set: {e:?}"))
                .unwrap_or_default(),
            Ok(None) => BTreeSet::new(),
            Err(e) => {
                log::error!("Error reading joined set: {e:?}");
                BTreeSet::new()
            }
        };
        Self { storage, ids }
    }

    pub fn has(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Records `id` and persists immediately. Adding a known id just re-persists the same set.
    pub fn add(&mut self, id: impl Into<EventId>) -> Result<(), StorageError> {
        self.ids.insert(id.into());
        self.persist()
    }

    /// Drops every id that is not among `existing` (the ids of a complete, fresh event list) and returns how many
    /// were dropped. Attendance itself is not re-verified.
    pub fn retain_existing<'a>(
        &mut self,
        existing: impl IntoIterator<Item = &'a str>,
    ) -> Result<usize, StorageError> {
        let existing: BTreeSet<&str> = existing.into_iter().collect();
        let before = self.ids.len();
        self.ids.retain(|id| existing.contains(id.as_str()));
        let removed = before - self.ids.len();
        if removed > 0 {
            self.persist()?;
        }
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventId> {
        self.ids.iter()
    }

    fn persist(&self) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.ids)?;
        self.storage.set_item(JOINED_EVENT_IDS_KEY, &json)
    }
}
