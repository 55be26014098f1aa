use std::collections::BTreeMap;
use std::rc::Rc;

use crate::{DirtyState, ListenerKey};

type Listener<Topic> = Rc<dyn Fn(ListenerKey, Topic)>;

/// Listener registry plus per-topic dirty flags. The hub never invokes listeners itself; see
/// [`Hub::drain_due_notifications`].
pub struct Hub<Topic: Ord + Clone> {
    pending: BTreeMap<Topic, DirtyState>,
    listeners: slotmap::SlotMap<slotmap::DefaultKey, Listener<Topic>>,
}

impl<Topic: Ord + Clone> Default for Hub<Topic> {
    fn default() -> Self {
        Self {
            pending: BTreeMap::new(),
            listeners: Default::default(),
        }
    }
}

impl<Topic: Ord + Clone + 'static> Hub<Topic> {
    /// The listener is invoked once per dirty topic on every drain.
    pub fn register_listener(&mut self, listener: impl Fn(ListenerKey, Topic) + 'static) -> ListenerKey {
        let key = self.listeners.insert(Rc::new(listener));
        ListenerKey(key)
    }

    /// Unregister a previously registered listener. Unknown keys are ignored.
    pub fn unregister_listener(&mut self, key: ListenerKey) {
        self.listeners.remove(key.0);
    }

    pub fn num_listeners(&self) -> usize {
        self.listeners.len()
    }

    pub fn mark_dirty(&mut self, topic: Topic, modifier: Option<ListenerKey>) {
        let state = self.pending.entry(topic).or_default();
        *state = state.mark(modifier);
    }

    pub fn is_dirty(&self, topic: &Topic) -> bool {
        self.pending.get(topic).is_some_and(DirtyState::is_dirty)
    }

    /// Resets every topic to clean and returns the notifications that were due, in topic order and then in
    /// registration order. Call the returned closures only after releasing any borrow of the hub.
    pub fn drain_due_notifications(&mut self) -> Vec<Box<dyn FnOnce()>> {
        let mut notifications: Vec<Box<dyn FnOnce()>> = Vec::new();
        for (topic, state) in std::mem::take(&mut self.pending) {
            if !state.is_dirty() {
                continue;
            }
            let exclude_key = state.excluded();

            for (key, listener) in self.listeners.iter() {
                let listener_key = ListenerKey(key);
                if exclude_key == Some(listener_key) {
                    continue;
                }
                let listener = listener.clone();
                let topic = topic.clone();
                notifications.push(Box::new(move || listener(listener_key, topic)));
            }
        }
        notifications
    }
}
