use std::cell::RefCell;
use std::rc::Rc;

use crate::{Hub, ListenerKey};

/// A cheaply cloneable handle to a shared [`Hub`]. All clones observe the same listeners and pending notifications.
pub struct Channel<Topic: Ord + Clone> {
    hub: Rc<RefCell<Hub<Topic>>>,
}

impl<Topic: Ord + Clone> Clone for Channel<Topic> {
    fn clone(&self) -> Self {
        Self {
            hub: self.hub.clone(),
        }
    }
}

impl<Topic: Ord + Clone> Default for Channel<Topic> {
    fn default() -> Self {
        Self {
            hub: Rc::new(RefCell::new(Hub::default())),
        }
    }
}

impl<Topic: Ord + Clone + 'static> Channel<Topic> {
    /// Subscribe to every topic.
    pub fn subscribe(&self, listener: impl Fn(ListenerKey, Topic) + 'static) -> ListenerKey {
        self.hub.borrow_mut().register_listener(listener)
    }

    /// Subscribe to a single topic.
    pub fn subscribe_to(&self, topic: Topic, listener: impl Fn() + 'static) -> ListenerKey {
        self.subscribe(move |_, fired| {
            if fired == topic {
                listener();
            }
        })
    }

    pub fn unsubscribe(&self, key: ListenerKey) {
        self.hub.borrow_mut().unregister_listener(key)
    }

    pub fn num_listeners(&self) -> usize {
        self.hub.borrow().num_listeners()
    }

    /// Queue a notification without delivering it. `modifier` is the listener responsible for the change, if any; it
    /// will not be told about its own write.
    pub fn notify(&self, topic: Topic, modifier: Option<ListenerKey>) {
        self.hub.borrow_mut().mark_dirty(topic, modifier);
    }

    pub fn is_dirty(&self, topic: &Topic) -> bool {
        self.hub.borrow().is_dirty(topic)
    }

    /// Deliver all queued notifications.
    pub fn flush(&self) {
        // do it like this to avoid holding the borrow while we call the callbacks
        let notifications = self.hub.borrow_mut().drain_due_notifications();
        if !notifications.is_empty() {
            log::trace!("delivering {} notification(s)", notifications.len());
        }
        // that's important because listeners routinely call back into code that borrows the hub again
        for notification in notifications {
            notification();
        }
    }

    /// Queue and immediately deliver a notification.
    pub fn emit(&self, topic: Topic) {
        self.notify(topic, None);
        self.flush();
    }

    /// Returns a guard that flushes when dropped, regardless of the code path a function takes.
    pub fn flush_later(&self) -> FlushLater<'_, Topic> {
        FlushLater { channel: self }
    }
}

pub struct FlushLater<'a, Topic: Ord + Clone + 'static> {
    channel: &'a Channel<Topic>,
}

impl<Topic: Ord + Clone + 'static> Drop for FlushLater<'_, Topic> {
    fn drop(&mut self) {
        self.channel.flush();
    }
}
