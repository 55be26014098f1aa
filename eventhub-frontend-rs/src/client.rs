use std::cell::RefCell;
use std::rc::Rc;

use event_utils::{
    Credentials, DateFilterCriterion, Event, EventDraft, EventPatch, Identity, JoinResponse,
    Registration,
};
use herald::ListenerKey;
use serde::{Deserialize, Serialize};

use crate::auth::{self, AuthSession};
use crate::filter;
use crate::joined::JoinedSetTracker;
use crate::repository::{EventRepository, RepositoryError};
use crate::storage::{KeyValueStorage, StorageError};
use crate::token_store::TokenStore;
use crate::topic::{Channel, Topic};

pub const FETCH_EVENTS_ERROR: &str = "Error fetching events";
pub const FETCH_MY_EVENTS_ERROR: &str = "Failed to fetch your events";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("you need to sign in first")]
    NotSignedIn,
}

/// What a list view renders: the last list that arrived, whether the first fetch is still pending, and the last error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi))]
#[serde(rename_all = "camelCase")]
pub struct ListSnapshot {
    pub loading: bool,
    pub events: Vec<Event>,
    pub error: Option<String>,
}

impl Default for ListSnapshot {
    fn default() -> Self {
        Self {
            loading: true,
            events: Vec::new(),
            error: None,
        }
    }
}

/// The client core: session, joined bookkeeping and the two server lists, kept in sync through one [`Channel`].
///
/// Every mutation that succeeds on the server is followed by exactly one full re-fetch of the affected list; nothing
/// is patched locally. Independent refreshes are neither coalesced nor cancelled, so the last response to arrive wins.
///
/// We never hold a borrow across an `.await`. That rules out "already borrowed" panics when listeners call back in.
pub struct EventHub<R> {
    repository: R,
    channel: Channel,
    tokens: TokenStore,
    joined: RefCell<JoinedSetTracker>,
    events: RefCell<ListSnapshot>,
    my_events: RefCell<ListSnapshot>,
}

impl<R: EventRepository> EventHub<R> {
    pub fn new(repository: R, storage: Rc<dyn KeyValueStorage>) -> Self {
        let tokens = TokenStore::new(storage.clone(), Channel::default());
        Self::from_parts(repository, tokens, JoinedSetTracker::load(storage))
    }

    /// For repositories that need the token store themselves.
    pub fn from_parts(repository: R, tokens: TokenStore, joined: JoinedSetTracker) -> Self {
        Self {
            repository,
            channel: tokens.channel().clone(),
            tokens,
            joined: RefCell::new(joined),
            events: RefCell::new(ListSnapshot::default()),
            my_events: RefCell::new(ListSnapshot::default()),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn subscribe(&self, topic: Topic, listener: impl Fn() + 'static) -> ListenerKey {
        self.channel.subscribe_to(topic, listener)
    }

    pub fn unsubscribe(&self, key: ListenerKey) {
        self.channel.unsubscribe(key)
    }

    // =======
    // session
    // =======

    pub fn identity(&self) -> Option<Identity> {
        auth::current_identity(&self.tokens)
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }

    pub fn mount_session(&self) -> AuthSession {
        AuthSession::mount(&self.tokens)
    }

    pub async fn register(&self, registration: &Registration) -> Result<Option<Identity>, ClientError> {
        let token = self
            .repository
            .register(registration)
            .await
            .inspect_err(|e| log::error!("Registration failed: {e}"))?;
        self.sign_in_with(&token)
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Option<Identity>, ClientError> {
        let token = self
            .repository
            .login(credentials)
            .await
            .inspect_err(|e| log::error!("Login failed: {e}"))?;
        self.sign_in_with(&token)
    }

    fn sign_in_with(&self, token: &str) -> Result<Option<Identity>, ClientError> {
        auth::login(&self.tokens, token)?;
        let identity = self.identity();
        match &identity {
            Some(identity) => log::info!("Signed in as {}", identity.username),
            None => log::warn!("Signed in, but the token carries no usable identity"),
        }
        Ok(identity)
    }

    pub fn logout(&self) -> Result<(), ClientError> {
        auth::logout(&self.tokens)?;
        log::info!("Signed out");
        Ok(())
    }

    // =======
    // lists
    // =======

    pub fn events(&self) -> ListSnapshot {
        self.events.borrow().clone()
    }

    pub fn my_events(&self) -> ListSnapshot {
        self.my_events.borrow().clone()
    }

    /// The cached event list narrowed by title search and date window, in server order.
    pub fn visible_events(&self, search_term: &str, criterion: DateFilterCriterion) -> Vec<Event> {
        filter::filter(&self.events.borrow().events, search_term, criterion)
    }

    pub async fn refresh_events(&self) -> Result<(), ClientError> {
        let result = self.repository.list().await;

        let _flusher = self.channel.flush_later();
        let mut events = self.events.borrow_mut();
        events.loading = false;
        match result {
            Ok(fresh) => {
                let pruned = self
                    .joined
                    .borrow_mut()
                    .retain_existing(fresh.iter().map(|event| event.id.as_str()));
                events.events = fresh;
                events.error = None;
                self.channel.notify(Topic::Events, None);

                match pruned {
                    Ok(0) => {}
                    Ok(removed) => {
                        log::info!("Forgot {removed} joined event(s) that no longer exist");
                        self.channel.notify(Topic::Joined, None);
                    }
                    Err(e) => log::error!("Error pruning joined set: {e:?}"),
                }
                Ok(())
            }
            Err(e) => {
                log::error!("Error fetching events: {e}");
                events.error = Some(FETCH_EVENTS_ERROR.to_string());
                self.channel.notify(Topic::Events, None);
                Err(e.into())
            }
        }
    }

    /// Does nothing while signed out.
    pub async fn refresh_my_events(&self) -> Result<(), ClientError> {
        let Some(identity) = self.identity() else {
            return Ok(());
        };
        let result = self.repository.list_mine(&identity.username).await;

        let _flusher = self.channel.flush_later();
        let mut my_events = self.my_events.borrow_mut();
        my_events.loading = false;
        self.channel.notify(Topic::MyEvents, None);
        match result {
            Ok(fresh) => {
                my_events.events = fresh;
                my_events.error = None;
                Ok(())
            }
            Err(e) => {
                log::error!("Error fetching events of {}: {e}", identity.username);
                my_events.error = Some(match &e {
                    RepositoryError::Rejected { .. } => FETCH_MY_EVENTS_ERROR.to_string(),
                    RepositoryError::Transport(_) => FETCH_EVENTS_ERROR.to_string(),
                });
                Err(e.into())
            }
        }
    }

    // =======
    // mutations
    // =======

    /// False once this browser has joined the event.
    pub fn can_join(&self, id: &str) -> bool {
        !self.joined.borrow().has(id)
    }

    pub async fn join(&self, id: &str) -> Result<JoinResponse, ClientError> {
        let response = self
            .repository
            .join(id)
            .await
            .inspect_err(|e| log::error!("Error joining event {id}: {e}"))?;
        log::info!("Joined event {id}");

        let recorded = {
            let _flusher = self.channel.flush_later();
            let recorded = self.joined.borrow_mut().add(id);
            self.channel.notify(Topic::Joined, None);
            recorded
        };
        self.relist().await;
        recorded?;
        Ok(response)
    }

    pub async fn create(&self, draft: &EventDraft) -> Result<Option<Event>, ClientError> {
        let created = self
            .repository
            .create(draft)
            .await
            .inspect_err(|e| log::error!("Error creating event: {e}"))?;
        log::info!("Created event {:?}", draft.title);

        self.relist_both().await;
        Ok(created)
    }

    pub async fn update(&self, id: &str, patch: &EventPatch) -> Result<(), ClientError> {
        self.repository
            .update(id, patch)
            .await
            .inspect_err(|e| log::error!("Error updating event {id}: {e}"))?;
        log::info!("Updated event {id}");
        self.relist_both().await;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.repository
            .delete(id)
            .await
            .inspect_err(|e| log::error!("Error deleting event {id}: {e}"))?;
        log::info!("Deleted event {id}");
        self.relist_both().await;
        Ok(())
    }

    /// Re-fetch after a mutation the server accepted. A failure here lands in the list's `error` and is already
    /// logged; it does not turn the mutation into a failure.
    async fn relist(&self) {
        let _ = self.refresh_events().await;
    }

    async fn relist_both(&self) {
        self.relist().await;
        let _ = self.refresh_my_events().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::token_for;
    use crate::storage::MemoryStorage;
    use futures::executor::block_on;
    use std::cell::Cell;
    use std::collections::VecDeque;

    fn event(id: &str, title: &str) -> Event {
        Event {
            id: id.to_string(),
            title: title.to_string(),
            creator: "ada".to_string(),
            date_time: Some("2024-06-10T18:00:00Z".to_string()),
            location: "Oslo".to_string(),
            description: String::new(),
            attendee_count: 1,
        }
    }

    #[derive(Default)]
    struct Calls {
        list: Cell<usize>,
        list_mine: RefCell<Vec<String>>,
        join: RefCell<Vec<String>>,
        update: RefCell<Vec<String>>,
        delete: RefCell<Vec<String>>,
        create: Cell<usize>,
    }

    /// Serves canned answers and counts calls.
    #[derive(Default)]
    struct FakeRepository {
        calls: Calls,
        lists: RefCell<VecDeque<Result<Vec<Event>, RepositoryError>>>,
        mine: RefCell<Vec<Event>>,
        join_success: Cell<bool>,
        mutation_success: Cell<bool>,
        token: RefCell<Option<String>>,
    }

    impl FakeRepository {
        fn new() -> Self {
            let repository = Self::default();
            repository.join_success.set(true);
            repository.mutation_success.set(true);
            repository
        }

        fn queue_list(&self, events: Vec<Event>) {
            self.lists.borrow_mut().push_back(Ok(events));
        }

        fn queue_list_failure(&self) {
            self.lists.borrow_mut().push_back(Err(RepositoryError::rejected(None, "offline")));
        }

        fn verdict(&self, fallback: &str) -> Result<(), RepositoryError> {
            if self.mutation_success.get() {
                Ok(())
            } else {
                Err(RepositoryError::rejected(None, fallback))
            }
        }
    }

    impl EventRepository for FakeRepository {
        async fn list(&self) -> Result<Vec<Event>, RepositoryError> {
            self.calls.list.set(self.calls.list.get() + 1);
            self.lists.borrow_mut().pop_front().unwrap_or(Ok(Vec::new()))
        }

        async fn list_mine(&self, username: &str) -> Result<Vec<Event>, RepositoryError> {
            self.calls.list_mine.borrow_mut().push(username.to_string());
            Ok(self.mine.borrow().clone())
        }

        async fn create(&self, draft: &EventDraft) -> Result<Option<Event>, RepositoryError> {
            self.calls.create.set(self.calls.create.get() + 1);
            self.verdict("Failed to create event")?;
            Ok(Some(event("new", &draft.title)))
        }

        async fn update(&self, id: &str, _patch: &EventPatch) -> Result<(), RepositoryError> {
            self.calls.update.borrow_mut().push(id.to_string());
            self.verdict("Failed to update event")
        }

        async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
            self.calls.delete.borrow_mut().push(id.to_string());
            self.verdict("Failed to delete event")
        }

        async fn join(&self, id: &str) -> Result<JoinResponse, RepositoryError> {
            self.calls.join.borrow_mut().push(id.to_string());
            if self.join_success.get() {
                Ok(JoinResponse {
                    success: true,
                    message: None,
                    attendee_count: Some(2),
                })
            } else {
                Err(RepositoryError::rejected(
                    Some("Already joined".to_string()),
                    "Failed to join event",
                ))
            }
        }

        async fn register(&self, _registration: &Registration) -> Result<String, RepositoryError> {
            self.token
                .borrow()
                .clone()
                .ok_or_else(|| RepositoryError::rejected(None, "Registration failed"))
        }

        async fn login(&self, _credentials: &Credentials) -> Result<String, RepositoryError> {
            self.token
                .borrow()
                .clone()
                .ok_or_else(|| RepositoryError::rejected(None, "Login failed"))
        }
    }

    fn hub() -> (EventHub<FakeRepository>, Rc<dyn KeyValueStorage>) {
        let storage: Rc<dyn KeyValueStorage> = Rc::new(MemoryStorage::default());
        (EventHub::new(FakeRepository::new(), storage.clone()), storage)
    }

    fn ada_token() -> String {
        token_for(serde_json::json!({ "username": "ada", "name": "Ada" }))
    }

    fn counter(hub: &EventHub<FakeRepository>, topic: Topic) -> Rc<Cell<usize>> {
        let count = Rc::new(Cell::new(0));
        hub.subscribe(topic, {
            let count = count.clone();
            move || count.set(count.get() + 1)
        });
        count
    }

    #[test]
    fn starts_loading_then_shows_the_fetched_list() {
        let (hub, _) = hub();
        hub.repository().queue_list(vec![event("E1", "Rust meetup")]);
        assert!(hub.events().loading);

        let notified = counter(&hub, Topic::Events);
        block_on(hub.refresh_events()).unwrap();

        let events = hub.events();
        assert!(!events.loading);
        assert_eq!(events.events, vec![event("E1", "Rust meetup")]);
        assert_eq!(events.error, None);
        assert_eq!(notified.get(), 1);
    }

    #[test]
    fn failed_fetch_keeps_the_old_list_and_reports_a_generic_error() {
        let (hub, _) = hub();
        hub.repository().queue_list(vec![event("E1", "Rust meetup")]);
        hub.repository().queue_list_failure();
        block_on(hub.refresh_events()).unwrap();

        assert!(block_on(hub.refresh_events()).is_err());
        let events = hub.events();
        assert_eq!(events.events.len(), 1);
        assert_eq!(events.error.as_deref(), Some(FETCH_EVENTS_ERROR));
    }

    #[test]
    fn join_disables_joining_and_relists_exactly_once() {
        let (hub, storage) = hub();
        hub.repository().queue_list(vec![event("E42", "Rust meetup")]);
        hub.repository().queue_list(vec![event("E42", "Rust meetup")]);
        block_on(hub.refresh_events()).unwrap();
        assert_eq!(hub.repository().calls.list.get(), 1);
        assert!(hub.can_join("E42"));

        let joined = counter(&hub, Topic::Joined);
        let response = block_on(hub.join("E42")).unwrap();

        assert_eq!(response.attendee_count, Some(2));
        assert!(!hub.can_join("E42"));
        assert_eq!(hub.repository().calls.list.get(), 2);
        assert_eq!(joined.get(), 1);
        assert!(JoinedSetTracker::load(storage).has("E42"));
    }

    #[test]
    fn join_survives_a_failed_relist() {
        let (hub, _) = hub();
        hub.repository().queue_list_failure();

        let response = block_on(hub.join("E42")).unwrap();
        assert_eq!(response.attendee_count, Some(2));
        assert!(!hub.can_join("E42"));
        assert_eq!(hub.repository().calls.list.get(), 1);
        assert_eq!(hub.events().error.as_deref(), Some(FETCH_EVENTS_ERROR));
    }

    #[test]
    fn mutations_survive_a_failed_relist() {
        let (hub, _) = hub();
        hub.tokens().set(&ada_token()).unwrap();
        let draft = EventDraft::from_form("Launch", "2024-06-10", "18:00", "Oslo", "Party");

        hub.repository().queue_list_failure();
        assert!(block_on(hub.create(&draft)).unwrap().is_some());
        hub.repository().queue_list_failure();
        block_on(hub.update("E7", &draft)).unwrap();
        hub.repository().queue_list_failure();
        block_on(hub.delete("E7")).unwrap();

        assert_eq!(hub.repository().calls.list.get(), 3);
        assert_eq!(hub.repository().calls.list_mine.borrow().len(), 3);
        assert_eq!(hub.events().error.as_deref(), Some(FETCH_EVENTS_ERROR));
    }

    #[test]
    fn rejected_join_changes_nothing() {
        let (hub, _) = hub();
        hub.repository().join_success.set(false);

        let err = block_on(hub.join("E42")).unwrap_err();
        assert_eq!(err.to_string(), "Already joined");
        assert!(hub.can_join("E42"));
        assert_eq!(hub.repository().calls.list.get(), 0);
    }

    #[test]
    fn refresh_forgets_joined_events_that_vanished() {
        let (hub, _) = hub();
        hub.repository().queue_list(vec![event("E1", "a"), event("E2", "b")]);
        hub.repository().queue_list(vec![event("E2", "b")]);
        block_on(hub.join("E1")).unwrap();
        assert!(!hub.can_join("E1"));

        block_on(hub.refresh_events()).unwrap();
        assert!(hub.can_join("E1"));
    }

    #[test]
    fn visible_events_filters_the_cached_list() {
        let (hub, _) = hub();
        hub.repository()
            .queue_list(vec![event("E1", "Rust meetup"), event("E2", "Chess club")]);
        block_on(hub.refresh_events()).unwrap();

        let visible = hub.visible_events("rust", DateFilterCriterion::All);
        assert_eq!(visible, vec![event("E1", "Rust meetup")]);
        assert_eq!(hub.visible_events("", DateFilterCriterion::All).len(), 2);
    }

    #[test]
    fn register_stores_the_token_and_notifies() {
        let (hub, _) = hub();
        hub.repository().token.replace(Some(ada_token()));
        let session = hub.mount_session();
        let auth = counter(&hub, Topic::Auth);

        let registration = Registration {
            name: "Ada".to_string(),
            photo_url: String::new(),
            username: "ada".to_string(),
            password: "hunter2".to_string(),
        };
        let identity = block_on(hub.register(&registration)).unwrap();

        assert_eq!(identity.unwrap().username, "ada");
        assert_eq!(session.identity().unwrap().username, "ada");
        assert_eq!(auth.get(), 1);

        hub.logout().unwrap();
        assert!(!session.is_authenticated());
        assert!(!hub.is_authenticated());
        assert_eq!(auth.get(), 2);
    }

    #[test]
    fn failed_login_keeps_the_user_signed_out() {
        let (hub, _) = hub();
        let credentials = Credentials {
            username: "ada".to_string(),
            password: "wrong".to_string(),
        };
        let err = block_on(hub.login(&credentials)).unwrap_err();
        assert_eq!(err.to_string(), "Login failed");
        assert!(!hub.is_authenticated());
    }

    #[test]
    fn my_events_need_a_session() {
        let (hub, _) = hub();
        block_on(hub.refresh_my_events()).unwrap();
        assert!(hub.repository().calls.list_mine.borrow().is_empty());

        hub.tokens().set(&ada_token()).unwrap();
        hub.repository().mine.replace(vec![event("E7", "Mine")]);
        block_on(hub.refresh_my_events()).unwrap();
        assert_eq!(*hub.repository().calls.list_mine.borrow(), vec!["ada"]);
        assert_eq!(hub.my_events().events, vec![event("E7", "Mine")]);
    }

    #[test]
    fn update_and_delete_relist_once_each() {
        let (hub, _) = hub();
        hub.tokens().set(&ada_token()).unwrap();
        let patch = EventDraft::from_form("Renamed", "2024-06-10", "18:00", "Oslo", "Talks");

        block_on(hub.update("E7", &patch)).unwrap();
        assert_eq!(*hub.repository().calls.update.borrow(), vec!["E7"]);
        assert_eq!(hub.repository().calls.list.get(), 1);
        assert_eq!(hub.repository().calls.list_mine.borrow().len(), 1);

        block_on(hub.delete("E7")).unwrap();
        assert_eq!(*hub.repository().calls.delete.borrow(), vec!["E7"]);
        assert_eq!(hub.repository().calls.list.get(), 2);
        assert_eq!(hub.repository().calls.list_mine.borrow().len(), 2);
    }

    #[test]
    fn rejected_update_does_not_refresh() {
        let (hub, _) = hub();
        hub.tokens().set(&ada_token()).unwrap();
        hub.repository().mutation_success.set(false);
        let patch = EventDraft::from_form("Renamed", "2024-06-10", "18:00", "Oslo", "Talks");

        let err = block_on(hub.update("E7", &patch)).unwrap_err();
        assert_eq!(err.to_string(), "Failed to update event");
        assert_eq!(hub.repository().calls.list.get(), 0);
        assert!(hub.repository().calls.list_mine.borrow().is_empty());
    }

    #[test]
    fn create_refreshes_both_lists() {
        let (hub, _) = hub();
        hub.tokens().set(&ada_token()).unwrap();
        let draft = EventDraft::from_form("Launch", "2024-06-10", "18:00", "Oslo", "Party");

        let created = block_on(hub.create(&draft)).unwrap();
        assert_eq!(created.unwrap().title, "Launch");
        assert_eq!(hub.repository().calls.create.get(), 1);
        assert_eq!(hub.repository().calls.list.get(), 1);
        assert_eq!(hub.repository().calls.list_mine.borrow().len(), 1);
    }

    #[test]
    fn listeners_can_read_the_hub_during_notification() {
        let (hub, _) = hub();
        let hub = Rc::new(hub);
        hub.repository().queue_list(vec![event("E1", "Rust meetup")]);
        let seen = Rc::new(Cell::new(0));
        hub.subscribe(Topic::Events, {
            let hub = Rc::downgrade(&hub);
            let seen = seen.clone();
            move || {
                if let Some(hub) = hub.upgrade() {
                    seen.set(hub.events().events.len());
                }
            }
        });

        block_on(hub.refresh_events()).unwrap();
        assert_eq!(seen.get(), 1);
    }
}
