use std::rc::Rc;
use std::sync::LazyLock;

use event_utils::{
    Credentials, DateFilterCriterion, EventDraft, EventPatch, Identity, JoinResponse, Registration,
};
use herald::ListenerKey;
use wasm_bindgen::prelude::*;

use crate::client::{EventHub, ListSnapshot};
use crate::config::ApiConfig;
use crate::guard::{Access, RouteGuard};
use crate::joined::JoinedSetTracker;
use crate::repository::HttpEventRepository;
use crate::storage::{KeyValueStorage, LocalStorage, MemoryStorage};
use crate::token_store::TokenStore;
use crate::topic::{Channel, Topic};
use crate::utils;

// putting this inside LOGGER prevents us from accidentally initializing the logger more than once
#[allow(clippy::declare_interior_mutable_const)]
const LOGGER: LazyLock<()> = LazyLock::new(|| {
    utils::set_panic_hook();

    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Logging initialized");
});

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen]
pub struct EventHubClient {
    hub: EventHub<HttpEventRepository>,
    guard: RouteGuard,
}

#[wasm_bindgen]
impl EventHubClient {
    #[wasm_bindgen(constructor)]
    pub fn new(api_base_url: Option<String>) -> EventHubClient {
        // used to only initialize the logger once
        #[allow(clippy::borrow_interior_mutable_const)]
        *LOGGER;

        let storage: Rc<dyn KeyValueStorage> = match LocalStorage::new() {
            Ok(storage) => Rc::new(storage),
            Err(e) => {
                log::warn!("Falling back to in-memory storage: {e}");
                Rc::new(MemoryStorage::default())
            }
        };
        let config = api_base_url.map(ApiConfig::new).unwrap_or_default();
        log::info!("Using event API at {}", config.base_url);

        let tokens = TokenStore::new(storage.clone(), Channel::default());
        let repository = HttpEventRepository::new(config).with_tokens(tokens.clone());
        let joined = JoinedSetTracker::load(storage);

        EventHubClient {
            guard: RouteGuard::new(tokens.clone()),
            hub: EventHub::from_parts(repository, tokens, joined),
        }
    }

    /// `topic` is one of `authChange`, `events`, `myEvents` or `joined`.
    pub fn subscribe(&self, topic: String, callback: js_sys::Function) -> Result<ListenerKey, JsValue> {
        let topic: Topic = topic.parse().map_err(js_error)?;
        Ok(self.hub.subscribe(topic, move || {
            let this = JsValue::null();
            if let Err(e) = callback.call0(&this) {
                log::error!("Error in {topic} listener: {e:?}");
            }
        }))
    }

    pub fn unsubscribe(&self, key: ListenerKey) {
        self.hub.unsubscribe(key)
    }

    pub fn identity(&self) -> Option<Identity> {
        self.hub.identity()
    }

    #[wasm_bindgen(js_name = isAuthenticated)]
    pub fn is_authenticated(&self) -> bool {
        self.hub.is_authenticated()
    }

    /// Where to send the visitor instead of `route`, if anywhere.
    #[wasm_bindgen(js_name = checkRoute)]
    pub fn check_route(&self, route: String) -> Option<String> {
        match self.guard.check(&route) {
            Access::Allowed => None,
            Access::Redirect(target) => Some(target.to_string()),
        }
    }

    pub async fn register(&self, registration: Registration) -> Result<Option<Identity>, JsValue> {
        self.hub.register(&registration).await.map_err(js_error)
    }

    pub async fn login(&self, credentials: Credentials) -> Result<Option<Identity>, JsValue> {
        self.hub.login(&credentials).await.map_err(js_error)
    }

    pub fn logout(&self) -> Result<(), JsValue> {
        self.hub.logout().map_err(js_error)
    }

    pub fn events(&self) -> ListSnapshot {
        self.hub.events()
    }

    /// The event list as the list page shows it. `date_filter` is `all`, `today`, `current-week`, `last-week`,
    /// `current-month` or `last-month`.
    #[wasm_bindgen(js_name = visibleEvents)]
    pub fn visible_events(&self, search_term: String, date_filter: String) -> Result<ListSnapshot, JsValue> {
        let criterion: DateFilterCriterion = date_filter.parse().map_err(js_error)?;
        let mut snapshot = self.hub.events();
        snapshot.events = self.hub.visible_events(&search_term, criterion);
        Ok(snapshot)
    }

    #[wasm_bindgen(js_name = myEvents)]
    pub fn my_events(&self) -> ListSnapshot {
        self.hub.my_events()
    }

    #[wasm_bindgen(js_name = refreshEvents)]
    pub async fn refresh_events(&self) -> Result<(), JsValue> {
        self.hub.refresh_events().await.map_err(js_error)
    }

    #[wasm_bindgen(js_name = refreshMyEvents)]
    pub async fn refresh_my_events(&self) -> Result<(), JsValue> {
        self.hub.refresh_my_events().await.map_err(js_error)
    }

    #[wasm_bindgen(js_name = canJoin)]
    pub fn can_join(&self, id: String) -> bool {
        self.hub.can_join(&id)
    }

    pub async fn join(&self, id: String) -> Result<JoinResponse, JsValue> {
        self.hub.join(&id).await.map_err(js_error)
    }

    /// Builds the event from the form's separate date and time inputs.
    pub async fn create(
        &self,
        title: String,
        date: String,
        time: String,
        location: String,
        description: String,
    ) -> Result<(), JsValue> {
        let draft = EventDraft::from_form(title, &date, &time, location, description);
        self.hub.create(&draft).await.map(|_| ()).map_err(js_error)
    }

    pub async fn update(&self, id: String, patch: EventPatch) -> Result<(), JsValue> {
        self.hub.update(&id, &patch).await.map_err(js_error)
    }

    pub async fn delete(&self, id: String) -> Result<(), JsValue> {
        self.hub.delete(&id).await.map_err(js_error)
    }
}
