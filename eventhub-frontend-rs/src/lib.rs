//! Client core for EventHub: session handling, the event lists and the joined-event bookkeeping a front end renders
//! from. Compiles to wasm for the browser and natively for the command line client and tests.

mod auth;
mod client;
mod config;
mod filter;
mod guard;
mod joined;
mod repository;
mod session;
mod storage;
mod token_store;
mod topic;

#[cfg(target_arch = "wasm32")]
mod bindings;
#[cfg(target_arch = "wasm32")]
mod utils;

pub use auth::{AuthSession, current_identity, login, logout};
pub use client::{ClientError, EventHub, FETCH_EVENTS_ERROR, FETCH_MY_EVENTS_ERROR, ListSnapshot};
pub use config::{ApiConfig, DEFAULT_API_BASE_URL};
pub use filter::{filter, filter_at, local_date};
pub use guard::{Access, LOGIN_ROUTE, PROTECTED_ROUTES, RouteGuard, requires_session};
pub use joined::JoinedSetTracker;
pub use repository::{EventRepository, HttpEventRepository, RepositoryError};
pub use session::resolve;
pub use storage::{JOINED_EVENT_IDS_KEY, KeyValueStorage, MemoryStorage, StorageError, TOKEN_KEY};
#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStorage;
#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorage;
pub use token_store::TokenStore;
pub use topic::{Channel, Topic, UnknownTopic};

#[cfg(target_arch = "wasm32")]
pub use bindings::EventHubClient;

pub use event_utils;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
pub fn get_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
