mod date_filter;

pub use date_filter::{DateFilterCriterion, ParseDateFilterError};

use serde::{Deserialize, Deserializer, Serialize};

pub type EventId = String;

/// An event as served by `/api/events`. The client only ever holds read-only copies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id", alias = "id")]
    pub id: EventId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub creator: String,
    /// ISO-8601, either an instant (`2024-06-10T18:00:00.000Z`) or a zone-less local time (`2024-06-10T18:00`).
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attendee_count: u64,
}

/// Servers send `null` for absent values as often as they leave the key out; both read as the default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of `POST /api/events` and `PATCH /api/events/:id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    pub date_time: String,
    pub location: String,
    pub description: String,
}

pub type EventPatch = EventDraft;

impl EventDraft {
    /// Builds a draft from the separate date (`YYYY-MM-DD`) and time (`HH:MM`) inputs of the event form.
    pub fn from_form(
        title: impl Into<String>,
        date: &str,
        time: &str,
        location: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            date_time: format!("{date}T{time}"),
            location: location.into(),
            description: description.into(),
        }
    }
}

/// The user-facing profile carried inside a session token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub username: String,
    pub name: String,
    pub photo_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub photo_url: String,
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

// =======
// response envelopes
// =======

/// `GET /api/events`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<Event>,
}

/// Envelope used by the endpoints that report `success` explicitly. A missing `success` counts as a failure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

/// `PATCH /api/events/join/:id`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub attendee_count: Option<u64>,
}

/// `POST /api/users/register` and `POST /api/users/login`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}
