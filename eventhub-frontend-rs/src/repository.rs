//! The boundary to the remote event API. Every call is a single request/response; nothing is cached here.

use event_utils::{
    ApiResponse, Credentials, Event, EventDraft, EventList, EventPatch, JoinResponse, Registration,
    TokenResponse,
};
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::config::ApiConfig;
use crate::token_store::TokenStore;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The request never produced a usable response: network failure, non-2xx status or an unreadable body.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with `success: false`.
    #[error("{message}")]
    Rejected { message: String },
}

impl RepositoryError {
    pub fn rejected(message: Option<String>, fallback: &str) -> Self {
        RepositoryError::Rejected {
            message: message
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| fallback.to_string()),
        }
    }
}

/// What the client core needs from the API.
#[allow(async_fn_in_trait)]
pub trait EventRepository {
    async fn list(&self) -> Result<Vec<Event>, RepositoryError>;
    async fn list_mine(&self, username: &str) -> Result<Vec<Event>, RepositoryError>;
    /// Returns the created event when the server echoes it back.
    async fn create(&self, draft: &EventDraft) -> Result<Option<Event>, RepositoryError>;
    async fn update(&self, id: &str, patch: &EventPatch) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;
    async fn join(&self, id: &str) -> Result<JoinResponse, RepositoryError>;
    /// Returns the session token.
    async fn register(&self, registration: &Registration) -> Result<String, RepositoryError>;
    /// Returns the session token.
    async fn login(&self, credentials: &Credentials) -> Result<String, RepositoryError>;
}

/// [`EventRepository`] over HTTP/JSON. Sends the stored token as a bearer credential when there is one.
pub struct HttpEventRepository {
    client: reqwest::Client,
    config: ApiConfig,
    tokens: Option<TokenStore>,
}

impl HttpEventRepository {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            tokens: None,
        }
    }

    pub fn with_tokens(mut self, tokens: TokenStore) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&(impl serde::Serialize + ?Sized)>,
    ) -> Result<T, RepositoryError> {
        let url = self.config.url(path);
        log::debug!("{method} {url}");

        let mut request = self.client.request(method, url);
        if let Some(token) = self.tokens.as_ref().and_then(TokenStore::get) {
            request = request.header(reqwest::header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.json::<T>().await?)
    }

    async fn send_without_body<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
    ) -> Result<T, RepositoryError> {
        self.send::<T>(method, path, None::<&()>).await
    }
}

impl EventRepository for HttpEventRepository {
    async fn list(&self) -> Result<Vec<Event>, RepositoryError> {
        let list: EventList = self.send_without_body(Method::GET, "/api/events").await?;
        Ok(list.data)
    }

    async fn list_mine(&self, username: &str) -> Result<Vec<Event>, RepositoryError> {
        let response: ApiResponse<Vec<Event>> = self
            .send_without_body(Method::GET, &format!("/api/events/my/{username}"))
            .await?;
        if !response.success {
            return Err(RepositoryError::rejected(
                response.message,
                "Failed to fetch your events",
            ));
        }
        Ok(response.data.unwrap_or_default())
    }

    async fn create(&self, draft: &EventDraft) -> Result<Option<Event>, RepositoryError> {
        let response: ApiResponse<Event> = self
            .send(Method::POST, "/api/events", Some(draft))
            .await?;
        if !response.success {
            return Err(RepositoryError::rejected(
                response.message,
                "Failed to create event",
            ));
        }
        Ok(response.data)
    }

    async fn update(&self, id: &str, patch: &EventPatch) -> Result<(), RepositoryError> {
        let response: ApiResponse<serde::de::IgnoredAny> = self
            .send(Method::PATCH, &format!("/api/events/{id}"), Some(patch))
            .await?;
        if !response.success {
            return Err(RepositoryError::rejected(
                response.message,
                "Failed to update event",
            ));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let response: ApiResponse<serde::de::IgnoredAny> = self
            .send_without_body(Method::DELETE, &format!("/api/events/{id}"))
            .await?;
        if !response.success {
            return Err(RepositoryError::rejected(
                response.message,
                "Failed to delete event",
            ));
        }
        Ok(())
    }

    async fn join(&self, id: &str) -> Result<JoinResponse, RepositoryError> {
        let response: JoinResponse = self
            .send_without_body(Method::PATCH, &format!("/api/events/join/{id}"))
            .await?;
        if !response.success {
            return Err(RepositoryError::rejected(
                response.message,
                "Failed to join event",
            ));
        }
        Ok(response)
    }

    async fn register(&self, registration: &Registration) -> Result<String, RepositoryError> {
        let response: TokenResponse = self
            .send(Method::POST, "/api/users/register", Some(registration))
            .await?;
        token_from(response, "Registration failed")
    }

    async fn login(&self, credentials: &Credentials) -> Result<String, RepositoryError> {
        let response: TokenResponse = self
            .send(Method::POST, "/api/users/login", Some(credentials))
            .await?;
        token_from(response, "Login failed")
    }
}

fn token_from(response: TokenResponse, fallback: &str) -> Result<String, RepositoryError> {
    match response {
        TokenResponse {
            success: true,
            token: Some(token),
            ..
        } if !token.is_empty() => Ok(token),
        TokenResponse { message, .. } => Err(RepositoryError::rejected(message, fallback)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_falls_back_to_a_generic_message() {
        let err = RepositoryError::rejected(None, "Failed to join event");
        assert_eq!(err.to_string(), "Failed to join event");
        let err = RepositoryError::rejected(Some(String::new()), "Failed to join event");
        assert_eq!(err.to_string(), "Failed to join event");
        let err = RepositoryError::rejected(Some("Event is full".to_string()), "Failed");
        assert_eq!(err.to_string(), "Event is full");
    }

    #[test]
    fn token_requires_success_and_a_token() {
        let ok = TokenResponse {
            success: true,
            message: None,
            token: Some("a.b.c".to_string()),
        };
        assert_eq!(token_from(ok, "Login failed").unwrap(), "a.b.c");

        let missing = TokenResponse {
            success: true,
            message: None,
            token: None,
        };
        assert!(matches!(
            token_from(missing, "Login failed"),
            Err(RepositoryError::Rejected { message }) if message == "Login failed"
        ));

        let refused = TokenResponse {
            success: false,
            message: Some("Username taken".to_string()),
            token: Some("a.b.c".to_string()),
        };
        assert!(matches!(
            token_from(refused, "Registration failed"),
            Err(RepositoryError::Rejected { message }) if message == "Username taken"
        ));
    }
}
