use crate::auth;
use crate::token_store::TokenStore;

pub const LOGIN_ROUTE: &str = "/login";
pub const PROTECTED_ROUTES: [&str; 2] = ["/events", "/add-event"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Redirect(&'static str),
}

pub fn requires_session(route: &str) -> bool {
    let path = route.split(['?', '#']).next().unwrap_or(route);
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    PROTECTED_ROUTES.contains(&path)
}

/// Sends signed-out visitors of the protected pages to the login page. Decided from the stored token on every check.
#[derive(Clone)]
pub struct RouteGuard {
    tokens: TokenStore,
}

impl RouteGuard {
    pub fn new(tokens: TokenStore) -> Self {
        Self { tokens }
    }

    pub fn check(&self, route: &str) -> Access {
        if !requires_session(route) || auth::current_identity(&self.tokens).is_some() {
            return Access::Allowed;
        }
        log::debug!("{route} needs a session, redirecting to {LOGIN_ROUTE}");
        Access::Redirect(LOGIN_ROUTE)
    }
}
