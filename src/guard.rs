//! Per-navigation route guard.
//!
//! Every navigation first refreshes the session against the gateway, then
//! decides whether the requested page may render, or where to redirect.

use std::fmt;

use tracing::{debug, warn};
use url::form_urlencoded::byte_serialize;
use url::Url;

use crate::gateway::Gateway;
use crate::model::Session;

pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const ERROR_PATH: &str = "/error";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const ACCOUNT_PATH: &str = "/account";
pub const TASKS_PATH: &str = "/tasks";

pub const DEFAULT_ERROR_MESSAGE: &str = "An error occurred";

const BASE_URL: &str = "http://lifesync.local";
const ASSET_EXTENSIONS: [&str; 6] = ["svg", "png", "jpg", "jpeg", "gif", "webp"];

/// A page of the app, parsed from a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Error { message: String },
    Account,
    Dashboard,
    Tasks,
    Task(String),
    Recipes,
    Profile,
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectToLogin,
    RedirectToDashboard,
}

impl Decision {
    /// Where a redirect points, or None when the page may render.
    pub fn location(&self) -> Option<&'static str> {
        match self {
            Decision::Allow => None,
            Decision::RedirectToLogin => Some(LOGIN_PATH),
            Decision::RedirectToDashboard => Some(DASHBOARD_PATH),
        }
    }
}

impl Route {
    /// Parse a request path, with an optional query string. Paths that
    /// are not pages of the app come back as `Other`.
    pub fn parse(path: &str) -> Route {
        // only plain absolute paths; `//host` would be taken as an authority
        if !path.starts_with('/') || path.starts_with("//") || path.starts_with("/\\") {
            return Route::Other(path.to_string());
        }
        let url = match Url::parse(BASE_URL).and_then(|base| base.join(path)) {
            Ok(url) => url,
            Err(_) => return Route::Other(path.to_string()),
        };

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.collect())
            .unwrap_or_default();

        match segments.as_slice() {
            [""] => Route::Home,
            ["login"] => Route::Login,
            ["error"] => Route::Error {
                message: url
                    .query_pairs()
                    .find(|(key, _)| key == "message")
                    .map(|(_, value)| value.into_owned())
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
            },
            ["account"] => Route::Account,
            ["dashboard"] => Route::Dashboard,
            ["tasks"] => Route::Tasks,
            ["tasks", id] if !id.is_empty() => Route::Task(id.to_string()),
            ["recipes"] => Route::Recipes,
            ["profile"] => Route::Profile,
            _ => Route::Other(url.path().to_string()),
        }
    }

    pub fn error(message: &str) -> Route {
        Route::Error {
            message: message.to_string(),
        }
    }

    /// The request path of this route, without query string.
    pub fn pathname(&self) -> String {
        match self {
            Route::Home => HOME_PATH.to_string(),
            Route::Login => LOGIN_PATH.to_string(),
            Route::Error { .. } => ERROR_PATH.to_string(),
            Route::Account => ACCOUNT_PATH.to_string(),
            Route::Dashboard => DASHBOARD_PATH.to_string(),
            Route::Tasks => TASKS_PATH.to_string(),
            Route::Task(id) => format!("{}/{}", TASKS_PATH, id),
            Route::Recipes => "/recipes".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::Other(path) => path.clone(),
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Home | Route::Login | Route::Error { .. } => Access::Public,
            _ => Access::Protected,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Route::Error { message } => {
                let encoded: String = byte_serialize(message.as_bytes()).collect();
                write!(f, "{}?message={}", ERROR_PATH, encoded)
            }
            other => write!(f, "{}", other.pathname()),
        }
    }
}

/// Decide what happens to a navigation to `route`.
pub fn decide(route: &Route, session_present: bool) -> Decision {
    if !session_present && route.access() == Access::Protected {
        return Decision::RedirectToLogin;
    }
    if session_present && *route == Route::Login {
        return Decision::RedirectToDashboard;
    }
    Decision::Allow
}

/// Static files and images never go through the guard.
pub fn is_static_asset(path: &str) -> bool {
    let pathname = path.split(|c| c == '?' || c == '#').next().unwrap_or(path);
    if pathname.starts_with("/_next/static") || pathname.starts_with("/_next/image") {
        return true;
    }
    if pathname == "/favicon.ico" {
        return true;
    }
    match pathname.rsplit_once('.') {
        Some((_, extension)) => ASSET_EXTENSIONS.contains(&extension),
        None => false,
    }
}

/// Outcome of one guarded navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub route: Route,
    pub decision: Decision,
    /// Set when the refresh step rotated the session token. The caller
    /// should forward it to wherever the token is kept.
    pub refreshed: Option<Session>,
}

pub struct RouteGuard<'g, G: Gateway + ?Sized> {
    gateway: &'g G,
}

impl<'g, G: Gateway + ?Sized> RouteGuard<'g, G> {
    pub fn new(gateway: &'g G) -> Self {
        RouteGuard { gateway }
    }

    pub fn check(&self, path: &str) -> Verdict {
        let route = Route::parse(path);
        if is_static_asset(path) {
            return Verdict {
                route,
                decision: Decision::Allow,
                refreshed: None,
            };
        }

        let refreshed = self.gateway.refresh_session().unwrap_or_else(|err| {
            warn!(%err, "session refresh failed");
            None
        });

        let session_present = match self.gateway.current_user() {
            Ok(user) => user.is_some(),
            Err(err) => {
                warn!(%err, "session lookup failed, treating as signed out");
                false
            }
        };

        let decision = decide(&route, session_present);
        debug!(path, ?decision, "route guard");
        Verdict {
            route,
            decision,
            refreshed,
        }
    }
}
