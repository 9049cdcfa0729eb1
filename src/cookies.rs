use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::gateway::{Gateway, SessionEvent};
use crate::listeners::Subscription;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Cookie {
    access_token: Option<String>,
}

/// Keeps the session token between runs, the way a browser keeps its
/// auth cookie.
#[derive(Debug, Clone)]
pub struct CookieJar {
    path: PathBuf,
}

impl CookieJar {
    pub fn new(path: PathBuf) -> Self {
        CookieJar { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session from {}.", self.path.display()))?;
        let cookie: Cookie = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse session file {}.", self.path.display()))?;
        Ok(cookie.access_token)
    }

    pub fn store(&self, access_token: Option<&str>) -> Result<()> {
        let cookie = Cookie {
            access_token: access_token.map(str::to_string),
        };
        fs::write(&self.path, serde_json::to_string(&cookie)?)
            .with_context(|| format!("Failed to write session to {}.", self.path.display()))?;
        Ok(())
    }

    /// Write every token change the gateway announces.
    pub fn attach<G: Gateway + ?Sized>(&self, gateway: &G) -> Subscription {
        let jar = self.clone();
        gateway.on_session_change(Box::new(move |event: &SessionEvent| {
            let token = match event {
                SessionEvent::SignedIn(session) | SessionEvent::TokenRefreshed(session) => {
                    Some(session.access_token.as_str())
                }
                SessionEvent::SignedOut => None,
            };
            match jar.store(token) {
                Ok(()) => debug!(signed_in = token.is_some(), "session cookie written"),
                Err(err) => error!(%err, "failed to persist session cookie"),
            }
        }))
    }
}
