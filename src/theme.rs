use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Light
    }
}

impl Theme {
    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(anyhow!("Unknown theme '{}', expected light or dark.", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Persisted {
    state: PersistedState,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedState {
    theme: Theme,
}

/// The persisted light/dark preference.
#[derive(Debug)]
pub struct ThemeStore {
    path: PathBuf,
    theme: Theme,
}

impl ThemeStore {
    /// Load the preference stored at `path`. A missing or unreadable file
    /// means light.
    pub fn load(path: PathBuf) -> Self {
        let theme = match fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str::<Persisted>(&data) {
                Ok(persisted) => persisted.state.theme,
                Err(err) => {
                    warn!(%err, path = %path.display(), "ignoring corrupt theme file");
                    Theme::default()
                }
            },
            Err(_) => Theme::default(),
        };
        ThemeStore { path, theme }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set(&mut self, theme: Theme) -> Result<()> {
        let persisted = Persisted {
            state: PersistedState { theme },
        };
        fs::write(&self.path, serde_json::to_string(&persisted)?)
            .with_context(|| format!("Failed to save theme to {}.", self.path.display()))?;
        self.theme = theme;
        Ok(())
    }

    pub fn toggle(&mut self) -> Result<Theme> {
        let theme = self.theme.toggled();
        self.set(theme)?;
        Ok(theme)
    }
}
