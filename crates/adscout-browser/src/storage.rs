//! Browser cookie state persisted between runs as JSON.
//!
//! ```json
//! { "cookies": [ { "name": "c_user", "value": "…", "domain": ".facebook.com",
//!                  "path": "/", "expires": 1767225600.0, "httpOnly": true, "secure": true } ] }
//! ```

use std::path::Path;

use chromiumoxide::cdp::browser_protocol::network::{Cookie, CookieParam, TimeSinceEpoch};
use serde::{Deserialize, Serialize};

use crate::error::BrowserError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageState {
    #[serde(default)]
    pub cookies: Vec<StoredCookie>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    pub name: String,
    #[serde(default)]
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Seconds since the epoch; absent or negative for session cookies.
    #[serde(default)]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
}

fn default_path() -> String {
    "/".to_owned()
}

impl StoredCookie {
    /// Converts to a CDP cookie parameter; `None` for unusable entries.
    #[must_use]
    pub fn to_param(&self) -> Option<CookieParam> {
        if self.name.is_empty() || self.domain.is_empty() {
            return None;
        }
        let mut builder = CookieParam::builder()
            .name(self.name.clone())
            .value(self.value.clone())
            .domain(self.domain.clone())
            .path(self.path.clone())
            .http_only(self.http_only)
            .secure(self.secure);
        if let Some(expires) = self.expires.filter(|e| *e > 0.0) {
            builder = builder.expires(TimeSinceEpoch::new(expires));
        }
        match builder.build() {
            Ok(param) => Some(param),
            Err(reason) => {
                tracing::warn!(cookie = %self.name, %reason, "skipping unusable stored cookie");
                None
            }
        }
    }
}

impl From<&Cookie> for StoredCookie {
    fn from(cookie: &Cookie) -> Self {
        Self {
            name: cookie.name.clone(),
            value: cookie.value.clone(),
            domain: cookie.domain.clone(),
            path: cookie.path.clone(),
            expires: Some(cookie.expires).filter(|e| *e > 0.0),
            http_only: cookie.http_only,
            secure: cookie.secure,
        }
    }
}

impl StorageState {
    /// Reads the state file. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::StorageIo`] if the file exists but cannot be
    /// read and [`BrowserError::StorageJson`] if it is not valid state JSON.
    pub fn load(path: &Path) -> Result<Option<Self>, BrowserError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|source| BrowserError::StorageIo {
            path: path.to_path_buf(),
            source,
        })?;
        let state = serde_json::from_str(&content).map_err(|source| BrowserError::StorageJson {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(state))
    }

    /// Writes the state file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::StorageIo`] on any filesystem failure.
    pub fn save(&self, path: &Path) -> Result<(), BrowserError> {
        let io_err = |source| BrowserError::StorageIo {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| BrowserError::StorageJson {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_err)
    }

    /// Cookie parameters ready to be installed in a fresh browser.
    #[must_use]
    pub fn cookie_params(&self) -> Vec<CookieParam> {
        self.cookies.iter().filter_map(StoredCookie::to_param).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_cookie_entries() {
        let state: StorageState = serde_json::from_str(
            r#"{ "cookies": [
                { "name": "datr", "value": "abc", "domain": ".facebook.com" },
                { "name": "c_user", "value": "1", "domain": ".facebook.com",
                  "path": "/", "expires": 1767225600.0, "httpOnly": true, "secure": true }
            ] }"#,
        )
        .unwrap();
        assert_eq!(state.cookies.len(), 2);
        assert_eq!(state.cookies[0].path, "/");
        assert!(!state.cookies[0].http_only);
        assert!(state.cookies[1].http_only);
        assert_eq!(state.cookie_params().len(), 2);
    }

    #[test]
    fn nameless_cookies_are_skipped() {
        let cookie = StoredCookie {
            name: String::new(),
            value: "x".into(),
            domain: ".facebook.com".into(),
            path: "/".into(),
            expires: None,
            http_only: false,
            secure: false,
        };
        assert!(cookie.to_param().is_none());
    }

    #[test]
    fn missing_file_loads_as_none() {
        let path = std::env::temp_dir().join("adscout-no-such-state-file.json");
        assert!(StorageState::load(&path).unwrap().is_none());
    }

    #[test]
    fn save_then_load_keeps_cookies() {
        let dir = std::env::temp_dir().join(format!("adscout-state-{}", std::process::id()));
        let path = dir.join("nested").join("state.json");
        let state = StorageState {
            cookies: vec![StoredCookie {
                name: "locale".into(),
                value: "nl_NL".into(),
                domain: ".facebook.com".into(),
                path: "/".into(),
                expires: None,
                http_only: false,
                secure: true,
            }],
        };
        state.save(&path).unwrap();
        assert_eq!(StorageState::load(&path).unwrap(), Some(state));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
