//! Chrome sessions over the DevTools protocol.
//!
//! [`ChromeBrowser::run`] owns the browser lifetime: it launches Chrome,
//! hands the running browser to the caller's body and then always saves the
//! cookie state and closes the browser, whether the body succeeded or not.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use adscout_core::AppConfig;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetLocaleOverrideParams, SetTimezoneOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType,
};
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, SetBlockedUrLsParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::FrameId;
use chromiumoxide::cdp::js_protocol::runtime::{EvaluateParams, ExecutionContextId};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::BrowserError;
use crate::session::{FrameRef, PageSession};
use crate::storage::{StorageState, StoredCookie};

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/google/chrome/google-chrome",
];

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_TIMEZONE: &str = "Europe/Brussels";
pub const VIEWPORT_WIDTH: u32 = 1366;
pub const VIEWPORT_HEIGHT: u32 = 900;

/// URL patterns for heavy assets that extraction never needs.
const HEAVY_ASSET_PATTERNS: &[&str] = &[
    "*.png*", "*.jpg*", "*.jpeg*", "*.gif*", "*.webp*", "*.svg*", "*.ico*", "*.mp4*", "*.webm*",
    "*.m4a*", "*.mp3*", "*.m3u8*", "*.woff*", "*.woff2*", "*.ttf*", "*.otf*",
];
const STYLESHEET_PATTERNS: &[&str] = &["*.css*"];

/// How the browser is launched and how every page is set up.
#[derive(Debug, Clone)]
pub struct ChromeSettings {
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    /// BCP 47 locale, e.g. `nl-NL`.
    pub locale: String,
    pub timezone: String,
    pub block_stylesheets: bool,
    /// Cookie state restored at launch and written back at shutdown.
    pub storage_state_path: Option<PathBuf>,
    pub request_timeout: Duration,
}

impl ChromeSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig, headless: bool) -> Self {
        Self {
            chrome_path: config.chrome_path.clone(),
            headless,
            locale: config.force_locale.clone(),
            timezone: DEFAULT_TIMEZONE.to_owned(),
            block_stylesheets: config.block_stylesheets,
            storage_state_path: Some(config.storage_state_path.clone()),
            request_timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
        }
    }

    /// Locale in cookie form, e.g. `nl_NL`.
    #[must_use]
    pub fn cookie_locale(&self) -> String {
        self.locale.replace('-', "_")
    }

    /// `Accept-Language` value preferring the forced locale.
    #[must_use]
    pub fn accept_language(&self) -> String {
        let language = self.locale.split('-').next().unwrap_or("nl");
        format!("{},{language};q=0.9,en;q=0.8", self.locale)
    }

    #[must_use]
    pub fn blocked_url_patterns(&self) -> Vec<String> {
        let mut patterns: Vec<String> = HEAVY_ASSET_PATTERNS.iter().map(|p| (*p).to_owned()).collect();
        if self.block_stylesheets {
            patterns.extend(STYLESHEET_PATTERNS.iter().map(|p| (*p).to_owned()));
        }
        patterns
    }

    fn launch_args(&self) -> Vec<String> {
        vec![
            "--disable-blink-features=AutomationControlled".to_owned(),
            "--disable-dev-shm-usage".to_owned(),
            "--no-sandbox".to_owned(),
            "--no-first-run".to_owned(),
            "--no-default-browser-check".to_owned(),
            "--disable-background-timer-throttling".to_owned(),
            "--disable-renderer-backgrounding".to_owned(),
            "--disable-backgrounding-occluded-windows".to_owned(),
            format!("--lang={}", self.locale),
        ]
    }
}

/// Finds a Chrome executable: the configured path, then well-known
/// locations, then `PATH`.
///
/// # Errors
///
/// Returns [`BrowserError::ChromeNotFound`] when nothing usable exists.
pub fn find_chrome(configured: Option<&Path>) -> Result<PathBuf, BrowserError> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        tracing::warn!(path = %path.display(), "configured Chrome path does not exist");
    }

    for path in CHROME_PATHS {
        let p = Path::new(path);
        if p.exists() {
            tracing::debug!(path, "found Chrome");
            return Ok(p.to_path_buf());
        }
    }

    for cmd in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_owned();
                if !path.is_empty() {
                    tracing::debug!(%path, "found Chrome in PATH");
                    return Ok(PathBuf::from(path));
                }
            }
        }
    }

    Err(BrowserError::ChromeNotFound)
}

/// A launched Chrome process plus the cookies every new page starts with.
pub struct ChromeBrowser {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    settings: ChromeSettings,
    seed_cookies: Vec<CookieParam>,
}

impl ChromeBrowser {
    /// Launches Chrome and loads the saved cookie state, if any.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::ChromeNotFound`] or [`BrowserError::Launch`].
    pub async fn launch(settings: ChromeSettings) -> Result<Self, BrowserError> {
        let chrome_path = find_chrome(settings.chrome_path.as_deref())?;
        tracing::info!(
            chrome = %chrome_path.display(),
            headless = settings.headless,
            locale = %settings.locale,
            "launching browser"
        );

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .request_timeout(settings.request_timeout)
            .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .viewport(Viewport {
                width: VIEWPORT_WIDTH,
                height: VIEWPORT_HEIGHT,
                ..Viewport::default()
            });
        if !settings.headless {
            builder = builder.with_head();
        }
        for arg in settings.launch_args() {
            builder = builder.arg(arg);
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let seed_cookies = Self::seed_cookies(&settings)?;

        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            settings,
            seed_cookies,
        })
    }

    /// Restored state cookies plus the forced `locale` cookie.
    fn seed_cookies(settings: &ChromeSettings) -> Result<Vec<CookieParam>, BrowserError> {
        let mut cookies = match settings.storage_state_path.as_deref() {
            Some(path) => match StorageState::load(path) {
                Ok(Some(state)) => {
                    tracing::info!(path = %path.display(), count = state.cookies.len(), "restored browser cookies");
                    state.cookie_params()
                }
                Ok(None) => Vec::new(),
                Err(err) => {
                    tracing::warn!(error = %err, "ignoring unreadable browser state");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let locale = CookieParam::builder()
            .name("locale")
            .value(settings.cookie_locale())
            .domain(".facebook.com")
            .path("/")
            .secure(true)
            .http_only(false)
            .build()
            .map_err(|reason| BrowserError::Params {
                command: "Network.setCookies",
                reason,
            })?;
        cookies.push(locale);
        Ok(cookies)
    }

    #[must_use]
    pub fn settings(&self) -> &ChromeSettings {
        &self.settings
    }

    /// Opens a new tab with the locale, timezone, user agent, asset blocking
    /// and cookies applied.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] if the tab cannot be created or configured.
    pub async fn new_session(&self) -> Result<ChromePage, BrowserError> {
        let page = self.browser.lock().await.new_page("about:blank").await?;

        let user_agent = SetUserAgentOverrideParams::builder()
            .user_agent(USER_AGENT)
            .accept_language(self.settings.accept_language())
            .build()
            .map_err(|reason| BrowserError::Params {
                command: "Network.setUserAgentOverride",
                reason,
            })?;
        page.execute(user_agent).await?;
        page.execute(SetTimezoneOverrideParams::new(self.settings.timezone.clone()))
            .await?;
        page.execute(SetLocaleOverrideParams {
            locale: Some(self.settings.locale.clone()),
        })
        .await?;
        page.execute(SetBlockedUrLsParams::new(self.settings.blocked_url_patterns()))
            .await?;
        if !self.seed_cookies.is_empty() {
            page.set_cookies(self.seed_cookies.clone()).await?;
        }

        Ok(ChromePage { page })
    }

    /// Writes every browser cookie to the configured state file.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] if cookies cannot be read or the file written.
    pub async fn save_state(&self) -> Result<usize, BrowserError> {
        let Some(path) = self.settings.storage_state_path.as_deref() else {
            return Ok(0);
        };
        let cookies = self.browser.lock().await.get_cookies().await?;
        let state = StorageState {
            cookies: cookies.iter().map(StoredCookie::from).collect(),
        };
        state.save(path)?;
        Ok(state.cookies.len())
    }

    /// Saves state and closes the browser. Failures are logged, not returned.
    pub async fn shutdown(&self) {
        match self.save_state().await {
            Ok(count) => tracing::debug!(count, "saved browser cookies"),
            Err(err) => tracing::warn!(error = %err, "failed to save browser state"),
        }
        let mut browser = self.browser.lock().await;
        if let Err(err) = browser.close().await {
            tracing::warn!(error = %err, "failed to close browser cleanly");
        }
        if let Err(err) = browser.wait().await {
            tracing::debug!(error = %err, "browser process wait failed");
        }
        self.handler.abort();
    }

    /// Launches Chrome, runs `body` with it and shuts the browser down on
    /// every exit path of `body`.
    ///
    /// # Errors
    ///
    /// Returns the launch error converted into `E`, or whatever `body`
    /// returns.
    pub async fn run<T, E, F, Fut>(settings: ChromeSettings, body: F) -> Result<T, E>
    where
        F: FnOnce(Arc<ChromeBrowser>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<BrowserError>,
    {
        let browser = Arc::new(Self::launch(settings).await?);
        let result = body(Arc::clone(&browser)).await;
        browser.shutdown().await;
        result
    }
}

/// `Runtime.evaluate` parameters pinned to `frame`'s execution context.
///
/// Without a context id the script would silently run in the main frame, so a
/// frame whose context is unknown (not ready yet, or out of process) is an
/// error instead.
fn frame_eval_params(
    frame: &FrameRef,
    context: Option<ExecutionContextId>,
    script: &str,
) -> Result<EvaluateParams, BrowserError> {
    let context = context.ok_or_else(|| {
        BrowserError::Script(format!("no execution context for frame {}", frame.as_str()))
    })?;
    EvaluateParams::builder()
        .expression(script)
        .context_id(context)
        .await_promise(true)
        .return_by_value(true)
        .build()
        .map_err(|reason| BrowserError::Params {
            command: "Runtime.evaluate",
            reason,
        })
}

/// One configured Chrome tab.
#[derive(Clone)]
pub struct ChromePage {
    page: Page,
}

#[async_trait]
impl PageSession for ChromePage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(BrowserError::Navigation {
                url: url.to_owned(),
                reason: err.to_string(),
            }),
            Err(_) => Err(BrowserError::Timeout {
                step: "navigation",
                after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    async fn current_url(&self) -> Option<String> {
        self.page.url().await.ok().flatten()
    }

    async fn frames(&self) -> Result<Vec<FrameRef>, BrowserError> {
        let main = self.page.mainframe().await?;
        let mut frames: Vec<FrameRef> = main
            .iter()
            .map(|id| FrameRef(id.inner().clone()))
            .collect();
        for id in self.page.frames().await? {
            if main.as_ref() != Some(&id) {
                frames.push(FrameRef(id.inner().clone()));
            }
        }
        Ok(frames)
    }

    async fn evaluate_in(
        &self,
        frame: &FrameRef,
        script: &str,
    ) -> Result<serde_json::Value, BrowserError> {
        let context = self
            .page
            .frame_execution_context(FrameId::new(frame.as_str()))
            .await?;
        let params = frame_eval_params(frame, context, script)?;
        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn press_escape(&self) -> Result<(), BrowserError> {
        for kind in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
            let params = DispatchKeyEventParams::builder()
                .r#type(kind)
                .key("Escape")
                .code("Escape")
                .windows_virtual_key_code(27)
                .build()
                .map_err(|reason| BrowserError::Params {
                    command: "Input.dispatchKeyEvent",
                    reason,
                })?;
            self.page.execute(params).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ChromeSettings {
        ChromeSettings {
            chrome_path: None,
            headless: true,
            locale: "nl-NL".to_owned(),
            timezone: DEFAULT_TIMEZONE.to_owned(),
            block_stylesheets: true,
            storage_state_path: None,
            request_timeout: Duration::from_secs(25),
        }
    }

    #[test]
    fn frame_without_context_is_an_error() {
        let frame = FrameRef("F1A2".to_owned());
        let err = frame_eval_params(&frame, None, "1 + 1").unwrap_err();
        assert!(matches!(err, BrowserError::Script(ref msg) if msg.contains("F1A2")));
    }

    #[test]
    fn eval_params_target_the_frame_context() {
        let frame = FrameRef("F1A2".to_owned());
        let params =
            frame_eval_params(&frame, Some(ExecutionContextId::new(7)), "1 + 1").unwrap();
        assert_eq!(params.context_id, Some(ExecutionContextId::new(7)));
        assert_eq!(params.expression, "1 + 1");
        assert_eq!(params.return_by_value, Some(true));
    }

    #[test]
    fn accept_language_prefers_forced_locale() {
        assert_eq!(settings().accept_language(), "nl-NL,nl;q=0.9,en;q=0.8");
        assert_eq!(settings().cookie_locale(), "nl_NL");
    }

    #[test]
    fn stylesheets_blocked_only_when_enabled() {
        let mut s = settings();
        assert!(s.blocked_url_patterns().iter().any(|p| p == "*.css*"));
        s.block_stylesheets = false;
        let patterns = s.blocked_url_patterns();
        assert!(!patterns.iter().any(|p| p == "*.css*"));
        assert!(patterns.iter().any(|p| p == "*.woff2*"));
    }

    #[test]
    fn launch_args_carry_locale() {
        assert!(settings().launch_args().contains(&"--lang=nl-NL".to_owned()));
    }

    #[test]
    fn locale_cookie_is_always_seeded() {
        let cookies = ChromeBrowser::seed_cookies(&settings()).unwrap();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "locale");
        assert_eq!(cookies[0].value, "nl_NL");
        assert_eq!(cookies[0].domain.as_deref(), Some(".facebook.com"));
    }

    #[test]
    fn configured_chrome_path_wins() {
        let exe = std::env::current_exe().unwrap();
        assert_eq!(find_chrome(Some(&exe)).unwrap(), exe);
    }
}
