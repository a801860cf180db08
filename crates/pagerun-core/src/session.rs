//! Ephemeral browser session lifecycle.
//!
//! Each request gets a freshly launched Chromium process with a single page;
//! nothing is pooled or reused, so an untrusted payload can never observe
//! state left behind by an earlier one. The price is full launch latency per
//! request, paid deliberately.

use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig, HeadlessMode};
use chromiumoxide::Page;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::errors::CoreError;

/// One browser-process-and-page instance, exclusively owned by a single
/// request for its whole lifetime.
pub struct Session {
    id: Uuid,
    browser: Browser,
    page: Page,
    event_task: JoinHandle<()>,
    created_at: DateTime<Utc>,
    timeout: Duration,
}

impl Session {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Launches and tears down [`Session`]s.
///
/// `release` consumes the session, so a handle can never be used after
/// teardown; the borrow checker enforces the "never referenced after release"
/// rule for free.
#[derive(Debug, Clone)]
pub struct SessionManager {
    timeout: Duration,
}

impl SessionManager {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Launch a fresh headless browser and open its single page.
    ///
    /// The configured timeout bounds the process launch, default navigation
    /// waits and default per-operation CDP waits. If page creation fails after
    /// the process came up, the partially acquired browser is torn down before
    /// the launch error is returned.
    pub async fn acquire(&self) -> Result<Session, CoreError> {
        let id = Uuid::new_v4();
        log::debug!("session {}: launching browser", id);

        let config = BrowserConfig::builder()
            .headless_mode(HeadlessMode::New)
            .no_sandbox()
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .launch_timeout(self.timeout)
            .request_timeout(self.timeout)
            .build()
            .map_err(|e| CoreError::Launch(e.to_string()))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CoreError::Launch(e.to_string()))?;

        // The CDP handler stream must be polled for the connection to make
        // progress; the task lives exactly as long as the session.
        let event_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                log::trace!("browser event: {:?}", event);
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                log::warn!("session {}: page creation failed: {}", id, e);
                teardown(browser, event_task).await;
                return Err(CoreError::Launch(format!("page creation failed: {}", e)));
            }
        };

        log::debug!("session {}: ready", id);
        Ok(Session {
            id,
            browser,
            page,
            event_task,
            created_at: Utc::now(),
            timeout: self.timeout,
        })
    }

    /// Tear the session down, terminating the browser process.
    ///
    /// Never fails: secondary teardown errors are logged and swallowed so the
    /// primary error of the request, if any, is the one surfaced to the
    /// caller.
    pub async fn release(&self, session: Session) {
        let id = session.id;
        log::debug!("session {}: releasing", id);
        teardown(session.browser, session.event_task).await;
        log::debug!("session {}: released", id);
    }
}

async fn teardown(mut browser: Browser, event_task: JoinHandle<()>) {
    event_task.abort();
    if let Err(e) = browser.close().await {
        log::warn!("browser close failed: {}", e);
    }
    // Backstop for a wedged or already-dead process; errors here carry no
    // information worth surfacing.
    if let Some(Err(e)) = browser.kill().await {
        log::debug!("browser kill failed: {}", e);
    }
}
