// src/browser.rs
//! Browser session lifecycle and the element locator surface.
//!
//! A `Session` owns the chromedriver child process and the WebDriver
//! connection built on top of it. Opening a session validates both binary
//! paths and their minimum versions, launches headless Chrome, and
//! navigates to the target URL. The auth and workflow state machines are
//! written against the small `Browse` trait rather than the driver itself,
//! so they can be exercised with scripted pages in tests.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use thirtyfour::error::WebDriverError;
use thirtyfour::{
    By, ChromeCapabilities, ChromiumLikeCapabilities, DesiredCapabilities, Key, WebDriver,
};

use crate::config::{RunConfig, CHROME_MINVER, DRIVER_MINVER};

/// Whitespace-token index of the version in `chrome --version` output
/// ("Google Chrome 73.0.3683.86").
const CHROME_VERSION_INDEX: usize = 2;
/// Token index for `chromedriver --version` ("ChromeDriver 2.46.628388 (...)").
const DRIVER_VERSION_INDEX: usize = 1;

const CONNECT_ATTEMPTS: u32 = 20;
const CONNECT_BACKOFF: Duration = Duration::from_millis(250);

/// How a page element is looked up. Expressions are only meaningful against
/// the current page and must be re-evaluated after every navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    XPath(&'static str),
    Name(&'static str),
    Id(&'static str),
}

impl Locator {
    fn by(&self) -> By {
        match self {
            Locator::XPath(expr) => By::XPath(*expr),
            Locator::Name(name) => By::Name(*name),
            Locator::Id(id) => By::Id(*id),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::XPath(expr) => write!(f, "xpath '{expr}'"),
            Locator::Name(name) => write!(f, "name '{name}'"),
            Locator::Id(id) => write!(f, "id '{id}'"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no binary found at {0}")]
    BinaryNotFound(PathBuf),

    #[error("{binary} is too old: found '{found}', need at least '{minimum}'")]
    VersionTooOld {
        binary: String,
        found: String,
        minimum: String,
    },

    #[error("failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("browser session already closed")]
    Closed,

    #[error("webdriver error: {0}")]
    Driver(#[from] WebDriverError),
}

/// The locator surface the authentication and workflow state machines are
/// written against. Absence of an element is a value (`None` / `false`),
/// never an error; a `SessionError` from these methods means the driver
/// itself failed.
#[async_trait]
pub trait Browse {
    async fn navigate(&self, url: &str) -> Result<(), SessionError>;
    async fn current_url(&self) -> Result<String, SessionError>;
    /// Whether an element matching the locator exists on the current page.
    async fn exists(&self, locator: &Locator) -> Result<bool, SessionError>;
    /// Read the text of the first element matching the locator.
    async fn try_read(&self, locator: &Locator) -> Result<Option<String>, SessionError>;
    /// Click the first element matching the locator.
    async fn try_activate(&self, locator: &Locator) -> Result<bool, SessionError>;
    /// Clear the first matching input and send `text` to it as key input.
    async fn try_fill(&self, locator: &Locator, text: &str) -> Result<bool, SessionError>;
    /// Send RETURN to the first element matching the locator.
    async fn try_submit(&self, locator: &Locator) -> Result<bool, SessionError>;
    /// Collect the href attribute of every element matching the locator.
    async fn collect_links(&self, locator: &Locator) -> Result<Vec<String>, SessionError>;
    /// Switch the driver context into a nested frame.
    async fn enter_frame(&self, locator: &Locator) -> Result<bool, SessionError>;
}

/// Extract the whitespace-separated version token at `index` from a
/// `--version` output line.
fn version_token(output: &str, index: usize) -> Option<&str> {
    output.split_whitespace().nth(index)
}

/// Plain lexicographic comparison on the raw token, exactly as configured.
/// This is not a semantic-version comparison; the minimums in `config` are
/// chosen with that in mind.
fn meets_minimum(token: &str, minimum: &str) -> bool {
    token >= minimum
}

fn check_version(path: &Path, minimum: &str, token_index: usize) -> Result<(), SessionError> {
    if !path.is_file() {
        return Err(SessionError::BinaryNotFound(path.to_path_buf()));
    }

    let output = Command::new(path).arg("--version").output().map_err(|e| {
        SessionError::LaunchFailed(format!("could not run '{} --version': {e}", path.display()))
    })?;
    let text = String::from_utf8_lossy(&output.stdout);
    debug!("Version output for {}: {}", path.display(), text.trim());

    let token = version_token(&text, token_index).unwrap_or_default();
    if meets_minimum(token, minimum) {
        Ok(())
    } else {
        Err(SessionError::VersionTooOld {
            binary: path.display().to_string(),
            found: token.to_string(),
            minimum: minimum.to_string(),
        })
    }
}

/// Map "no such element/frame" to `None`; propagate everything else.
fn absent<T>(result: Result<T, WebDriverError>) -> Result<Option<T>, SessionError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(WebDriverError::NoSuchElement(_)) | Err(WebDriverError::NoSuchFrame(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// One headless browser bound to one chromedriver process. The handle is
/// released exactly once, by `close()` on the normal paths and by `Drop`
/// as a backstop when a failure unwinds past it. The backstop only reaps
/// the chromedriver process; the Chrome child it spawned may outlive a
/// hard kill, so `close()` remains the real teardown path.
pub struct Session {
    driver: Option<WebDriver>,
    driver_proc: Option<Child>,
}

impl Session {
    /// Validate both binaries, launch chromedriver and headless Chrome,
    /// and navigate to the configured target URL.
    pub async fn open(config: &RunConfig) -> Result<Self, SessionError> {
        check_version(&config.chrome_path, CHROME_MINVER, CHROME_VERSION_INDEX)?;
        check_version(&config.driver_path, DRIVER_MINVER, DRIVER_VERSION_INDEX)?;

        debug!(
            "Launching chromedriver from {} on port {}",
            config.driver_path.display(),
            config.driver_port
        );
        let mut proc = Command::new(&config.driver_path)
            .arg(format!("--port={}", config.driver_port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SessionError::LaunchFailed(format!("chromedriver: {e}")))?;

        let caps = match headless_caps(&config.chrome_path) {
            Ok(caps) => caps,
            Err(e) => {
                let _ = proc.kill();
                let _ = proc.wait();
                return Err(e);
            }
        };

        let endpoint = format!("http://localhost:{}", config.driver_port);
        let driver = match connect(&endpoint, caps).await {
            Ok(driver) => driver,
            Err(e) => {
                let _ = proc.kill();
                let _ = proc.wait();
                return Err(e);
            }
        };

        let mut session = Session {
            driver: Some(driver),
            driver_proc: Some(proc),
        };

        if let Err(e) = Session::navigate(&session, &config.target_url).await {
            session.close().await;
            return Err(e);
        }
        Ok(session)
    }

    fn driver(&self) -> Result<&WebDriver, SessionError> {
        self.driver.as_ref().ok_or(SessionError::Closed)
    }

    pub async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        debug!("Navigating to '{url}'");
        self.driver()?.goto(url).await?;
        Ok(())
    }

    pub async fn current_url(&self) -> Result<String, SessionError> {
        Ok(self.driver()?.current_url().await?.to_string())
    }

    /// Quit the browser and reap the chromedriver process. Safe to call
    /// more than once and after any failure.
    pub async fn close(&mut self) {
        if let Some(driver) = self.driver.take() {
            debug!("Quitting webdriver session...");
            if let Err(e) = driver.quit().await {
                warn!("Webdriver session did not quit cleanly: {e}");
            }
        }
        if let Some(mut proc) = self.driver_proc.take() {
            let _ = proc.kill();
            let _ = proc.wait();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // The webdriver session cannot be quit from a sync drop, but the
        // chromedriver process can still be reaped.
        if let Some(mut proc) = self.driver_proc.take() {
            let _ = proc.kill();
            let _ = proc.wait();
        }
    }
}

fn headless_caps(chrome_path: &Path) -> Result<ChromeCapabilities, SessionError> {
    let mut caps = DesiredCapabilities::chrome();
    caps.set_headless()?;
    caps.set_binary(&chrome_path.to_string_lossy())?;
    Ok(caps)
}

/// chromedriver takes a moment to bind its port after spawn.
async fn connect(endpoint: &str, caps: ChromeCapabilities) -> Result<WebDriver, SessionError> {
    let mut last_err = None;
    for _ in 0..CONNECT_ATTEMPTS {
        match WebDriver::new(endpoint, caps.clone()).await {
            Ok(driver) => return Ok(driver),
            Err(e) => {
                last_err = Some(e);
                tokio::time::sleep(CONNECT_BACKOFF).await;
            }
        }
    }
    Err(SessionError::LaunchFailed(format!(
        "could not reach chromedriver at {endpoint}: {}",
        last_err.map(|e| e.to_string()).unwrap_or_default()
    )))
}

#[async_trait]
impl Browse for Session {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        Session::navigate(self, url).await
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        Session::current_url(self).await
    }

    async fn exists(&self, locator: &Locator) -> Result<bool, SessionError> {
        debug!("exists? {locator}");
        Ok(absent(self.driver()?.find(locator.by()).await)?.is_some())
    }

    async fn try_read(&self, locator: &Locator) -> Result<Option<String>, SessionError> {
        debug!("try_read {locator}");
        match absent(self.driver()?.find(locator.by()).await)? {
            Some(elem) => Ok(Some(elem.text().await?)),
            None => Ok(None),
        }
    }

    async fn try_activate(&self, locator: &Locator) -> Result<bool, SessionError> {
        debug!("try_activate {locator}");
        match absent(self.driver()?.find(locator.by()).await)? {
            Some(elem) => {
                elem.click().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn try_fill(&self, locator: &Locator, text: &str) -> Result<bool, SessionError> {
        debug!("try_fill {locator}");
        match absent(self.driver()?.find(locator.by()).await)? {
            Some(elem) => {
                elem.clear().await?;
                elem.send_keys(text).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn try_submit(&self, locator: &Locator) -> Result<bool, SessionError> {
        debug!("try_submit {locator}");
        match absent(self.driver()?.find(locator.by()).await)? {
            Some(elem) => {
                elem.send_keys(Key::Enter + "").await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn collect_links(&self, locator: &Locator) -> Result<Vec<String>, SessionError> {
        debug!("collect_links {locator}");
        let mut links = Vec::new();
        for elem in self.driver()?.find_all(locator.by()).await? {
            if let Some(href) = elem.attr("href").await? {
                links.push(href);
            }
        }
        Ok(links)
    }

    async fn enter_frame(&self, locator: &Locator) -> Result<bool, SessionError> {
        debug!("enter_frame {locator}");
        match absent(self.driver()?.find(locator.by()).await)? {
            Some(frame) => {
                frame.enter_frame().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
