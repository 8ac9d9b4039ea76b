// src/auth.rs
//! CAS + Duo authentication handshake.
//!
//! States: Start → AtIdentityProvider → CredentialsSubmitted →
//! {SecondFactorPending | Done} → {Authenticated | Failed(reason)}.
//! Every locate failure is converted into a named error at its step
//! boundary, so callers branch on the outcome without inspecting locator
//! internals. The Duo push is approved out-of-band; the only success
//! signal is the eventual redirect back to the target URL, observed by a
//! bounded poll.

use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::browser::{Browse, Locator, SessionError};
use crate::config::RunConfig;

pub const USERNAME_FIELD: Locator = Locator::Id("username");
pub const PASSWORD_FIELD: Locator = Locator::Id("password");
pub const DUO_FRAME: Locator = Locator::Id("duo_iframe");
pub const DUO_DEFAULT_METHOD: Locator =
    Locator::XPath("//*[@id=\"auth_methods\"]/fieldset[1]/div[1]/button");

/// NetID and password for the identity provider. Neither is persisted;
/// the password only ever reaches logs in masked form.
pub struct Credentials {
    pub netid: String,
    pub password: String,
}

impl Credentials {
    /// First and last character retained, everything else starred.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.password.chars().collect();
        match chars.len() {
            0 => String::new(),
            n if n <= 2 => "*".repeat(n),
            n => format!("{}{}{}", chars[0], "*".repeat(n - 2), chars[n - 1]),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("netid", &self.netid)
            .field("password", &self.masked())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Credentials (and Duo, when expected) were accepted.
    Authenticated,
    /// The identity provider never engaged; the target was reachable
    /// without a login form. Not an error.
    NotChallenged,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("could not locate the username or password field on the login form")]
    CredentialFieldMissing,

    #[error("could not locate the Duo frame or its default method button")]
    SecondFactorUnavailable,

    #[error(
        "no redirect to the target within {}s; the Duo push may not have been \
         approved, or the credentials were rejected",
        .wait.as_secs()
    )]
    SecondFactorTimeout { wait: Duration },

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Drives the login handshake against a live session or a scripted page.
pub struct Authenticator {
    auth_url: String,
    target_url: String,
    duo_timeout: Duration,
    poll_interval: Duration,
    expect_duo: bool,
}

impl Authenticator {
    pub fn new(auth_url: impl Into<String>, target_url: impl Into<String>) -> Self {
        Self {
            auth_url: auth_url.into(),
            target_url: target_url.into(),
            duo_timeout: Duration::from_secs(15),
            poll_interval: Duration::from_millis(500),
            expect_duo: true,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.auth_url.as_str(), config.target_url.as_str())
            .duo_timeout(config.duo_timeout)
            .poll_interval(config.poll_interval)
            .expect_duo(config.expect_duo)
    }

    pub fn duo_timeout(mut self, timeout: Duration) -> Self {
        self.duo_timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Whether a Duo challenge is expected after credential submission.
    /// When false, the flow reports success right after submitting.
    pub fn expect_duo(mut self, expect: bool) -> Self {
        self.expect_duo = expect;
        self
    }

    pub async fn login(
        &self,
        page: &dyn Browse,
        creds: &Credentials,
    ) -> Result<AuthOutcome, AuthError> {
        let current = page.current_url().await?;
        if !current.contains(self.auth_url.as_str()) {
            info!("No auth redirection detected (current URL: {current}); nothing to log in to");
            return Ok(AuthOutcome::NotChallenged);
        }
        debug!("Auth redirection detected; current URL: {current}");

        info!("Authenticating using NetID: {}", creds.netid);
        info!("Authenticating using password: {}", creds.masked());

        if !page.try_fill(&USERNAME_FIELD, &creds.netid).await? {
            return Err(AuthError::CredentialFieldMissing);
        }
        if !page.try_fill(&PASSWORD_FIELD, &creds.password).await? {
            return Err(AuthError::CredentialFieldMissing);
        }
        // RETURN on the password field submits the form.
        if !page.try_submit(&PASSWORD_FIELD).await? {
            return Err(AuthError::CredentialFieldMissing);
        }

        if !self.expect_duo {
            debug!("expect_duo is off; not attempting 2FA");
            return Ok(AuthOutcome::Authenticated);
        }

        debug!("Entering Duo frame for 2FA");
        if !page.enter_frame(&DUO_FRAME).await? {
            return Err(AuthError::SecondFactorUnavailable);
        }
        debug!("Activating default 2FA method (should be a push notification)");
        if !page.try_activate(&DUO_DEFAULT_METHOD).await? {
            return Err(AuthError::SecondFactorUnavailable);
        }

        info!(
            "Waiting up to {}s for the Duo redirect...",
            self.duo_timeout.as_secs()
        );
        self.wait_for_redirect(page).await
    }

    /// Bounded poll of the current URL for the target substring. Blocks at
    /// most the configured timeout plus one poll interval.
    async fn wait_for_redirect(&self, page: &dyn Browse) -> Result<AuthOutcome, AuthError> {
        let deadline = Instant::now() + self.duo_timeout;
        loop {
            let current = page.current_url().await?;
            if current.contains(self.target_url.as_str()) {
                debug!("Detected redirect to target URL ('{}')", self.target_url);
                return Ok(AuthOutcome::Authenticated);
            }
            if Instant::now() >= deadline {
                return Err(AuthError::SecondFactorTimeout {
                    wait: self.duo_timeout,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
