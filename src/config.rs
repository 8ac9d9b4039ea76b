// src/config.rs
//! Run configuration resolved once from CLI flags and the environment,
//! then threaded immutably into the session, auth and workflow code.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::{Args, Command};

/// Centralized login service the target application redirects to.
pub const AUTH_URL: &str = "https://cas.tamu.edu";
pub const APPROVE_URL: &str = "https://plato.tamu.edu/Approval/";
pub const SUBMIT_URL: &str = "https://plato.tamu.edu/timeentry.asp";

/// Minimum version tokens for the browser and driver binaries. The
/// comparison downstream is lexicographic, not semantic.
pub const CHROME_MINVER: &str = "61";
pub const DRIVER_MINVER: &str = "2.4";

const CHROME_PATH_VAR: &str = "CHROME_PATH";
const DRIVER_PATH_VAR: &str = "DRIVER_PATH";

const DUO_TIMEOUT: Duration = Duration::from_secs(15);
const DUO_POLL_INTERVAL: Duration = Duration::from_millis(500);

fn default_chrome_path() -> PathBuf {
    if cfg!(target_os = "macos") {
        PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome")
    } else {
        PathBuf::from("/usr/bin/google-chrome")
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Where the selected workflow lives; also the substring whose
    /// appearance in the URL signals a completed login.
    pub target_url: String,
    pub auth_url: String,
    pub chrome_path: PathBuf,
    pub driver_path: PathBuf,
    pub driver_port: u16,
    pub duo_timeout: Duration,
    pub poll_interval: Duration,
    pub expect_duo: bool,
    pub test_mode: bool,
}

impl RunConfig {
    pub fn resolve(args: &Args) -> Self {
        let target_url = match args.command {
            Command::Approve => APPROVE_URL,
            Command::Submit => SUBMIT_URL,
        };

        Self {
            target_url: target_url.to_string(),
            auth_url: AUTH_URL.to_string(),
            chrome_path: env::var_os(CHROME_PATH_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(default_chrome_path),
            driver_path: env::var_os(DRIVER_PATH_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("bin/chromedriver")),
            driver_port: 9515,
            duo_timeout: DUO_TIMEOUT,
            poll_interval: DUO_POLL_INTERVAL,
            expect_duo: true,
            test_mode: args.test_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(command: &str) -> Args {
        Args::try_parse_from(["timesheets", command]).unwrap()
    }

    // Single test so the env mutations cannot race each other.
    #[test]
    fn resolves_urls_and_binary_paths() {
        env::remove_var(CHROME_PATH_VAR);
        env::remove_var(DRIVER_PATH_VAR);

        let submit = RunConfig::resolve(&args("submit"));
        assert_eq!(submit.target_url, SUBMIT_URL);
        assert_eq!(submit.auth_url, AUTH_URL);
        assert_eq!(submit.driver_path, PathBuf::from("bin/chromedriver"));
        assert!(submit.expect_duo);
        assert!(!submit.test_mode);

        let approve = RunConfig::resolve(&args("approve"));
        assert_eq!(approve.target_url, APPROVE_URL);

        env::set_var(CHROME_PATH_VAR, "/opt/chromium/chrome");
        env::set_var(DRIVER_PATH_VAR, "/opt/chromium/chromedriver");
        let overridden = RunConfig::resolve(&args("submit"));
        assert_eq!(overridden.chrome_path, PathBuf::from("/opt/chromium/chrome"));
        assert_eq!(overridden.driver_path, PathBuf::from("/opt/chromium/chromedriver"));

        env::remove_var(CHROME_PATH_VAR);
        env::remove_var(DRIVER_PATH_VAR);
    }

    #[test]
    fn test_mode_flag_carries_through() {
        let args = Args::try_parse_from(["timesheets", "submit", "-t"]).unwrap();
        assert!(RunConfig::resolve(&args).test_mode);
    }
}
