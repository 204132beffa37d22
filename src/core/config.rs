use crate::errors::{BrowserAgentError, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.nab.com.au";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Portal login. Never printed, logged or written into a snapshot.
pub struct Credentials {
    username: SecretString,
    password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: SecretString::new(username.into()),
            password: SecretString::new(password.into()),
        }
    }

    pub(crate) fn username(&self) -> &str {
        self.username.expose_secret()
    }

    pub(crate) fn password(&self) -> &str {
        self.password.expose_secret()
    }

    pub fn is_complete(&self) -> bool {
        !self.username().is_empty() && !self.password().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            args: vec![],
        }
    }
}

/// Fixed waits used inside one acquisition. All of them are still bounded by
/// the session budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTimings {
    /// Upper bound for a single "wait until visible" check.
    pub visibility_timeout: Duration,
    /// Pause between opening the login surface and looking for the portal entry.
    pub menu_pause: Duration,
    /// Pause after login before the page is read.
    pub settle_interval: Duration,
    /// Upper bound for waiting on `document.readyState`.
    pub ready_timeout: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            visibility_timeout: Duration::from_secs(2),
            menu_pause: Duration::from_secs(1),
            settle_interval: Duration::from_secs(3),
            ready_timeout: Duration::from_secs(5),
        }
    }
}

impl SessionTimings {
    /// No pauses and short visibility waits, for in-memory browsers.
    pub fn immediate() -> Self {
        Self {
            visibility_timeout: Duration::from_millis(50),
            menu_pause: Duration::ZERO,
            settle_interval: Duration::ZERO,
            ready_timeout: Duration::from_millis(50),
        }
    }
}

/// Everything one acquisition needs. Built once by the caller and never
/// mutated afterwards.
#[derive(Debug)]
pub struct SessionConfig {
    pub credentials: Credentials,
    pub base_url: String,
    pub browser: BrowserConfig,
    pub timeout: Duration,
    pub diagnostics_dir: PathBuf,
    pub timings: SessionTimings,
}

impl SessionConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            base_url: DEFAULT_BASE_URL.to_string(),
            browser: BrowserConfig::default(),
            timeout: DEFAULT_TIMEOUT,
            diagnostics_dir: PathBuf::from("screenshots"),
            timings: SessionTimings::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.browser.headless = headless;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.browser.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_diagnostics_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diagnostics_dir = dir.into();
        self
    }

    pub fn with_timings(mut self, timings: SessionTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url).map_err(|e| {
            BrowserAgentError::ConfigurationError(format!(
                "invalid base url {:?}: {}",
                self.base_url, e
            ))
        })?;

        if self.timeout.is_zero() {
            return Err(BrowserAgentError::ConfigurationError(
                "session timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Browser,
    Sample,
}

impl FromStr for ProviderKind {
    type Err = BrowserAgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "browser" | "chrome" => Ok(ProviderKind::Browser),
            "sample" | "mock" => Ok(ProviderKind::Sample),
            other => Err(BrowserAgentError::ConfigurationError(format!(
                "unknown account provider: {}",
                other
            ))),
        }
    }
}

pub const DEFAULT_PORT: u16 = 8080;

/// Application level settings read from the environment by the binary.
#[derive(Debug)]
pub struct AppConfig {
    pub provider: ProviderKind,
    pub session: SessionConfig,
    /// Listen port for `serve`.
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let provider = match get("ACCOUNT_PROVIDER") {
            Some(value) => value.parse()?,
            None => ProviderKind::Browser,
        };

        let username = get("NAB_USERNAME").unwrap_or_default();
        let password = get("NAB_PASSWORD").unwrap_or_default();

        if provider == ProviderKind::Browser {
            if username.is_empty() {
                return Err(BrowserAgentError::ConfigurationError(
                    "NAB_USERNAME environment variable is required".to_string(),
                ));
            }
            if password.is_empty() {
                return Err(BrowserAgentError::ConfigurationError(
                    "NAB_PASSWORD environment variable is required".to_string(),
                ));
            }
        }

        let mut session = SessionConfig::new(Credentials::new(username, password));

        if let Some(base_url) = get("NAB_BASE_URL") {
            session = session.with_base_url(base_url);
        }
        if let Some(timeout) = get("BROWSER_TIMEOUT").and_then(|v| parse_duration(&v)) {
            session = session.with_timeout(timeout);
        }
        if let Some(headless) = get("BROWSER_HEADLESS").and_then(|v| parse_bool(&v)) {
            session = session.with_headless(headless);
        }
        if let Some(dir) = get("BROWSER_SCREENSHOT_PATH") {
            session = session.with_diagnostics_dir(dir);
        }
        if let Some(user_agent) = get("BROWSER_USER_AGENT") {
            session = session.with_user_agent(user_agent);
        }

        let port = match get("PORT") {
            Some(value) => value.trim().parse().map_err(|_| {
                BrowserAgentError::ConfigurationError(format!("PORT is not a valid port: {}", value))
            })?,
            None => DEFAULT_PORT,
        };

        session.validate()?;

        Ok(Self {
            provider,
            session,
            port,
        })
    }
}

/// Parses durations such as `30s`, `2m`, `1h`, `500ms` or a bare number of
/// seconds.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: u64 = number.parse().ok()?;

    match unit.trim() {
        "" | "s" => Some(Duration::from_secs(number)),
        "ms" => Some(Duration::from_millis(number)),
        "m" => Some(Duration::from_secs(number.checked_mul(60)?)),
        "h" => Some(Duration::from_secs(number.checked_mul(3600)?)),
        _ => None,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" => Some(true),
        "0" | "f" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_credentials_are_redacted() {
        let config = SessionConfig::new(Credentials::new("alice", "hunter2"));
        let printed = format!("{:?}", config);
        assert!(!printed.contains("alice"));
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("REDACTED"));
    }

    #[test]
    fn test_from_lookup_reads_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("NAB_USERNAME", "user"),
            ("NAB_PASSWORD", "pass"),
            ("NAB_BASE_URL", "https://bank.example"),
            ("BROWSER_TIMEOUT", "45s"),
            ("BROWSER_HEADLESS", "false"),
            ("BROWSER_SCREENSHOT_PATH", "/tmp/shots"),
        ]))
        .unwrap();

        assert_eq!(config.provider, ProviderKind::Browser);
        assert_eq!(config.session.base_url, "https://bank.example");
        assert_eq!(config.session.timeout, Duration::from_secs(45));
        assert!(!config.session.browser.headless);
        assert_eq!(config.session.diagnostics_dir, PathBuf::from("/tmp/shots"));
    }

    #[test]
    fn test_browser_provider_requires_credentials() {
        let err = AppConfig::from_lookup(lookup(&[("NAB_USERNAME", "user")])).unwrap_err();
        assert!(err.to_string().contains("NAB_PASSWORD"));
    }

    #[test]
    fn test_sample_provider_needs_no_credentials() {
        let config = AppConfig::from_lookup(lookup(&[("ACCOUNT_PROVIDER", "sample")])).unwrap();
        assert_eq!(config.provider, ProviderKind::Sample);
        assert!(!config.session.credentials.is_complete());
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let result = AppConfig::from_lookup(lookup(&[
            ("NAB_USERNAME", "user"),
            ("NAB_PASSWORD", "pass"),
            ("NAB_BASE_URL", "not a url"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("60"), Some(Duration::from_secs(60)));
        assert_eq!(parse_duration("soon"), None);
    }

    #[test]
    fn test_parse_duration_rejects_overflow() {
        assert_eq!(parse_duration("400000000000000000m"), None);
        assert_eq!(parse_duration("18446744073709551615h"), None);
        assert_eq!(parse_duration("99999999999999999999s"), None);
    }

    #[test]
    fn test_port_defaults_and_overrides() {
        let config = AppConfig::from_lookup(lookup(&[("ACCOUNT_PROVIDER", "sample")])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);

        let config = AppConfig::from_lookup(lookup(&[
            ("ACCOUNT_PROVIDER", "sample"),
            ("PORT", "9090"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9090);

        let err = AppConfig::from_lookup(lookup(&[
            ("ACCOUNT_PROVIDER", "sample"),
            ("PORT", "http"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
