use crate::core::BrowserTrait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use super::session::BrowserSession;

/// Logical UI element the engine needs to find on the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorRole {
    PageBody,
    LoginTrigger,
    PortalEntry,
    UsernameField,
    PasswordField,
    SubmitControl,
}

impl SelectorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorRole::PageBody => "page_body",
            SelectorRole::LoginTrigger => "login_trigger",
            SelectorRole::PortalEntry => "portal_entry",
            SelectorRole::UsernameField => "username_field",
            SelectorRole::PasswordField => "password_field",
            SelectorRole::SubmitControl => "submit_control",
        }
    }
}

impl fmt::Display for SelectorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered locators for one role. Earlier entries win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorCandidateSet {
    role: SelectorRole,
    candidates: Vec<String>,
}

impl SelectorCandidateSet {
    pub fn new<I, S>(role: SelectorRole, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            role,
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }

    pub fn role(&self) -> SelectorRole {
        self.role
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// The candidate that won, and where it sat in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSelector {
    pub role: SelectorRole,
    pub selector: String,
    pub position: usize,
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("no visible element for {role} after {tried} candidate(s)")]
    NotFound { role: SelectorRole, tried: usize },
}

impl ResolveError {
    pub fn role(&self) -> SelectorRole {
        match self {
            ResolveError::NotFound { role, .. } => *role,
        }
    }
}

/// First listed, first matched: candidates are checked strictly in order and
/// checking stops at the first visible match. A check that errors counts as
/// not visible; the page is often mid-navigation when it happens.
#[derive(Debug, Clone)]
pub struct SelectorResolver {
    visibility_timeout: Duration,
}

impl SelectorResolver {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self { visibility_timeout }
    }

    pub async fn resolve<B: BrowserTrait>(
        &self,
        session: &BrowserSession<B>,
        set: &SelectorCandidateSet,
    ) -> std::result::Result<ResolvedSelector, ResolveError> {
        let role = set.role();

        for (position, selector) in set.candidates().iter().enumerate() {
            let visible = match session.wait_until_visible(selector, self.visibility_timeout).await {
                Ok(visible) => visible,
                Err(err) => {
                    debug!(role = %role, selector = %selector, error = %err, "Visibility check failed");
                    false
                }
            };

            if visible {
                info!(role = %role, selector = %selector, position, "Resolved selector");
                return Ok(ResolvedSelector {
                    role,
                    selector: selector.clone(),
                    position,
                });
            }

            debug!(role = %role, selector = %selector, "Selector not visible");
        }

        Err(ResolveError::NotFound {
            role,
            tried: set.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::session::SessionBudget;
    use crate::core::BrowserConfig;
    use crate::testing::ScriptedBrowser;

    async fn open(browser: ScriptedBrowser) -> BrowserSession<ScriptedBrowser> {
        BrowserSession::open(
            browser,
            &BrowserConfig::default(),
            SessionBudget::start(Duration::from_secs(5)),
        )
        .await
        .unwrap()
    }

    fn login_set() -> SelectorCandidateSet {
        SelectorCandidateSet::new(
            SelectorRole::LoginTrigger,
            ["button.login", "a.login", "a[href*=\"login\"]", "button"],
        )
    }

    #[tokio::test]
    async fn test_first_match_stops_probing() {
        let browser = ScriptedBrowser::new().with_visible(["a[href*=\"login\"]", "button"]);
        let recorder = browser.recorder();
        let session = open(browser).await;

        let resolved = SelectorResolver::new(Duration::from_millis(10))
            .resolve(&session, &login_set())
            .await
            .unwrap();

        assert_eq!(resolved.selector, "a[href*=\"login\"]");
        assert_eq!(resolved.position, 2);
        assert_eq!(
            recorder.checked(),
            vec!["button.login", "a.login", "a[href*=\"login\"]"]
        );
    }

    #[tokio::test]
    async fn test_listed_order_beats_later_matches() {
        let browser = ScriptedBrowser::new().with_visible(["button.login", "button"]);
        let recorder = browser.recorder();
        let session = open(browser).await;

        let resolved = SelectorResolver::new(Duration::from_millis(10))
            .resolve(&session, &login_set())
            .await
            .unwrap();

        assert_eq!(resolved.position, 0);
        assert_eq!(recorder.checked().len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_set_reports_role() {
        let browser = ScriptedBrowser::new();
        let recorder = browser.recorder();
        let session = open(browser).await;

        let err = SelectorResolver::new(Duration::from_millis(5))
            .resolve(&session, &login_set())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ResolveError::NotFound {
                role: SelectorRole::LoginTrigger,
                tried: 4
            }
        ));
        assert_eq!(recorder.checked().len(), 4);
        assert!(err.to_string().contains("login_trigger"));
    }

    #[tokio::test]
    async fn test_erroring_candidate_moves_to_next() {
        let set = SelectorCandidateSet::new(SelectorRole::PortalEntry, ["first", "second"]);
        let browser = ScriptedBrowser::new()
            .failing_visibility_check("first")
            .with_visible(["second"]);
        let recorder = browser.recorder();
        let session = open(browser).await;

        let resolved = SelectorResolver::new(Duration::from_millis(10))
            .resolve(&session, &set)
            .await
            .unwrap();

        assert_eq!(resolved.selector, "second");
        assert_eq!(resolved.position, 1);
        assert_eq!(recorder.checked(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_every_candidate_erroring_is_not_found() {
        let set = SelectorCandidateSet::new(SelectorRole::UsernameField, ["a", "b"]);
        let browser = ScriptedBrowser::new()
            .failing_visibility_check("a")
            .failing_visibility_check("b");
        let session = open(browser).await;

        let err = SelectorResolver::new(Duration::from_millis(10))
            .resolve(&session, &set)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ResolveError::NotFound {
                role: SelectorRole::UsernameField,
                tried: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_set_is_not_found() {
        let session = open(ScriptedBrowser::new()).await;
        let empty = SelectorCandidateSet::new(SelectorRole::SubmitControl, Vec::<String>::new());

        let err = SelectorResolver::new(Duration::from_millis(5))
            .resolve(&session, &empty)
            .await
            .unwrap_err();

        assert_eq!(err.role(), SelectorRole::SubmitControl);
    }
}
