use crate::core::{BrowserTrait, Credentials, SessionTimings};
use crate::errors::BrowserAgentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

use super::resolver::{
    ResolveError, ResolvedSelector, SelectorCandidateSet, SelectorResolver, SelectorRole,
};
use super::session::BrowserSession;

/// Candidate locators for every role in the login flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginSelectors {
    pub page_body: SelectorCandidateSet,
    pub login_trigger: SelectorCandidateSet,
    pub portal_entry: SelectorCandidateSet,
    pub username: SelectorCandidateSet,
    pub password: SelectorCandidateSet,
    pub submit: SelectorCandidateSet,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            page_body: SelectorCandidateSet::new(SelectorRole::PageBody, ["body"]),
            login_trigger: SelectorCandidateSet::new(
                SelectorRole::LoginTrigger,
                [
                    r#"button[class*="login"]"#,
                    r#"a[class*="login"]"#,
                    r#"[role="button"][class*="login"]"#,
                    r#"button[title*="Login"]"#,
                    r#"a[title*="Login"]"#,
                    ".header button",
                    ".navigation button",
                    "button",
                    r#"a[href*="login"]"#,
                ],
            ),
            portal_entry: SelectorCandidateSet::new(
                SelectorRole::PortalEntry,
                [
                    r#"a[href*="internet-banking"]"#,
                    r#"a[href*="internetbanking"]"#,
                    r#"a[title*="Internet Banking"]"#,
                    r#"[role="menuitem"][href*="banking"]"#,
                    r#".dropdown a[href*="banking"]"#,
                    r#".menu a[href*="banking"]"#,
                    r#"a[href*="personal/online-banking"]"#,
                ],
            ),
            username: SelectorCandidateSet::new(
                SelectorRole::UsernameField,
                [
                    r#"input[name="userid"]"#,
                    r#"input[id="userid"]"#,
                    r#"input[type="text"][placeholder*="ID"]"#,
                    r#"input[type="text"][placeholder*="username"]"#,
                ],
            ),
            password: SelectorCandidateSet::new(
                SelectorRole::PasswordField,
                [
                    r#"input[name="password"]"#,
                    r#"input[id="password"]"#,
                    r#"input[type="password"]"#,
                ],
            ),
            submit: SelectorCandidateSet::new(
                SelectorRole::SubmitControl,
                [
                    r#"input[type="submit"]"#,
                    r#"button[type="submit"]"#,
                    r#"button[class*="submit"]"#,
                    r#"input[value*="Log"]"#,
                    r#"button[class*="login"]"#,
                ],
            ),
        }
    }
}

/// Progress through the login flow. `CredentialsSubmitted` is the only
/// successful terminal state; failure is reported as `AuthFailure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthState {
    Start,
    SiteLoaded,
    LoginSurfaceOpen,
    PortalEntrySelected,
    CredentialsSubmitted,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthState::Start => "start",
            AuthState::SiteLoaded => "site_loaded",
            AuthState::LoginSurfaceOpen => "login_surface_open",
            AuthState::PortalEntrySelected => "portal_entry_selected",
            AuthState::CredentialsSubmitted => "credentials_submitted",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum AuthFailure {
    #[error("could not resolve {role} (reached {reached})")]
    Unresolved {
        reached: AuthState,
        role: SelectorRole,
    },

    #[error("could not activate {role} (reached {reached}): {source}")]
    Interaction {
        reached: AuthState,
        role: SelectorRole,
        #[source]
        source: BrowserAgentError,
    },

    #[error("site could not be loaded: {0}")]
    Navigation(#[source] BrowserAgentError),
}

impl AuthFailure {
    pub fn reached(&self) -> AuthState {
        match self {
            AuthFailure::Unresolved { reached, .. }
            | AuthFailure::Interaction { reached, .. } => *reached,
            AuthFailure::Navigation(_) => AuthState::Start,
        }
    }

    pub fn role(&self) -> Option<SelectorRole> {
        match self {
            AuthFailure::Unresolved { role, .. } | AuthFailure::Interaction { role, .. } => {
                Some(*role)
            }
            AuthFailure::Navigation(_) => None,
        }
    }

    /// Whether the portal itself rejected or hid the flow, as opposed to
    /// the browser or network failing underneath it.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            AuthFailure::Unresolved { .. } | AuthFailure::Interaction { .. }
        )
    }

    fn from_resolve(reached: AuthState, err: ResolveError) -> Self {
        AuthFailure::Unresolved {
            reached,
            role: err.role(),
        }
    }
}

/// Drives `Start -> SiteLoaded -> LoginSurfaceOpen -> PortalEntrySelected
/// -> CredentialsSubmitted`. No step is retried.
pub struct AuthSequencer<'a> {
    selectors: &'a LoginSelectors,
    resolver: SelectorResolver,
    timings: &'a SessionTimings,
}

impl<'a> AuthSequencer<'a> {
    pub fn new(selectors: &'a LoginSelectors, timings: &'a SessionTimings) -> Self {
        Self {
            selectors,
            resolver: SelectorResolver::new(timings.visibility_timeout),
            timings,
        }
    }

    pub async fn run<B: BrowserTrait>(
        &self,
        session: &BrowserSession<B>,
        base_url: &str,
        credentials: &Credentials,
    ) -> std::result::Result<AuthState, AuthFailure> {
        let mut state = AuthState::Start;

        // Start -> SiteLoaded
        session
            .navigate(base_url)
            .await
            .map_err(AuthFailure::Navigation)?;
        session
            .wait_for_document_ready(self.timings.ready_timeout)
            .await
            .map_err(AuthFailure::Navigation)?;
        self.resolve(session, &self.selectors.page_body, state)
            .await?;
        state = self.advance(state, AuthState::SiteLoaded);

        // SiteLoaded -> LoginSurfaceOpen
        let trigger = self
            .resolve(session, &self.selectors.login_trigger, state)
            .await?;
        self.activate(session, &trigger, state).await?;
        state = self.advance(state, AuthState::LoginSurfaceOpen);

        // LoginSurfaceOpen -> PortalEntrySelected
        session.pause(self.timings.menu_pause).await;
        let entry = self
            .resolve(session, &self.selectors.portal_entry, state)
            .await?;
        self.activate(session, &entry, state).await?;
        state = self.advance(state, AuthState::PortalEntrySelected);

        // PortalEntrySelected -> CredentialsSubmitted
        let username = self
            .resolve(session, &self.selectors.username, state)
            .await?;
        let password = self
            .resolve(session, &self.selectors.password, state)
            .await?;
        let submit = self.resolve(session, &self.selectors.submit, state).await?;

        self.fill(session, &username, credentials.username(), state)
            .await?;
        self.fill(session, &password, credentials.password(), state)
            .await?;
        self.activate(session, &submit, state).await?;

        Ok(self.advance(state, AuthState::CredentialsSubmitted))
    }

    fn advance(&self, from: AuthState, to: AuthState) -> AuthState {
        info!(from = %from, to = %to, "Login step complete");
        to
    }

    async fn resolve<B: BrowserTrait>(
        &self,
        session: &BrowserSession<B>,
        set: &SelectorCandidateSet,
        reached: AuthState,
    ) -> std::result::Result<ResolvedSelector, AuthFailure> {
        self.resolver.resolve(session, set).await.map_err(|err| {
            warn!(role = %set.role(), reached = %reached, error = %err, "Login step failed");
            AuthFailure::from_resolve(reached, err)
        })
    }

    async fn activate<B: BrowserTrait>(
        &self,
        session: &BrowserSession<B>,
        target: &ResolvedSelector,
        reached: AuthState,
    ) -> std::result::Result<(), AuthFailure> {
        session
            .click(&target.selector)
            .await
            .map_err(|source| AuthFailure::Interaction {
                reached,
                role: target.role,
                source,
            })
    }

    async fn fill<B: BrowserTrait>(
        &self,
        session: &BrowserSession<B>,
        target: &ResolvedSelector,
        value: &str,
        reached: AuthState,
    ) -> std::result::Result<(), AuthFailure> {
        session
            .type_text(&target.selector, value)
            .await
            .map_err(|source| AuthFailure::Interaction {
                reached,
                role: target.role,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::session::SessionBudget;
    use crate::core::BrowserConfig;
    use crate::testing::{BrowserAction, ScriptedBrowser};
    use std::time::Duration;

    const TRIGGER: &str = r#"a[href*="login"]"#;
    const ENTRY: &str = r#"a[href*="internet-banking"]"#;
    const USERNAME: &str = r#"input[name="userid"]"#;
    const PASSWORD: &str = r#"input[type="password"]"#;
    const SUBMIT: &str = r#"button[type="submit"]"#;

    fn portal() -> ScriptedBrowser {
        ScriptedBrowser::new().with_visible(["body", TRIGGER, ENTRY, USERNAME, PASSWORD, SUBMIT])
    }

    async fn run(browser: ScriptedBrowser) -> std::result::Result<AuthState, AuthFailure> {
        let selectors = LoginSelectors::default();
        let timings = SessionTimings::immediate();
        let session = BrowserSession::open(
            browser,
            &BrowserConfig::default(),
            SessionBudget::start(Duration::from_secs(30)),
        )
        .await
        .unwrap();
        AuthSequencer::new(&selectors, &timings)
            .run(
                &session,
                "https://bank.example",
                &Credentials::new("12345678", "pa'ss\"word"),
            )
            .await
    }

    #[tokio::test]
    async fn test_full_flow_fills_then_submits_in_order() {
        let browser = portal();
        let recorder = browser.recorder();

        let state = run(browser).await.unwrap();
        assert_eq!(state, AuthState::CredentialsSubmitted);

        assert_eq!(
            recorder.actions(),
            vec![
                BrowserAction::Navigate("https://bank.example".to_string()),
                BrowserAction::Click(TRIGGER.to_string()),
                BrowserAction::Click(ENTRY.to_string()),
                BrowserAction::Type {
                    selector: USERNAME.to_string(),
                    text: "12345678".to_string()
                },
                BrowserAction::Type {
                    selector: PASSWORD.to_string(),
                    text: "pa'ss\"word".to_string()
                },
                BrowserAction::Click(SUBMIT.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_portal_entry_fails_with_role() {
        let browser = ScriptedBrowser::new().with_visible(["body", TRIGGER]);

        let failure = run(browser).await.unwrap_err();
        assert!(failure.is_authentication());
        assert_eq!(failure.role(), Some(SelectorRole::PortalEntry));
        assert_eq!(failure.reached(), AuthState::LoginSurfaceOpen);
    }

    #[tokio::test]
    async fn test_no_typing_unless_all_three_fields_resolve() {
        let browser =
            ScriptedBrowser::new().with_visible(["body", TRIGGER, ENTRY, USERNAME, PASSWORD]);
        let recorder = browser.recorder();

        let failure = run(browser).await.unwrap_err();
        assert_eq!(failure.role(), Some(SelectorRole::SubmitControl));
        assert!(!recorder
            .actions()
            .iter()
            .any(|a| matches!(a, BrowserAction::Type { .. })));
    }

    #[tokio::test]
    async fn test_submit_click_failure_is_authentication() {
        let browser = portal().failing_click(SUBMIT);

        let failure = run(browser).await.unwrap_err();
        assert!(matches!(
            failure,
            AuthFailure::Interaction {
                role: SelectorRole::SubmitControl,
                ..
            }
        ));
        assert!(failure.is_authentication());
    }

    #[tokio::test]
    async fn test_navigation_error_is_not_authentication() {
        let browser = portal().fail_navigation();

        let failure = run(browser).await.unwrap_err();
        assert!(matches!(failure, AuthFailure::Navigation(_)));
        assert!(!failure.is_authentication());
        assert_eq!(failure.reached(), AuthState::Start);
    }
}
