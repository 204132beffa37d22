pub mod acquisition;
pub mod chrome;
pub mod login;
pub mod navigation;
pub mod resolver;
pub mod session;

pub use acquisition::AccountAcquisition;
pub use chrome::ChromeBrowser;
pub use login::{AuthFailure, AuthSequencer, AuthState, LoginSelectors};
pub use navigation::{NavigationManager, NavigationResult};
pub use resolver::{ResolveError, ResolvedSelector, SelectorCandidateSet, SelectorResolver, SelectorRole};
pub use session::{BrowserSession, SessionBudget};
