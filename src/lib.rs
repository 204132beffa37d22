pub mod api;
pub mod browser;
pub mod core;
pub mod dom;
pub mod errors;
pub mod provider;
pub mod testing;
pub mod types;
pub mod utils;

pub use browser::{AccountAcquisition, BrowserSession, ChromeBrowser};
pub use core::{AppConfig, BrowserConfig, BrowserTrait, Credentials, ProviderKind, SessionConfig};
pub use errors::{AcquisitionError, BrowserAgentError};
pub use provider::{build_provider, AccountProvider, RequestContext};
pub use types::*;
