pub mod browser;
pub mod config;

pub use browser::BrowserTrait;
pub use config::{
    AppConfig, BrowserConfig, Credentials, ProviderKind, SessionConfig, SessionTimings, Viewport,
};
