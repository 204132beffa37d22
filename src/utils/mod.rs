pub mod diagnostics;
pub mod javascript;

pub use diagnostics::DiagnosticsCollector;
pub use javascript::JavaScriptRunner;
