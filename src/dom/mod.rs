pub mod extract;
pub mod text;

pub use extract::{AccountExtractor, ExtractionRules};
pub use text::flatten;
