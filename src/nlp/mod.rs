pub mod vocabulary;
pub mod temporal;
pub mod title;
pub mod targets;

pub use temporal::TemporalExtractor;
pub use title::{title_case, TitleExtractor, DEFAULT_TITLE};
pub use targets::{Target, TargetExtractor};
