//! Word datasets and the views derived from them.

mod dataset;
mod loader;
mod types;
pub mod validate;

pub use dataset::{filter_words, next_word, summarize};
pub use loader::DatasetLoader;
pub use types::WordWithStatus;
