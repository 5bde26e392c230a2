pub mod store;
pub mod summary;

pub use store::{context_key, ContextStore, SummaryOutcome, CONTEXT_PREFIX, DEFAULT_MAX_RECORDS};
