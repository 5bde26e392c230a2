pub mod busy;
pub mod error;
pub mod hash;
pub mod settings;
pub mod text;
pub mod timestamp;
pub mod types;

pub use busy::{BusyFlag, BusyGuard};
pub use error::ProvokeError;
pub use settings::{InputMode, Settings};
pub use types::*;
