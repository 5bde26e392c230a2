pub mod normalize;
pub mod session;

pub use normalize::{items_from_output, normalize, normalize_deck};
pub use session::DeckSession;
