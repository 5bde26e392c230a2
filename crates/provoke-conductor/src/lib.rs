pub mod background;
pub mod capture;
pub mod chat;
pub mod observe;
pub mod overlay;
pub mod prompt;
pub mod status;
pub mod surface;
pub mod token;
pub mod wait_until;

pub use background::{is_watch_page, Background, BackgroundRequest, BackgroundResponse};
pub use capture::{capture_frames, capture_one, CapturePlan};
pub use observe::{transcript_window, TRANSCRIPT_WINDOW_MS};
pub use overlay::{
    DeepOutcome, GenerationInputs, GenerationReport, Overlay, PassOutput, VideoSession,
};
pub use status::{CollectStatus, StatusSink, StderrStatus};
pub use surface::{MockSurface, PlayerSurface};
pub use token::PassToken;
pub use wait_until::{wait_until, WaitOutcome};
