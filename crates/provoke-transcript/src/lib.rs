mod allow;
mod fetch;
mod parse;
mod tracks;

pub use allow::{is_allowed_caption_url, video_id_from_url, with_format};
pub use fetch::{fetch_transcript, CaptionBody, CaptionHttp, ReqwestCaptionHttp};
pub use parse::{parse_json3, parse_markup, parse_vtt};
pub use tracks::{build_transcript_text, pick_caption_track, tracks_from_player_response};
