pub mod client;
pub mod mock;
pub mod parse;
pub mod request;
pub mod stream;

pub use client::{generate_text, GeminiClient, GenerationClient};
pub use mock::MockClient;
pub use parse::{parse_structured_output, parse_with_repair};
pub use request::{GenerateRequest, GenerateResponse, GenerationConfig, Part};
pub use stream::{StreamAccumulator, StreamEvent};
