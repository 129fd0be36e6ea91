// AI service access: the Gemini client, request lifecycle management and
// response parsing.

pub mod client;
pub mod error;
pub mod parse;
pub mod request;
pub mod retry;
pub mod slot;

pub use client::{AiClient, GeminiClient, GenerateRequest, LlmClient};
pub use error::{AiError, CallError};
pub use parse::{parse_json, parse_validated, ParseError, Validate};
pub use request::{CacheKey, RequestManager};
pub use retry::RetryPolicy;
pub use slot::{debounce, RequestSlot, Ticket};
