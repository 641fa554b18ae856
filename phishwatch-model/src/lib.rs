pub mod client;
pub mod error;
pub mod payload;

pub use client::{GeminiClient, ModelClient};
pub use error::ModelError;
pub use payload::{ContentPart, PromptPayload};
