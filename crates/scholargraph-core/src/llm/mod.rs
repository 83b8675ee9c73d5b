//! Chat-completions access for the AI collaborator
//!
//! Targets OpenRouter by default; any OpenAI-compatible endpoint works via
//! `llm.base_url`. Images travel inline as base64 data URLs.

mod client;
mod types;

pub use client::{LlmClient, LlmClientBuilder};
pub use types::{
    ChatRequest, ChatResponse, Choice, ContentPart, ImageUrl, LlmResponse, Message,
    MessageContent, MessageRole, Usage, image_data_url,
};
