//! Answer generation: prompt augmentation, chat completion and caching

mod client;
mod prompt;
mod service;

pub use client::{AugmentedChatClient, GeneratedAnswer};
pub use prompt::PromptBuilder;
pub use service::RagChatService;
