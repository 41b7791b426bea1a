//! LLM Provider Clients and Abstractions
//!
//! The collaborators that supply the pipeline's judgment (deciding which
//! capability to call, planning, scoring, composing) talk to a language model
//! through the [`LLMClient`] trait. Providers are plain HTTP clients built on
//! `reqwest`.
//!
//! # Example
//!
//! ```ignore
//! use thinkle::llm::Provider;
//!
//! let provider = Provider::from_config(&config.provider, &config.models.scout)?;
//! let client = provider.create_client()?;
//! let reply = client.generate_with_system("You are terse.", "Say hi").await?;
//! ```

/// Core LLM client trait, chat messages and provider selection.
pub mod client;
/// Ollama `/api/chat` client.
pub mod ollama;
/// OpenAI-compatible `/chat/completions` client.
pub mod openai;

pub use client::{ChatMessage, LLMClient, LLMResponse, MessageRole, Provider};
