// Natural-language → CandidateProfile query generation.
// All LLM calls go through llm_client; nothing here talks to the provider directly.

pub mod generator;
pub mod handlers;
pub mod prompts;
pub mod sanitize;
