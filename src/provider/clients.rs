//! Provider client implementations.

pub mod openai_compat;
pub mod resolver;

pub use openai_compat::OpenAiCompatibleClient;
pub use resolver::EnvModelClientResolver;
