//! Model inference collaborator.

mod openai;

pub use openai::OpenAiClient;
