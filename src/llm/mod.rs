pub mod openai;
pub mod prompts;

pub use openai::OpenAiClient;
