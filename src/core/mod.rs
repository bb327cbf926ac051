pub mod engine;
pub mod pipeline;

pub use crate::domain::model::{RunReport, SourceBundle};
pub use crate::domain::ports::{ConfigProvider, LlmClient, Pipeline, Storage};
pub use crate::utils::error::Result;
