//! Retrieval, prompting and answer generation over an index.
pub mod generator;
pub mod llm;
pub mod pipeline;
pub mod retriever;
pub mod session;

pub use generator::{Generation, Language};
pub use pipeline::{Answer, IndexHandle, Pipeline};
pub use session::{AskOutcome, Session};
