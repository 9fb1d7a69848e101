//! Answer generation: prompt assembly, the RAG chain and SSE encoding

pub mod chain;
pub mod prompt;
pub mod sse;

pub use chain::{ChainStage, EventStream, RagChain};
pub use prompt::{assemble, Prompt, PromptTemplate};
pub use sse::{encode, WireFrame};
