pub mod error;
pub mod games;
pub mod heredity;
pub mod pagerank;
pub mod shopping;

pub use error::{AiError, Result};
