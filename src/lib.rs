pub mod api;
pub mod config;
pub mod conversation;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod generation;
pub mod language;
pub mod query;
pub mod retrieval;
pub mod storage;


pub use engine::{QueryResult, RagSystem};
pub use error::{RagError, Result};
