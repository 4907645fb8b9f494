//! Prelude module for convenient imports
//!
//! Re-exports the types and functions most embedders need: the loader,
//! the store and its entity definitions, the executor and the per-phase
//! error enums.

// Loading and execution
pub use crate::executor::Executor;
pub use crate::flow::load;

// Store and entity definitions
pub use crate::flow::{ConcatenateDef, FileDef, FlowStore, NodeDef, PipeDef, Resolved};

// Resolution
pub use crate::resolver::{resolve_action, validate};

// Command splitting
pub use crate::tokenizer::tokenize;

// Error types
pub use crate::error::{ExecError, FlowError, ParseError, ResolveError, TokenizeError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, crate::error::FlowError>;
