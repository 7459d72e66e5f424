pub mod analyzer;
pub mod cli;
pub mod error;
pub mod files;
pub mod formatter;
pub mod layout;
pub mod normalizer;
pub mod pipeline;
pub mod reassembler;
pub mod stack;

// Re-export key types for convenience
pub use analyzer::{Analyzer, TraceEvent};
pub use cli::Args;
pub use error::{Error, LayoutError, Result, TokenError};
pub use formatter::{Summary, write_summaries};
pub use layout::{CompiledPattern, LogEvent};
pub use normalizer::DateNormalizer;
pub use pipeline::{Pipeline, PipelineConfig, RunStats};
pub use reassembler::EventReassembler;
pub use stack::CallStackTracker;
