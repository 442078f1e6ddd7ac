//! Annotation-driven binding generator for the engine scripting layer.
//!
//! Scans engine headers and script sources for `///@` tags, builds the
//! validated API registry and emits the generated C++ units the engine
//! build compiles in. See the member crates for the individual phases;
//! this crate holds the pipeline driver and the CLI.

pub mod headers;
pub mod pipeline;

pub use pipeline::{PipelineArgs, run};
