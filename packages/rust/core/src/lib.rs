//! Compile orchestration for SIL Inspector.
//!
//! This crate runs one source text through every compiler stage in a
//! [`ProgramRegistry`]: it builds each stage's arguments, runs the program,
//! optionally demangles its output and collects everything into a
//! [`ResultBundle`](silinspector_shared::ResultBundle).

pub mod args;
pub mod demangle;
pub mod pipeline;
pub mod quote;
pub mod registry;
pub mod runner;

pub use demangle::Demangler;
pub use pipeline::{Pipeline, ProgressReporter, SilentProgress};
pub use registry::{ProgramRegistry, ProgramSpec};
pub use runner::{ProcessOutput, ProcessRunner};
