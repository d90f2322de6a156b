//! Optional post-processing of program output through a symbol demangler.

use std::path::Path;

use tracing::{debug, warn};

use crate::runner::ProcessRunner;

/// Pipes program output through an external demangling tool.
#[derive(Debug, Clone)]
pub struct Demangler {
    program: String,
    args: Vec<String>,
    name: String,
    runner: ProcessRunner,
}

impl Demangler {
    /// Create a demangler invoking `program` with no arguments.
    pub fn new(program: impl Into<String>, runner: ProcessRunner) -> Self {
        let program = program.into();
        let name = Path::new(&program)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.clone());
        Self {
            program,
            args: Vec::new(),
            name,
            runner,
        }
    }

    /// Extra arguments passed to the tool.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Tool name used in failure annotations.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Demangle `output` if `requested`.
    ///
    /// - not requested, or blank output: returned as is, nothing is spawned
    /// - tool succeeds with non-blank output: that output replaces the input
    /// - tool succeeds with blank output: input kept
    /// - tool fails: input kept, with the tool's error text appended under a
    ///   `[<tool> error]` header
    pub async fn maybe_transform(&self, output: String, requested: bool) -> String {
        if !requested || output.trim().is_empty() {
            return output;
        }

        match self.runner.run(&self.program, &self.args, &output).await {
            Ok(result) if result.succeeded() => {
                if result.stdout.trim().is_empty() {
                    debug!(tool = %self.name, "demangler produced no output, keeping original");
                    output
                } else {
                    result.stdout
                }
            }
            Ok(result) => {
                warn!(tool = %self.name, exit_code = result.exit_code, "demangler failed");
                annotate(output, &self.name, &result.stderr)
            }
            Err(e) => {
                warn!(tool = %self.name, error = %e, "demangler could not run");
                annotate(output, &self.name, &e.to_string())
            }
        }
    }
}

fn annotate(original: String, tool: &str, error: &str) -> String {
    let error = error.trim();
    if error.is_empty() {
        return original;
    }
    format!("{original}\n\n[{tool} error]\n{error}")
}
