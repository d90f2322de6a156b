//! Compile pipeline: source text → every registry stage → keyed results.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use silinspector_shared::{
    CommandResult, CompileRequest, ExecutionMode, PipelineConfig, RequestId, Result,
    ResultBundle, SilInspectorError,
};

use crate::args::build_args;
use crate::demangle::Demangler;
use crate::quote;
use crate::registry::{ProgramRegistry, ProgramSpec};
use crate::runner::{ProcessRunner, SPAWN_FAILURE_EXIT_CODE, TIMEOUT_EXIT_CODE};

/// Exit code recorded for a stage whose task panicked.
const UNKNOWN_EXIT_CODE: i32 = -1;

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called before a stage's program is started.
    fn stage_started(&self, key: &str, label: &str);
    /// Called once a stage's result is final.
    fn stage_finished(&self, key: &str, result: &CommandResult);
    /// Called when every stage has finished.
    fn done(&self, bundle: &ResultBundle);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage_started(&self, _key: &str, _label: &str) {}
    fn stage_finished(&self, _key: &str, _result: &CommandResult) {}
    fn done(&self, _bundle: &ResultBundle) {}
}

/// Runs a request through every program in a registry.
#[derive(Debug, Clone)]
pub struct Pipeline {
    registry: Arc<ProgramRegistry>,
    runner: ProcessRunner,
    demangler: Demangler,
    module_name: String,
    mode: ExecutionMode,
}

impl Pipeline {
    /// Pipeline over an existing registry.
    pub fn new(registry: Arc<ProgramRegistry>, config: &PipelineConfig) -> Self {
        let runner = ProcessRunner::new(config.timeout);
        Self {
            registry,
            runner,
            demangler: Demangler::new(config.demangler.clone(), runner),
            module_name: config.module_name.clone(),
            mode: config.mode,
        }
    }

    /// Pipeline over the Swift stages, invoking `config.compiler`.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(Arc::new(ProgramRegistry::swift(&config.compiler)), config)
    }

    /// Replace the demangler.
    pub fn with_demangler(mut self, demangler: Demangler) -> Self {
        self.demangler = demangler;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn registry(&self) -> &ProgramRegistry {
        &self.registry
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Run `request` through every stage.
    pub async fn compile(&self, request: &CompileRequest) -> Result<ResultBundle> {
        self.compile_with_progress(request, &SilentProgress).await
    }

    /// Run `request` through every stage, reporting progress.
    ///
    /// The bundle holds exactly one entry per registry stage, in registry
    /// order. A stage that fails to start, times out or exits non-zero is
    /// recorded in its own entry and never stops the others.
    ///
    /// # Errors
    ///
    /// [`SilInspectorError::InvalidRequest`] if the source is blank. No
    /// program is started in that case.
    #[instrument(skip_all, fields(request_id = %RequestId::new(), mode = ?self.mode))]
    pub async fn compile_with_progress(
        &self,
        request: &CompileRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<ResultBundle> {
        if request.is_blank() {
            return Err(SilInspectorError::invalid_request("Source is required"));
        }

        let start = Instant::now();
        info!(
            stages = self.registry.len(),
            source_len = request.source.len(),
            demangle = request.demangle,
            "starting compile pipeline"
        );

        let bundle = match self.mode {
            ExecutionMode::Sequential => self.run_sequential(request, progress).await,
            ExecutionMode::Parallel => self.run_parallel(request, progress).await,
        };

        progress.done(&bundle);

        info!(
            stages = bundle.len(),
            failed = bundle.iter().filter(|(_, r)| !r.succeeded()).count(),
            elapsed_ms = start.elapsed().as_millis(),
            "compile pipeline complete"
        );

        Ok(bundle)
    }

    async fn run_sequential(
        &self,
        request: &CompileRequest,
        progress: &dyn ProgressReporter,
    ) -> ResultBundle {
        let mut bundle = ResultBundle::with_capacity(self.registry.len());
        for spec in self.registry.specs() {
            progress.stage_started(spec.key(), spec.label());
            let result = self.run_stage(spec, request).await;
            progress.stage_finished(spec.key(), &result);
            bundle.insert(spec.key(), result);
        }
        bundle
    }

    async fn run_parallel(
        &self,
        request: &CompileRequest,
        progress: &dyn ProgressReporter,
    ) -> ResultBundle {
        let request = Arc::new(request.clone());
        let mut handles = Vec::with_capacity(self.registry.len());

        for (index, spec) in self.registry.specs().iter().enumerate() {
            progress.stage_started(spec.key(), spec.label());
            let pipeline = self.clone();
            let request = Arc::clone(&request);
            handles.push(tokio::spawn(async move {
                let spec = &pipeline.registry.specs()[index];
                pipeline.run_stage(spec, &request).await
            }));
        }

        // Join in spawn order so the bundle keeps registry order.
        let mut bundle = ResultBundle::with_capacity(handles.len());
        for (spec, handle) in self.registry.specs().iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(stage = spec.key(), error = %e, "stage task failed");
                    CommandResult {
                        label: spec.label().to_string(),
                        command: self.display_command(spec, &request),
                        exit_code: UNKNOWN_EXIT_CODE,
                        output: format!("stage task failed: {e}"),
                    }
                }
            };
            progress.stage_finished(spec.key(), &result);
            bundle.insert(spec.key(), result);
        }
        bundle
    }

    /// Run one stage and turn whatever happens into a [`CommandResult`].
    async fn run_stage(&self, spec: &ProgramSpec, request: &CompileRequest) -> CommandResult {
        let args = build_args(spec.base_args(), &request.options, &self.module_name);
        let command = quote::join(&args);

        let Some((program, rest)) = args.split_first() else {
            return CommandResult {
                label: spec.label().to_string(),
                command,
                exit_code: SPAWN_FAILURE_EXIT_CODE,
                output: format!("stage '{}' has no program to run", spec.key()),
            };
        };

        let (exit_code, output) = match self.runner.run(program, rest, &request.source).await {
            Ok(out) => {
                let exit_code = out.exit_code;
                let output = self
                    .demangler
                    .maybe_transform(out.into_visible_output(), request.demangle)
                    .await;
                (exit_code, output)
            }
            // Spawn failures and timeouts become this stage's result.
            Err(e) => {
                warn!(stage = spec.key(), error = %e, "stage did not complete");
                (synthetic_exit_code(&e), e.to_string())
            }
        };

        CommandResult {
            label: spec.label().to_string(),
            command,
            exit_code,
            output,
        }
    }

    fn display_command(&self, spec: &ProgramSpec, request: &CompileRequest) -> String {
        quote::join(&build_args(
            spec.base_args(),
            &request.options,
            &self.module_name,
        ))
    }
}

fn synthetic_exit_code(error: &SilInspectorError) -> i32 {
    match error {
        SilInspectorError::Timeout { .. } => TIMEOUT_EXIT_CODE,
        _ => SPAWN_FAILURE_EXIT_CODE,
    }
}
