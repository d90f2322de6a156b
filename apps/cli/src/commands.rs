//! CLI command definitions, routing, and tracing setup.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use silinspector_core::{Pipeline, ProgramRegistry, ProgressReporter, quote};
use silinspector_shared::{
    AppConfig, CommandResult, CompileOptions, CompileRequest, CompileResponse, ExecutionMode,
    PipelineConfig, ResultBundle, init_config, load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// SIL Inspector: view the parse tree, AST, SIL, IR and assembly of Swift code.
#[derive(Parser)]
#[command(
    name = "silinspector",
    version,
    about = "Run Swift source through every compiler stage and inspect the output.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.silinspector/silinspector.toml).
    #[arg(long, global = true, env = "SILINSPECTOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Result output format for `compile`.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Serve the inspector HTTP API and front end.
    Serve {
        /// Listen address (overrides config).
        #[arg(long, env = "SILINSPECTOR_ADDR")]
        addr: Option<String>,

        /// Directory with the built front end (overrides config).
        #[arg(long)]
        static_dir: Option<String>,

        /// Run a request's stages concurrently.
        #[arg(long)]
        parallel: bool,
    },

    /// Compile a source file locally and print each stage.
    Compile {
        /// Swift source file, or `-` for stdin.
        file: String,

        /// Demangle symbols in every stage's output.
        #[arg(long)]
        demangle: bool,

        /// Pass `-O`.
        #[arg(short = 'O', long)]
        optimize: bool,

        /// Pass `-whole-module-optimization`.
        #[arg(long)]
        module_optimize: bool,

        /// Parse the file as a library (`-parse-as-library`).
        #[arg(long)]
        parse_as_library: bool,

        /// Only run these stages (repeatable). Defaults to all.
        #[arg(long = "stage")]
        stages: Vec<String>,

        /// Output format.
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Run stages concurrently.
        #[arg(long)]
        parallel: bool,

        /// Per-stage time limit in seconds, 0 for none (overrides config).
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// List the compiler stages and their commands.
    Stages,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "silinspector=info",
        1 => "silinspector=debug,tower_http=debug",
        _ => "silinspector=trace,tower_http=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Serve {
            addr,
            static_dir,
            parallel,
        } => cmd_serve(&config, addr, static_dir, parallel).await,
        Command::Compile {
            file,
            demangle,
            optimize,
            module_optimize,
            parse_as_library,
            stages,
            format,
            parallel,
            timeout,
        } => {
            let request = CompileRequest {
                source: read_source(&file)?,
                demangle,
                options: CompileOptions {
                    optimize,
                    module_optimize,
                    parse_as_library,
                },
            };
            let mut pipeline_config = PipelineConfig::from(&config);
            if let Some(secs) = timeout {
                pipeline_config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
            }
            if parallel {
                pipeline_config.mode = ExecutionMode::Parallel;
            }
            cmd_compile(&pipeline_config, &request, &stages, format).await
        }
        Command::Stages => cmd_stages(&config),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_serve(
    config: &AppConfig,
    addr: Option<String>,
    static_dir: Option<String>,
    parallel: bool,
) -> Result<()> {
    let mut pipeline_config = PipelineConfig::from(config);
    if parallel {
        pipeline_config.mode = ExecutionMode::Parallel;
    }
    let addr = addr.unwrap_or_else(|| config.server.addr.clone());
    let static_dir = static_dir.unwrap_or_else(|| config.server.static_dir.clone());

    info!(
        compiler = %pipeline_config.compiler,
        demangler = %pipeline_config.demangler,
        mode = ?pipeline_config.mode,
        static_dir = %static_dir,
        "configured compile pipeline"
    );

    let pipeline = Arc::new(Pipeline::from_config(&pipeline_config));
    let app = silinspector_server::router(pipeline, static_dir);
    silinspector_server::serve(&addr, app).await?;
    Ok(())
}

async fn cmd_compile(
    config: &PipelineConfig,
    request: &CompileRequest,
    stages: &[String],
    format: OutputFormat,
) -> Result<()> {
    let registry = select_stages(ProgramRegistry::swift(&config.compiler), stages)?;
    let pipeline = Pipeline::new(Arc::new(registry), config);

    let reporter = CliProgress::new();
    let bundle = pipeline
        .compile_with_progress(request, &reporter)
        .await
        .wrap_err("compile failed")?;

    match format {
        OutputFormat::Json => {
            let response = CompileResponse { results: bundle };
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => print_bundle(&bundle),
    }

    Ok(())
}

fn cmd_stages(config: &AppConfig) -> Result<()> {
    let registry = ProgramRegistry::swift(&config.toolchain.compiler);
    let width = registry.keys().map(str::len).max().unwrap_or(0);
    for spec in registry.specs() {
        println!(
            "{:<width$}  {:<14}  {}",
            spec.key(),
            spec.label(),
            quote::join(spec.base_args()),
        );
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read source from a file path, or stdin for `-`.
fn read_source(file: &str) -> Result<String> {
    if file == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .wrap_err("failed to read source from stdin")?;
        return Ok(source);
    }
    std::fs::read_to_string(file).wrap_err_with(|| format!("failed to read '{file}'"))
}

/// Keep only the requested stages, in registry order. Empty keeps all.
fn select_stages(registry: ProgramRegistry, wanted: &[String]) -> Result<ProgramRegistry> {
    if wanted.is_empty() {
        return Ok(registry);
    }
    if let Some(unknown) = wanted.iter().find(|k| registry.get(k).is_none()) {
        let known = registry.keys().collect::<Vec<_>>().join(", ");
        return Err(eyre!("unknown stage '{unknown}': expected one of {known}"));
    }
    let specs = registry
        .specs()
        .iter()
        .filter(|s| wanted.iter().any(|k| k == s.key()))
        .cloned()
        .collect();
    Ok(ProgramRegistry::new(specs)?)
}

fn print_bundle(bundle: &ResultBundle) {
    for (key, result) in bundle.iter() {
        println!("== {} ({key}) ==", result.label);
        println!("$ {}", result.command);
        println!("exit code: {}", result.exit_code);
        println!();
        println!("{}", result.output.trim_end());
        println!();
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn stage_started(&self, _key: &str, label: &str) {
        self.spinner.set_message(format!("Running {label}"));
    }

    fn stage_finished(&self, _key: &str, result: &CommandResult) {
        if !result.succeeded() {
            self.spinner
                .set_message(format!("{} exited with {}", result.label, result.exit_code));
        }
    }

    fn done(&self, _bundle: &ResultBundle) {
        self.spinner.finish_and_clear();
    }
}
