use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::path::PathBuf;
use std::time::Duration;

use persona_config::{ConfigLoader, ExecutionPolicy, PersonaConfig};
use persona_core::{ExecutionPath, HostAdapterSet, PersonaError};
use persona_plugin::{HostSettings, PluginHost};

mod plugins;
mod serve;

/// 🔌 Persona — WASM plugins with host capabilities, direct or through a gateway
#[derive(Parser)]
#[command(name = "persona", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to persona.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the capability gateway HTTP server
    Serve {
        /// Address to listen on (overrides gateway.listen)
        #[arg(short = 'L', long)]
        listen: Option<String>,
        /// Plugin directory listed by /api/plugins (overrides plugins.plugin_dir)
        #[arg(long)]
        plugin_dir: Option<PathBuf>,
    },
    /// Work with installed plugins
    Plugin {
        #[command(subcommand)]
        action: PluginAction,
    },
    /// Read or write files through the host adapters
    Fs {
        #[command(subcommand)]
        action: FsAction,
    },
    /// Show host telemetry (load averages and memory)
    Status {
        /// Execution path: auto, direct_binary or gateway_fallback
        #[arg(long)]
        via: Option<ExecutionPolicy>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show current configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show version and build info
    Version,
    /// Generate shell completions for bash, zsh, or fish
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum PluginAction {
    /// List installed plugins
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show detailed info about an installed plugin
    Info {
        id: String,
        /// Execution path: auto, direct_binary or gateway_fallback
        #[arg(long)]
        via: Option<ExecutionPolicy>,
    },
    /// Call a string entry point of a plugin
    Call {
        id: String,
        /// Exported function to call
        #[arg(default_value = "greet")]
        export: String,
        /// Input string passed to the entry point
        #[arg(default_value = "world")]
        input: String,
        /// Execution path: auto, direct_binary or gateway_fallback
        #[arg(long)]
        via: Option<ExecutionPolicy>,
    },
}

#[derive(Subcommand)]
enum FsAction {
    /// Print a file
    Read {
        path: String,
        /// Execution path: auto, direct_binary or gateway_fallback
        #[arg(long)]
        via: Option<ExecutionPolicy>,
    },
    /// Create or truncate a file with the given content
    Write {
        path: String,
        content: String,
        /// Execution path: auto, direct_binary or gateway_fallback
        #[arg(long)]
        via: Option<ExecutionPolicy>,
    },
}

impl Cli {
    pub async fn run(self) -> persona_core::Result<()> {
        // Load config first so we can use it for log format
        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let config = config_loader.get();

        // Resolve log level: --verbose > --quiet > --log-level > config
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            self.log_level.as_deref().unwrap_or(&config.logging.level)
        };

        // Initialize tracing with appropriate format
        if config.logging.format == "json" {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
                )
                .json()
                .with_target(true)
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
                )
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }

        match self.command {
            Commands::Serve { listen, plugin_dir } => {
                serve::cmd_serve(config, listen, plugin_dir).await
            }
            Commands::Plugin { action } => plugins::cmd_plugin(config, action).await,
            Commands::Fs { action } => Self::cmd_fs(config, action).await,
            Commands::Status { via, json } => Self::cmd_status(config, via, json).await,
            Commands::Config { json } => Self::cmd_config(config, json),
            Commands::Version => Self::cmd_version(),
            Commands::Completions { shell } => Self::cmd_completions(shell),
        }
    }

    async fn cmd_fs(config: PersonaConfig, action: FsAction) -> persona_core::Result<()> {
        match action {
            FsAction::Read { path, via } => {
                let exec = execution_path(&config, via);
                let content = blocking(move || adapters(&config, exec)?.read_file(&path)).await?;
                print!("{content}");
            }
            FsAction::Write { path, content, via } => {
                let exec = execution_path(&config, via);
                let target = path.clone();
                blocking(move || adapters(&config, exec)?.write_file(&target, &content)).await?;
                println!("✅ Wrote {path} ({exec})");
            }
        }
        Ok(())
    }

    async fn cmd_status(
        config: PersonaConfig,
        via: Option<ExecutionPolicy>,
        json: bool,
    ) -> persona_core::Result<()> {
        let exec = execution_path(&config, via);
        let status = blocking(move || {
            let adapters = adapters(&config, exec)?;
            Ok(persona_core::SystemStatus {
                cpu_load: adapters.get_cpu_load()?,
                free_memory: adapters.get_free_memory()?,
                total_memory: adapters.get_total_memory()?,
            })
        })
        .await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&status)?);
            return Ok(());
        }

        let [one, five, fifteen] = status.cpu_load;
        println!("\x1b[1mHost status\x1b[0m ({exec})");
        println!("  Load average: {one:.2} {five:.2} {fifteen:.2}");
        println!(
            "  Memory:       {} free / {} total",
            format_bytes(status.free_memory),
            format_bytes(status.total_memory)
        );
        Ok(())
    }

    fn cmd_config(config: PersonaConfig, json: bool) -> persona_core::Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config).map_err(|e| PersonaError::Config(e.to_string()))?
            );
        }
        Ok(())
    }

    fn cmd_version() -> persona_core::Result<()> {
        println!("🔌 Persona v{}", env!("CARGO_PKG_VERSION"));
        println!("   Contract: {} capabilities", persona_core::CONTRACT.len());
        println!("   Target: {}", std::env::consts::ARCH);
        println!("   OS: {}", std::env::consts::OS);
        #[cfg(debug_assertions)]
        println!("   Profile: debug");
        #[cfg(not(debug_assertions))]
        println!("   Profile: release");
        Ok(())
    }

    fn cmd_completions(shell: Shell) -> persona_core::Result<()> {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "persona", &mut std::io::stdout());
        Ok(())
    }
}

/// The execution path for this invocation: `--via` wins over the config policy.
fn execution_path(config: &PersonaConfig, via: Option<ExecutionPolicy>) -> ExecutionPath {
    match via {
        Some(policy) => {
            let mut config = config.clone();
            config.plugins.execution_path = policy;
            config.execution_path()
        }
        None => config.execution_path(),
    }
}

fn plugin_host(config: &PersonaConfig) -> persona_core::Result<PluginHost> {
    let gateway_timeout =
        (config.gateway.timeout_secs > 0).then(|| Duration::from_secs(config.gateway.timeout_secs));
    PluginHost::new(
        &config.plugins.plugin_dir,
        config.environment(),
        HostSettings {
            fuel: config.plugins.fuel,
            gateway_timeout,
        },
    )
}

/// Adapter set for `path`. Builds a blocking HTTP client on the gateway path,
/// so call it from [`blocking`] only.
fn adapters(
    config: &PersonaConfig,
    path: ExecutionPath,
) -> persona_core::Result<std::sync::Arc<dyn HostAdapterSet>> {
    plugin_host(config)?.adapters(path)
}

/// Run plugin and adapter work on the blocking pool.
async fn blocking<T, F>(f: F) -> persona_core::Result<T>
where
    F: FnOnce() -> persona_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PersonaError::Other(anyhow::anyhow!("blocking task failed: {e}")))?
}

/// Human-readable byte count.
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
