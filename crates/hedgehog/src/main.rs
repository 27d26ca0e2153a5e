//! Hedgehog - fiducial-marker field localization

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "hedgehog")]
#[command(about = "Robot field localization from fiducial markers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run batch simulations, characterization or sweeps
    Cli {
        /// Pass remaining arguments to hedgehog-cli
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Serve the live dashboard
    Dash {
        /// Port to bind to
        #[arg(short, long, default_value_t = 8080)]
        port: u16,

        /// Host to bind to
        #[arg(short = 'H', long, default_value = "0.0.0.0")]
        host: String,

        /// JSON simulation config replayed into the pose slot
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON field layout
        #[arg(long)]
        field: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Cli { args }) => {
            let cli_args: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
            run_cli(&cli_args)
        }
        Some(Commands::Dash {
            port,
            host,
            config,
            field,
        }) => run_dash(port, &host, config, field),
        None => run_dash(8080, "0.0.0.0", None, None),
    }
}

fn run_cli(args: &[&str]) -> anyhow::Result<()> {
    let mut full_args = vec!["hedgehog-cli"];
    full_args.extend(args);

    if let Err(e) = hedgehog_cli::run_cli_main(&full_args) {
        eprintln!("CLI error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run_dash(port: u16, host: &str, config: Option<PathBuf>, field: Option<PathBuf>) -> anyhow::Result<()> {
    let config = hedgehog_cli::load_config(config.as_deref())?;
    let field = hedgehog_cli::load_field(field.as_deref())?;
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(hedgehog_dash::serve(addr, config, field))?;
    tracing::info!("dashboard stopped");
    Ok(())
}
