mod args;
mod commands;

use args::DriverArgs;
use clap::{Parser, Subcommand};
use commands::Context;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "speedyflow")]
#[command(about = "Provision and manage Docker hosts on SpeedyCloud", long_about = None)]
struct Cli {
    #[command(flatten)]
    driver: DriverArgs,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a machine
    Create {
        /// Machine name
        name: String,
    },
    /// Power on a machine
    Start {
        name: String,
        /// Wait until the machine is running
        #[arg(long)]
        wait: bool,
    },
    /// Power off a machine
    Stop {
        name: String,
        /// Wait until the machine is stopped
        #[arg(long)]
        wait: bool,
    },
    /// Reboot a machine
    Restart { name: String },
    /// Force a machine off
    Kill { name: String },
    /// Delete a machine and its local files
    Rm {
        name: String,
        /// Also delete the key pair registered with the provider
        #[arg(long)]
        purge_key: bool,
    },
    /// Show the machine state
    Status { name: String },
    /// Show the machine address
    Ip { name: String },
    /// Show the Docker URL of a machine
    Url { name: String },
    /// Show the stored machine record
    Inspect { name: String },
    /// List stored machines
    Ls,
    /// Show version information
    Version,
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    // Version needs no configuration
    if matches!(cli.command, Commands::Version) {
        println!("speedyflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let ctx = Context::new(cli.driver.into())?;

    match cli.command {
        Commands::Create { name } => commands::create::handle(&ctx, &name).await?,
        Commands::Start { name, wait } => commands::start::handle(&ctx, &name, wait).await?,
        Commands::Stop { name, wait } => commands::stop::handle(&ctx, &name, wait).await?,
        Commands::Restart { name } => commands::start::handle_restart(&ctx, &name).await?,
        Commands::Kill { name } => commands::stop::handle_kill(&ctx, &name).await?,
        Commands::Rm { name, purge_key } => commands::rm::handle(&ctx, &name, purge_key).await?,
        Commands::Status { name } => commands::status::handle(&ctx, &name).await?,
        Commands::Ip { name } => commands::ip::handle(&ctx, &name).await?,
        Commands::Url { name } => commands::ip::handle_url(&ctx, &name).await?,
        Commands::Inspect { name } => commands::status::handle_inspect(&ctx, &name).await?,
        Commands::Ls => commands::status::handle_ls(&ctx).await?,
        Commands::Version => {}
    }

    Ok(())
}
