use clap::Parser;
use tracing_subscriber::EnvFilter;
use walletcache::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so they never land in the middle of a menu.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        None | Some(Commands::Open) => walletcache::cli::commands::open::execute(&cli),
        Some(Commands::Status) => walletcache::cli::commands::status::execute(&cli),
        Some(Commands::Recover) => walletcache::cli::commands::recover::execute(&cli),
        Some(Commands::Version) => walletcache::cli::commands::version::execute(),
        Some(Commands::Completions { ref shell }) => {
            walletcache::cli::commands::completions::execute(shell)
        }
    };

    if let Err(e) = result {
        walletcache::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
