use clap::Parser;
use planboard_client::cli::{self, Cli};
use planboard_client::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let filter = if cli.verbose { "debug" } else { "info" };
    if let Err(e) = logging::init(filter) {
        eprintln!("failed to initialize logger: {}", e);
    }
    log::debug!("[planboard.cli] logging to {}", logging::log_file_path());

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    cli::run(cli, &mut stdin.lock(), &mut stdout.lock()).await
}
