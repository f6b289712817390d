use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use clipshelf::config::DEFAULT_CONFIG_PATH;
use clipshelf::{hash_password, Config, WebServer};

#[derive(Parser, Debug)]
#[command(name = "clipshelf", version, about = "Audio clip library server")]
struct Args {
    /// Configuration file (TOML); must exist when given.
    /// Defaults to `config.toml` if present.
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print an Argon2 hash for `auth.password_hash`
    HashPassword {
        /// Password to hash; read from stdin when omitted
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(args.config.as_deref()).await,
        Command::HashPassword { password } => print_hash(password),
    }
}

fn load_config(path: Option<&Path>) -> clipshelf::Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => match Config::load_optional(DEFAULT_CONFIG_PATH)? {
            Some(config) => config,
            None => {
                eprintln!("{DEFAULT_CONFIG_PATH} not found, using default configuration.");
                Config::default()
            }
        },
    };
    config.apply_env_overrides();
    Ok(config)
}

async fn serve(config_path: Option<&Path>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            let shown = config_path.unwrap_or(Path::new(DEFAULT_CONFIG_PATH));
            eprintln!("Failed to load {}: {e}", shown.display());
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = clipshelf::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        clipshelf::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    info!(
        "clipshelf {} starting on {}:{}",
        env!("CARGO_PKG_VERSION"),
        config.server.host,
        config.server.port
    );

    let server = match WebServer::new(&config) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Web server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_hash(password: Option<String>) -> ExitCode {
    let password = match password {
        Some(password) => password,
        None => {
            let mut line = String::new();
            if let Err(e) = std::io::stdin().lock().read_line(&mut line) {
                eprintln!("Failed to read password: {e}");
                return ExitCode::FAILURE;
            }
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    match hash_password(&password) {
        Ok(hash) => {
            println!("{hash}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
