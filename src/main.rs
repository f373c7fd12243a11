use anyhow::{Context, Result, bail};
use bootkeys::{KeyStore, crypto::MIN_KEY_BITS};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bootkeys")]
#[command(
    version,
    about = "Bootstrap RSA key pairs, JWK Sets and setup tokens for an auth service."
)]
struct Cli {
    /// Base directory; key material lives in <DIR>/keys (default: current directory)
    #[arg(long, global = true, value_name = "DIR", env = "BOOTKEYS_DIR")]
    dir: Option<PathBuf>,

    /// RSA modulus size for generated keys
    #[arg(
        long,
        global = true,
        value_name = "BITS",
        env = "BOOTKEYS_KEY_BITS",
        default_value_t = bootkeys::DEFAULT_KEY_BITS
    )]
    key_bits: usize,

    /// Log level used when RUST_LOG is not set
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        env = "BOOTKEYS_LOG_LEVEL",
        default_value = "warn"
    )]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn key_store(&self) -> Result<KeyStore> {
        let store = match &self.dir {
            Some(dir) => KeyStore::new(dir),
            None => KeyStore::from_current_dir().context("could not determine current directory")?,
        };
        Ok(store.with_key_bits(self.key_bits))
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generates signature and encryption key pairs, replacing existing ones
    GenerateKeys {
        /// Fail instead of overwriting existing key files
        #[arg(long, default_value_t = false)]
        no_overwrite: bool,
    },

    /// Prints the public JWK Set as JSON
    Jwks {
        #[arg(short, long, default_value_t = false)]
        /// Pretty-print the JSON
        pretty: bool,
    },

    /// Generates a new setup token and prints it once
    GenerateToken,

    /// Prints the stored setup token
    ShowToken,

    /// Shows which key files are present
    Info,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bootkeys={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let args = Cli::parse();
    init_tracing(&args.log_level);

    let store = args.key_store()?;
    match args.command {
        Commands::GenerateKeys { no_overwrite } => {
            if store.key_bits() < MIN_KEY_BITS {
                bail!("--key-bits must be at least {MIN_KEY_BITS}");
            }
            if no_overwrite {
                store.generate_key_pairs_exclusive()?;
            } else {
                store.generate_key_pairs()?;
            }
            println!("key pairs written to {}", store.directory().display());
        }
        Commands::Jwks { pretty } => {
            let keys = store.load_key_pairs()?;
            let json = if pretty {
                serde_json::to_string_pretty(&keys.jwks)?
            } else {
                serde_json::to_string(&keys.jwks)?
            };
            println!("{json}");
        }
        Commands::GenerateToken => {
            let token = store.generate_setup_token()?;
            println!("{token}");
        }
        Commands::ShowToken => {
            let token = store.load_setup_token()?;
            println!("{token}");
        }
        Commands::Info => {
            println!("directory: {}", store.directory().display());
            for file in store.status() {
                let state = if file.present { "present" } else { "missing" };
                println!("{:<8} {}", state, file.path.display());
            }
        }
    }

    Ok(())
}
