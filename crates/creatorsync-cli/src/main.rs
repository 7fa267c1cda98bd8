mod accounts;
mod sync;
mod vault;

use clap::{Parser, Subcommand};
use creatorsync_core::AppConfig;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use crate::accounts::AccountCommands;
use crate::sync::SyncCommands;
use crate::vault::VaultCommands;

#[derive(Debug, Parser)]
#[command(name = "creatorsync-cli")]
#[command(about = "Creator account sync operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Run sync and credential refresh passes
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Inspect and remove linked accounts
    Accounts {
        #[command(subcommand)]
        command: AccountCommands,
    },
    /// Encrypt or decrypt a credential value read from stdin
    Vault {
        #[command(subcommand)]
        command: VaultCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check database connectivity
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        None => {
            println!("creatorsync-cli: no command given, see --help");
            Ok(())
        }
        // Only needs the vault secret, not a database.
        Some(Commands::Vault { command }) => {
            init_tracing("warn")?;
            vault::run(&command)
        }
        Some(command) => run_with_database(command).await,
    }
}

async fn run_with_database(command: Commands) -> anyhow::Result<()> {
    let config = creatorsync_core::load_app_config()?;
    init_tracing(&config.log_level)?;
    let pool = connect(&config).await?;

    match command {
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = creatorsync_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            creatorsync_db::ping(&pool).await?;
            println!("database ok");
        }
        Commands::Sync { command } => sync::run(&pool, &config, command).await?,
        Commands::Accounts { command } => accounts::run(&pool, &config, command).await?,
        Commands::Vault { command } => vault::run(&command)?,
    }
    Ok(())
}

fn init_tracing(default_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let pool_config = creatorsync_db::PoolConfig::from_app_config(config);
    Ok(creatorsync_db::connect_pool(&config.database_url, pool_config).await?)
}
