use std::sync::Arc;

use clap::Subcommand;
use creatorsync_core::{AppConfig, Platform, SocialAccount};
use creatorsync_sync::{AllowAllOwners, Components};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Subcommand)]
pub enum AccountCommands {
    /// List every account linked by an owner, including deactivated ones
    List {
        #[arg(long)]
        owner: Uuid,
    },
    /// Link a scrape-only account by public handle
    Link {
        #[arg(long)]
        owner: Uuid,
        /// Platform code of a scrape-only platform
        #[arg(long)]
        platform: Platform,
        #[arg(long)]
        handle: String,
    },
    /// Remove an account and its posts
    Disconnect {
        /// Account id
        id: i64,
    },
}

pub(crate) async fn run(
    pool: &PgPool,
    config: &AppConfig,
    command: AccountCommands,
) -> anyhow::Result<()> {
    let components = Components::build(pool.clone(), config)?;
    match command {
        AccountCommands::List { owner } => {
            let accounts = components.service.get_connected_accounts(owner).await?;
            if accounts.is_empty() {
                println!("owner {owner} has no linked accounts");
                return Ok(());
            }
            for account in &accounts {
                println!("{}", summary_line(account));
            }
        }
        AccountCommands::Link {
            owner,
            platform,
            handle,
        } => {
            // Operators act on behalf of the owner, so every owner is eligible.
            let account = components
                .linker(Arc::new(AllowAllOwners))
                .link_scrape_only(owner, platform, &handle)
                .await?;
            println!("{}", summary_line(&account));
        }
        AccountCommands::Disconnect { id } => {
            components.service.disconnect(id).await?;
            println!("account {id} disconnected");
        }
    }
    Ok(())
}

fn summary_line(account: &SocialAccount) -> String {
    let status = if account.is_active {
        "active".to_string()
    } else {
        format!(
            "inactive ({})",
            account.deactivated_reason.as_deref().unwrap_or("no reason")
        )
    };
    let synced = account.last_synced_at.map_or_else(
        || "never".to_string(),
        |at| at.format("%Y-%m-%d %H:%M").to_string(),
    );
    format!(
        "{:>6}  {:<20} @{:<24} followers={:<9} engagement={:>6.2}%  synced={synced}  {status}",
        account.id,
        account.platform,
        account.external_handle,
        account.metrics.follower_count,
        account.metrics.engagement_rate,
    )
}
