use anyhow::Result;
use clap::{Parser, Subcommand};
use foodshare_catalog::{time_remaining_label, FilterCriteria};
use foodshare_core::{DonorType, FoodCategory, ListingId, UserId};
use foodshare_market::{BrowseQuery, MarketConfig, MarketService};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "foodshare-cli")]
#[command(about = "FoodShare marketplace command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the web API and dashboard.
    Serve,
    /// List claimable listings from the seed data.
    Browse {
        #[arg(long, short)]
        query: Option<String>,
        #[arg(long)]
        category: Option<FoodCategory>,
        #[arg(long)]
        max_distance: Option<f64>,
        #[arg(long)]
        donor_type: Option<DonorType>,
    },
    /// Claim a listing against a freshly loaded seed. Nothing is written back.
    Claim { listing_id: String, user_id: String },
    Stats,
    /// Count listings whose window has closed in a freshly loaded seed. Nothing is
    /// written back.
    Expire,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = MarketConfig::from_env();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            foodshare_web::serve(config).await?;
        }
        Commands::Browse {
            query,
            category,
            max_distance,
            donor_type,
        } => {
            let market = MarketService::from_config(config).await?;
            let page = market
                .browse(&BrowseQuery {
                    criteria: FilterCriteria {
                        search_text: query,
                        category,
                        max_distance_km: max_distance,
                        donor_type,
                        ..Default::default()
                    },
                    viewer: None,
                    page: None,
                    per_page: None,
                })
                .await;
            let now = market.now();
            for listing in &page.items {
                let distance = listing
                    .location
                    .distance_km
                    .map(|d| format!("{d:.1} km"))
                    .unwrap_or_else(|| "?".to_string());
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    listing.id,
                    listing.title,
                    listing.donor.name,
                    distance,
                    time_remaining_label(listing.available_until, now)
                );
            }
            println!(
                "page {}/{} ({} listings)",
                page.page, page.total_pages, page.total_items
            );
        }
        Commands::Claim {
            listing_id,
            user_id,
        } => {
            let market = MarketService::from_config(config).await?;
            let listing = market
                .claim(&ListingId::new(listing_id), &UserId::new(user_id))
                .await?;
            println!(
                "claimed: id={} title={} by={}",
                listing.id,
                listing.title,
                listing
                    .claimed_by()
                    .map(ToString::to_string)
                    .unwrap_or_default()
            );
        }
        Commands::Stats => {
            let market = MarketService::from_config(config).await?;
            let stats = market.stats().await;
            println!(
                "listings={} available={} claimed={} expired={} meals={} co2_saved_kg={} active_today={} partners={}",
                stats.total_listings,
                stats.available,
                stats.claimed,
                stats.expired,
                stats.total_meals,
                stats.co2_saved_kg,
                stats.active_today,
                stats.partners
            );
        }
        Commands::Expire => {
            let market = MarketService::from_config(config).await?;
            let expired = market.expire_stale().await;
            info!(expired, "expiry sweep complete");
            println!("{expired} listings past their window (dry run, seed unchanged)");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn store_changing_commands_say_they_are_not_persisted() {
        Cli::command().debug_assert();
        let cli = Cli::command();
        for name in ["claim", "expire"] {
            let about = cli
                .find_subcommand(name)
                .and_then(|c| c.get_about())
                .map(ToString::to_string)
                .unwrap_or_default();
            assert!(about.contains("Nothing is written back"), "{name}: {about}");
        }
    }

    #[test]
    fn defaults_to_serve() {
        let cli = Cli::try_parse_from(["foodshare-cli"]).expect("parse");
        assert!(matches!(cli.command.unwrap_or(Commands::Serve), Commands::Serve));
    }
}
