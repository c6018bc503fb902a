use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sqlx::PgPool;

mod aggregate;
mod compare;
mod db;
mod distribute;
mod funnel;
mod models;
mod report;

use models::{ClientSummary, EntityCounters, Filter};

#[derive(Parser)]
#[command(name = "outreach-funnel")]
#[command(about = "Outbound campaign funnel and target tracking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import campaign summary rows from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List known clients
    Clients,
    /// Per-client counters compared against scaled targets
    QuickView {
        #[arg(long)]
        campaign: Option<String>,
        #[arg(long)]
        date_start: Option<NaiveDate>,
        #[arg(long)]
        date_end: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// The 11-stage pipeline funnel
    Funnel {
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        date_start: Option<NaiveDate>,
        #[arg(long)]
        date_end: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Scope-level metrics with previous-period deltas
    Performance {
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        campaign: Option<String>,
        #[arg(long)]
        date_start: Option<NaiveDate>,
        #[arg(long)]
        date_end: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Per-campaign breakdown with approximate reply/meeting attribution
    Campaigns {
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        date_start: Option<NaiveDate>,
        #[arg(long)]
        date_end: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Create or update per-day targets for a client
    SetTarget {
        client: String,
        #[arg(long)]
        emails: Option<f64>,
        #[arg(long)]
        prospects: Option<f64>,
        #[arg(long)]
        replies: Option<f64>,
        #[arg(long)]
        bounces: Option<f64>,
        #[arg(long)]
        meetings: Option<f64>,
    },
    /// List configured targets
    ShowTargets,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let pool = db::pool().await?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let imported = db::import_csv(pool, &csv).await?;
            println!("Imported {imported} summary rows from {}.", csv.display());
        }
        Commands::Clients => {
            let roster = db::fetch_client_roster(pool).await?;
            if roster.is_empty() {
                println!("No clients found.");
            }
            for client in roster {
                println!("- {client}");
            }
        }
        Commands::QuickView {
            campaign,
            date_start,
            date_end,
            json,
        } => {
            let filter = Filter::new(None, campaign, date_start, date_end);
            let clients = load_quick_view(pool, &filter).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&clients)?);
            } else {
                print!(
                    "{}",
                    report::render_quick_view(&clients, compare::range_days(&filter))
                );
            }
        }
        Commands::Funnel {
            client,
            date_start,
            date_end,
            json,
        } => {
            let filter = Filter::new(client, None, date_start, date_end);
            let (sources, engaged_leads) = db::fetch_funnel_sources(pool, &filter).await?;

            let mut counters = aggregate::total(&sources.campaign_rows);
            counters.merge(&aggregate::total(&sources.replies));
            counters.merge(&aggregate::total(&sources.meetings));
            let inputs = funnel::FunnelInputs {
                counters,
                stages: aggregate::count_stage_flags(&engaged_leads),
            };
            let stages = funnel::build_funnel(&inputs);

            if json {
                println!("{}", serde_json::to_string_pretty(&stages)?);
            } else {
                print!("{}", report::render_funnel(&stages));
            }
        }
        Commands::Performance {
            client,
            campaign,
            date_start,
            date_end,
            json,
        } => {
            let filter = Filter::new(client, campaign, date_start, date_end);
            let current = load_scope_metrics(pool, &filter).await?;
            let previous = match compare::previous_period(&filter) {
                Some(previous_filter) => Some(load_scope_metrics(pool, &previous_filter).await?),
                None => None,
            };

            if json {
                let payload = serde_json::json!({
                    "current": current,
                    "previous": previous,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                print!("{}", report::render_performance(&current, previous.as_ref()));
            }
        }
        Commands::Campaigns {
            client,
            date_start,
            date_end,
            json,
        } => {
            let filter = Filter::new(client, None, date_start, date_end);
            let sources = db::fetch_sources(pool, &filter).await?;

            let mut campaigns = aggregate::campaign_summaries(&sources.campaign_rows);
            let replies_by_client =
                aggregate::aggregate_by(&sources.replies, |r| r.client.clone());
            let meetings_by_client =
                aggregate::aggregate_by(&sources.meetings, |r| r.client.clone());
            distribute::apportion_client_counts(
                &mut campaigns,
                &replies_by_client,
                &meetings_by_client,
                &distribute::EvenSplit,
            );
            campaigns.sort_by(|a, b| b.counters.emails_sent.cmp(&a.counters.emails_sent));

            if json {
                println!("{}", serde_json::to_string_pretty(&campaigns)?);
            } else {
                print!("{}", report::render_campaigns(&campaigns));
            }
        }
        Commands::SetTarget {
            client,
            emails,
            prospects,
            replies,
            bounces,
            meetings,
        } => {
            let targets = models::Targets {
                emails_per_day: emails,
                prospects_per_day: prospects,
                replies_per_day: replies,
                bounces_per_day: bounces,
                meetings_per_day: meetings,
            };
            db::upsert_target(pool, &client, &targets).await?;
            println!("Targets saved for {client}.");
        }
        Commands::ShowTargets => {
            let targets = db::fetch_targets(pool).await?;
            print!("{}", report::render_targets(&targets));
        }
    }

    Ok(())
}

/// Per-client counters for every client in scope, from one full read per
/// collection, paired with their scaled targets.
async fn load_quick_view(pool: &PgPool, filter: &Filter) -> anyhow::Result<Vec<ClientSummary>> {
    let sources = db::fetch_sources(pool, filter).await?;

    let mut by_client = aggregate::aggregate_by(&sources.campaign_rows, |r| r.client.clone());
    aggregate::merge_maps(
        &mut by_client,
        aggregate::aggregate_by(&sources.replies, |r| r.client.clone()),
    );
    aggregate::merge_maps(
        &mut by_client,
        aggregate::aggregate_by(&sources.meetings, |r| r.client.clone()),
    );

    let targets = db::fetch_targets(pool).await?;
    let days = compare::range_days(filter);

    Ok(by_client
        .into_iter()
        .map(|(name, counters)| {
            let client_targets = targets.get(&name).cloned().unwrap_or_default();
            let (emails, prospects, replies, meetings) =
                compare::compare_all(&counters, &client_targets, days);
            ClientSummary {
                name,
                counters,
                emails,
                prospects,
                replies,
                meetings,
            }
        })
        .collect())
}

/// Everything the performance view shows for one scope, re-runnable against
/// a derived previous-period filter.
async fn load_scope_metrics(pool: &PgPool, filter: &Filter) -> anyhow::Result<EntityCounters> {
    let sources = db::fetch_sources(pool, filter).await?;
    let mut counters = aggregate::total(&sources.campaign_rows);
    counters.merge(&aggregate::total(&sources.replies));
    counters.merge(&aggregate::total(&sources.meetings));
    Ok(counters)
}
