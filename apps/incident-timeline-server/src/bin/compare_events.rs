use anyhow::{Context, Result};
use clap::Parser;
use incident_timeline_server::services::event_comparison::{
    align_events, store, HourDifference, IncidentAllowlist, IncidentFilter, NonTestIncidents,
};
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(
    about = "Ops tool: run an event incident timeline comparison against the database and print the JSON result."
)]
struct Args {
    #[arg(long, default_value = "/etc/incident-timeline/config.json")]
    config: String,
    #[arg(long)]
    database_url: Option<String>,
    /// Event ids to compare (repeat or comma-separate).
    #[arg(long = "event-id", value_delimiter = ',', required = true)]
    event_ids: Vec<i64>,
    /// Restrict plotted incidents to these ids (line-graph variant).
    #[arg(long = "incident-id", value_delimiter = ',')]
    incident_ids: Vec<i64>,
    #[arg(long, default_value_t = 24)]
    hour_difference: i64,
    #[arg(long)]
    company_id: Option<i64>,
    #[arg(long, default_value_t = 100_000)]
    max_chunks: usize,
    /// Print zero points and the shared max hour to stderr.
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    database_url: Option<String>,
}

fn normalize_database_url(url: String) -> String {
    if let Some(stripped) = url.strip_prefix("postgresql+psycopg://") {
        return format!("postgresql://{stripped}");
    }
    url
}

fn resolve_database_url(args: &Args) -> Result<String> {
    if let Some(url) = args
        .database_url
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return Ok(normalize_database_url(url.to_string()));
    }
    if let Ok(url) = std::env::var("TIMELINE_DATABASE_URL") {
        if !url.trim().is_empty() {
            return Ok(normalize_database_url(url.trim().to_string()));
        }
    }
    let contents = std::fs::read_to_string(&args.config)
        .with_context(|| format!("failed to read config file {}", args.config))?;
    let parsed: ConfigFile = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", args.config))?;
    parsed
        .database_url
        .map(normalize_database_url)
        .context("database_url missing; pass --database-url or set TIMELINE_DATABASE_URL")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let width = HourDifference::new(args.hour_difference)?;
    let database_url = resolve_database_url(&args)?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .context("failed to connect to database")?;

    let allowlist = IncidentAllowlist::new(args.incident_ids.iter().copied());
    let filter: &dyn IncidentFilter = if allowlist.is_empty() {
        &NonTestIncidents
    } else {
        &allowlist
    };

    let events = store::fetch_events(&pool, &args.event_ids, args.company_id)
        .await
        .context("failed to load events")?;
    let incidents = store::fetch_incidents(&pool, &args.event_ids)
        .await
        .context("failed to load incidents")?;

    let alignment = align_events(
        &args.event_ids,
        &events,
        &incidents,
        filter,
        width,
        args.max_chunks,
    )?;

    if args.verbose {
        eprintln!("filter: {}", filter.fingerprint());
        eprintln!("max_hour: {:.3}", alignment.max_hour);
        for (event_id, zero_point) in &alignment.zero_points {
            let zero_point = zero_point
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_else(|| "-".to_string());
            eprintln!("event {event_id}: zero_point={zero_point}");
        }
    }

    println!("{}", serde_json::to_string_pretty(&alignment.result)?);
    Ok(())
}
