use clap::{Parser, Subcommand};

use workpulse::date_util::format_time_spent;
use workpulse::processor::ProcessingResult;
use workpulse::{Period, ProcessingOptions, SummaryFormat, SummaryRequest, SummaryResponse, WorkPulse};

#[derive(Parser)]
#[command(name = "workpulse", about = "Team activity metrics and summaries")]
struct Cli {
    /// Database path (default: ~/.workpulse/workpulse.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a JSON export of tracker issues
    Import {
        /// Path to the export file (array of issues or {"issues": [...]})
        file: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compute activity metrics over a period
    Metrics {
        /// Period (e.g. 2025, 2025-Q1, 2025-01, 2025-W05, 30d, all)
        #[arg(long, default_value = "all")]
        period: String,
        /// Break down by user
        #[arg(long)]
        by_user: bool,
        /// Break down by priority
        #[arg(long)]
        by_priority: bool,
        /// Break down by status
        #[arg(long)]
        by_status: bool,
        /// Every breakdown plus trends and velocity
        #[arg(long)]
        all: bool,
        /// Weekly trend analysis
        #[arg(long)]
        trends: bool,
        /// Per-user velocity
        #[arg(long)]
        velocity: bool,
        /// Ignore activities with less logged time (seconds)
        #[arg(long, value_name = "SECS")]
        min_time: Option<u64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a narrative summary for a period
    Summarize {
        /// Period (e.g. 2025, 2025-Q1, 2025-01, 2025-W05, 30d, all)
        #[arg(long, default_value = "all")]
        period: String,
        /// Summary title
        #[arg(long)]
        title: Option<String>,
        /// Include the raw processing data
        #[arg(long)]
        detailed: bool,
        /// Maximum number of user insights (0 = everyone)
        #[arg(long, default_value = "0")]
        max_users: usize,
        /// Skip trend analysis
        #[arg(long)]
        no_trends: bool,
        /// Extra section: priority_breakdown, status_summary, velocity_analysis, time_analysis
        #[arg(long = "section", value_name = "NAME")]
        sections: Vec<String>,
        /// Ignore activities with less logged time (seconds)
        #[arg(long, value_name = "SECS")]
        min_time: Option<u64>,
        /// Also produce an AI-written narrative
        #[arg(long)]
        ai: bool,
        /// Regenerate the AI narrative even if cached
        #[arg(long)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show what the local store holds
    Status,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => workpulse::Database::open_at(path).await?,
        None => workpulse::Database::open().await?,
    };
    let wp = WorkPulse::new(db);

    match cli.command {
        Commands::Import { file, json } => {
            let report = wp.import_file(&file).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{}: {} imported, {} rejected ({:?})",
                    report.source, report.imported, report.rejected, report.status
                );
                for e in &report.errors {
                    println!("  - {e}");
                }
            }
        }
        Commands::Metrics {
            period,
            by_user,
            by_priority,
            by_status,
            all,
            trends,
            velocity,
            min_time,
            json,
        } => {
            let period = Period::parse(&period)?;
            let options = ProcessingOptions {
                group_by_user: by_user || all,
                group_by_priority: by_priority || all,
                group_by_status: by_status || all,
                include_trend_analysis: trends || all,
                calculate_velocity: velocity || all,
                minimum_time_spent: resolve_min_time(&wp, min_time).await?,
                ..ProcessingOptions::default()
            };
            let result = wp.process(&period, &options).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Activity Metrics ({})", period.label());
                print_metrics(&result);
            }
        }
        Commands::Summarize {
            period,
            title,
            detailed,
            max_users,
            no_trends,
            sections,
            min_time,
            ai,
            force,
            json,
        } => {
            let period = Period::parse(&period)?;
            let options = ProcessingOptions {
                include_trend_analysis: !no_trends,
                minimum_time_spent: resolve_min_time(&wp, min_time).await?,
                ..ProcessingOptions::all()
            };
            let request = SummaryRequest {
                title,
                period: period.label(),
                format: if detailed {
                    SummaryFormat::Detailed
                } else {
                    SummaryFormat::Executive
                },
                max_users,
                include_trends: !no_trends,
                custom_sections: sections,
            };
            let summary = wp.summarize(&period, &options, request).await?;

            let narrative = if ai {
                let agent = workpulse::llm::create_agent(wp.db()).await?;
                Some(
                    workpulse::llm::narrative::polish_summary(
                        wp.db(),
                        &agent,
                        &period.to_key(),
                        &summary,
                        force,
                    )
                    .await?,
                )
            } else {
                None
            };

            if json {
                let out = serde_json::json!({ "summary": summary, "ai_narrative": narrative });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print_summary(&summary);
                if let Some(n) = narrative {
                    println!("\nAI Narrative: {}", n.headline);
                    println!("\n{}", n.narrative);
                    if !n.key_points.is_empty() {
                        println!("\nKey points:");
                        for p in &n.key_points {
                            println!("  - {p}");
                        }
                    }
                }
            }
        }
        Commands::Config { action } => {
            handle_config(&wp, action).await?;
        }
        Commands::Status => {
            print_status(&wp).await?;
        }
    }

    Ok(())
}

async fn resolve_min_time(wp: &WorkPulse, flag: Option<u64>) -> anyhow::Result<u64> {
    match flag {
        Some(secs) => Ok(secs),
        None => Ok(wp.minimum_time_spent().await?.unwrap_or(0)),
    }
}

async fn handle_config(wp: &WorkPulse, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match wp.config_get(&key).await? {
            Some(v) => println!("{key} = {v}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            wp.config_set(&key, &value).await?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            let items = wp.config_list().await?;
            if items.is_empty() {
                println!("No configuration set.");
            } else {
                for (k, v) in items {
                    println!("{k} = {v}");
                }
            }
        }
    }
    Ok(())
}

async fn print_status(wp: &WorkPulse) -> anyhow::Result<()> {
    let status = wp.status().await?;
    println!("Store Status");
    println!("  Activities:  {}", status.activities);
    println!("  Users:       {}", status.users);
    if let (Some(first), Some(last)) = (&status.first_created, &status.last_updated) {
        println!("  Span:        {first} .. {last}");
    }
    match &status.last_import {
        Some(i) => println!(
            "  Last import: {} ({}, {} imported, {} rejected) at {}",
            i.source, i.status, i.imported, i.rejected, i.imported_at
        ),
        None => println!("  Last import: never"),
    }
    Ok(())
}

fn print_metrics(result: &ProcessingResult) {
    let s = &result.summary;
    println!("  Activities:      {}", s.total_activities);
    println!("  Users:           {}", s.total_users);
    println!("  Time logged:     {}", format_time_spent(s.total_time_spent));
    println!("  Completion rate: {:.1}%", s.completion_rate);
    println!("  Productivity:    {:.1}/100", s.productivity_score);
    if let Some(ref user) = s.most_active_user {
        println!("  Most active:     {user}");
    }
    if let Some(ref p) = s.top_priority {
        println!("  Top priority:    {p}");
    }

    if let Some(users) = &result.user_metrics {
        let mut rows: Vec<_> = users.values().collect();
        rows.sort_by_key(|u| u.productivity_rank);
        println!("\nBy user:");
        for u in rows {
            println!(
                "  #{} {}: {} activities, {:.1}% complete, {}",
                u.productivity_rank,
                u.display_name,
                u.total_activities,
                u.completion_rate,
                format_time_spent(u.total_time_spent)
            );
        }
    }
    if let Some(priorities) = &result.priority_metrics {
        println!("\nBy priority:");
        for p in priorities.values() {
            println!(
                "  {}: {} activities, {:.1}% complete",
                p.priority, p.count, p.completion_rate
            );
        }
    }
    if let Some(statuses) = &result.status_metrics {
        println!("\nBy status:");
        for s in statuses.values() {
            println!(
                "  {}: {} activities, {} users, {} recent",
                s.status,
                s.count,
                s.users.len(),
                s.recent_changes
            );
        }
    }
    if let Some(t) = &result.trend_analysis {
        println!("\nTrends:");
        println!("  Overall:      {}", t.overall_trend);
        println!("  Velocity:     {}", t.velocity_trend);
        println!("  Productivity: {}", t.productivity_trend);
        for w in &t.time_ranges {
            println!(
                "  {}: {} activities, {} completed",
                w.label, w.activity_count, w.completed_count
            );
        }
    }
    if let Some(v) = &result.velocity_metrics {
        println!("\nVelocity:");
        println!("  Average: {:.2}/day", v.average_velocity);
        println!("  Current: {:.2}/day", v.current_velocity);
    }
}

fn print_summary(summary: &SummaryResponse) {
    println!("{}", summary.title);
    if !summary.date_range.is_empty() {
        println!("{}", summary.date_range);
    }
    println!("\n{}", summary.executive_summary);

    for (heading, items) in [
        ("Highlights", &summary.highlights),
        ("Concerns", &summary.concerns),
        ("Recommendations", &summary.recommendations),
    ] {
        if !items.is_empty() {
            println!("\n{heading}:");
            for item in items {
                println!("  - {item}");
            }
        }
    }

    if !summary.user_insights.is_empty() {
        println!("\nTeam:");
        for u in &summary.user_insights {
            println!(
                "  #{} {}: {:.1}% complete, {} activities, {}",
                u.productivity_rank,
                u.display_name,
                u.completion_rate,
                u.total_activities,
                u.total_time_spent
            );
        }
    }

    if let Some(t) = &summary.trends {
        println!("\nTrends:");
        for line in t.lines() {
            println!("  - {line}");
        }
    }

    for (name, body) in &summary.custom_sections {
        println!("\n[{name}]\n{body}");
    }
}
