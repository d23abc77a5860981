use super::ui;
use anyhow::{Context, Result};
use bosswatch::{
    Catalog, GroupState, TrackerConfig, TrackerService, format_timestamp, parse_kill_time,
    track_group,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "bosswatch")]
#[command(about = "Track boss respawn timers per server group")]
pub struct Cli {
    /// Catalog file with groups and bosses (overrides BOSSWATCH_CATALOG)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Directory for local data (overrides BOSSWATCH_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List configured groups
    Groups,
    /// Print the current status of every boss in a group
    Status {
        #[arg(long)]
        group: String,
    },
    /// Refresh the status table once per second until Ctrl-C
    Watch {
        #[arg(long)]
        group: String,
        /// Stop after this many refreshes
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// Record a kill, now or at a given time (HH:MM or full date-time)
    Record {
        #[arg(long)]
        group: String,
        #[arg(long)]
        boss: String,
        #[arg(long)]
        at: Option<String>,
    },
    /// Clear a boss's recorded kill
    Clear {
        #[arg(long)]
        group: String,
        #[arg(long)]
        boss: String,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    let mut config = TrackerConfig::from_env().context("Failed to read configuration")?;
    if let Some(path) = cli.catalog {
        config = config.catalog_path(path);
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    let catalog = Catalog::load(&config.catalog_path).with_context(|| {
        format!("Failed to load catalog '{}'", config.catalog_path.display())
    })?;

    match cli.command {
        Command::Groups => {
            print!("{}", ui::render_groups(&catalog));
            Ok(())
        }
        Command::Status { group } => {
            let service = open_service(&config, &catalog, &group)?;
            let state = service.load().await;
            print_status(&config, &catalog, &group, &state)?;
            finish(&service).await;
            Ok(())
        }
        Command::Watch { group, ticks } => watch(&config, &catalog, &group, ticks).await,
        Command::Record { group, boss, at } => {
            let now = Utc::now();
            let at = match at {
                Some(input) => parse_kill_time(&input, now, &config.display_offset)?,
                None => now,
            };

            catalog.boss(&boss)?;

            let service = open_service(&config, &catalog, &group)?;
            let state = service.load().await;
            let recorded = service.record_kill(&state, &boss, at).await;
            finish(&service).await;

            recorded?;
            println!(
                "Recorded {} kill at {}",
                boss,
                format_timestamp(at, &config.display_offset)
            );
            Ok(())
        }
        Command::Clear { group, boss } => {
            catalog.boss(&boss)?;

            let service = open_service(&config, &catalog, &group)?;
            let state = service.load().await;
            let cleared = service.clear(&state, &boss).await;
            finish(&service).await;

            cleared?;
            println!("Cleared {boss}");
            Ok(())
        }
    }
}

fn open_service(config: &TrackerConfig, catalog: &Catalog, group: &str) -> Result<TrackerService> {
    TrackerService::from_config(config, catalog, group)
        .with_context(|| format!("Failed to open group '{group}'"))
}

fn print_status(
    config: &TrackerConfig,
    catalog: &Catalog,
    group: &str,
    state: &GroupState,
) -> Result<()> {
    let now = Utc::now();
    let tracked = track_group(state, now, &config.display_offset);
    print!(
        "{}",
        ui::render_tracker(catalog.group(group)?, &tracked, now, &config.display_offset)
    );
    Ok(())
}

async fn watch(
    config: &TrackerConfig,
    catalog: &Catalog,
    group: &str,
    ticks: Option<u64>,
) -> Result<()> {
    let service = open_service(config, catalog, group)?;
    let group_config = catalog.group(group)?;
    let state = service.load().await;

    let mut remaining = ticks.map(|n| n.max(1));
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Utc::now();
                let tracked = track_group(&state, now, &config.display_offset);
                ui::redraw(&ui::render_tracker(group_config, &tracked, now, &config.display_offset));

                if let Some(left) = remaining.as_mut() {
                    *left -= 1;
                    if *left == 0 {
                        break;
                    }
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    finish(&service).await;
    Ok(())
}

/// Lets queued remote syncs complete before the process exits.
async fn finish(service: &TrackerService) {
    if service.remote_enabled() && !service.flush().await {
        eprintln!("Remote sync failed; changes are saved locally.");
    }
}
