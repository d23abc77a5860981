use bosswatch::{
    Catalog, GroupConfig, TrackedBoss, format_countdown, format_respawn_interval,
    format_timestamp, status_label,
};
use chrono::{DateTime, FixedOffset, Utc};
use std::fmt::Write;

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

pub fn render_groups(catalog: &Catalog) -> String {
    let mut out = String::new();
    for (key, group) in catalog.groups() {
        let _ = writeln!(out, "{} {:<12} ({})", group.icon, group.name, key);
    }
    if out.is_empty() {
        out.push_str("No groups configured.\n");
    }
    out
}

pub fn render_tracker(
    group: &GroupConfig,
    tracked: &[TrackedBoss],
    now: DateTime<Utc>,
    offset: &FixedOffset,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}  |  {}", group.icon, group.name, format_timestamp(now, offset));
    let _ = writeln!(
        out,
        "{:<16} {:>8}  {:<6} {:<20} {:>10}",
        "Boss", "Respawn", "Status", "Last killed", "Countdown"
    );
    out.push_str(&"-".repeat(66));
    out.push('\n');

    for boss in tracked {
        let last_killed = boss
            .record
            .last_killed
            .map(|at| format_timestamp(at, offset))
            .unwrap_or_else(|| "未記錄".to_string());
        let countdown = match boss.status.time_until_respawn_secs {
            Some(secs) if secs > 0 => format_countdown(secs),
            _ => "可擊殺".to_string(),
        };
        let _ = writeln!(
            out,
            "{:<16} {:>8}  {:<6} {:<20} {:>10}",
            boss.record.name,
            format_respawn_interval(boss.record.respawn_minutes),
            status_label(boss.status.status),
            last_killed,
            countdown
        );
    }
    out
}

pub fn redraw(frame: &str) {
    print!("{CLEAR_SCREEN}{frame}");
}
