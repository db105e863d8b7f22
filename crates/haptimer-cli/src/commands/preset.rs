use clap::Subcommand;
use haptimer_core::timer::format_clock;
use haptimer_core::{Config, HapticPattern, PresetStore, StaticEntitlement, Tier, TimerRecord};
use serde_json::json;

use super::{build_points, duration_arg, PointSpec};

#[derive(Subcommand)]
pub enum PresetAction {
    /// Save (or overwrite) a named timer
    Save {
        name: String,
        /// Countdown length (600, 90s, 10m, 1h30m, 10:00)
        #[arg(long, value_parser = duration_arg)]
        duration: u32,
        /// Haptic point as <time>[:<pattern>] (repeatable)
        #[arg(long = "point")]
        points: Vec<PointSpec>,
        /// Pattern for the completion point
        #[arg(long)]
        zero_pattern: Option<HapticPattern>,
        /// Colour tag as RRGGBB hex
        #[arg(long)]
        color: Option<String>,
    },
    /// List saved timers, most recently used first
    List,
    /// Print a saved timer as JSON
    Show { name: String },
    /// Delete a saved timer
    Delete { name: String },
}

fn check_color(tag: &str) -> Result<String, String> {
    let hex = tag.trim_start_matches('#');
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(hex.to_ascii_uppercase())
    } else {
        Err(format!("invalid colour '{tag}' (expected RRGGBB)"))
    }
}

pub fn run(action: PresetAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = PresetStore::open_default()?;

    match action {
        PresetAction::Save {
            name,
            duration,
            points,
            zero_pattern,
            color,
        } => {
            let config = Config::load()?;
            let tier = Tier::current(&StaticEntitlement(config.premium));
            let color = match color {
                Some(tag) => check_color(&tag)?,
                None => config.timer.default_color.clone(),
            };
            let set = build_points(
                duration,
                zero_pattern.unwrap_or(config.haptics.completion_pattern),
                &points,
                config.haptics.default_pattern,
                tier.point_capacity(),
            )?;
            let record = TimerRecord::capture(&name, &color, &set);
            store.save(record, tier.saved_timer_slots())?;
            println!("saved '{name}' ({})", format_clock(duration));
        }
        PresetAction::List => {
            let summaries: Vec<_> = store
                .list()?
                .into_iter()
                .map(|r| {
                    json!({
                        "name": r.name,
                        "duration": format_clock(r.duration_seconds),
                        "points": r.points.len(),
                        "color_tag": r.color_tag,
                        "last_used_at": r.last_used_at,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        PresetAction::Show { name } => {
            let record = store.get(&name)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        PresetAction::Delete { name } => {
            store.delete(&name)?;
            println!("deleted '{name}'");
        }
    }
    Ok(())
}
