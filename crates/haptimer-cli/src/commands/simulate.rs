use std::time::{Duration, Instant};

use clap::Args;
use haptimer_core::error::Result;
use haptimer_core::{Config, CountdownEngine, CountdownState, HapticPattern, StaticEntitlement, Tier};
use serde_json::json;

use super::{build_points, duration_arg, PointSpec};

#[derive(Args)]
pub struct SimulateArgs {
    /// Countdown length (600, 90s, 10m, 1h30m, 10:00)
    #[arg(long, value_parser = duration_arg)]
    duration: u32,
    /// Haptic point as <time>[:<pattern>] (repeatable)
    #[arg(long = "point")]
    points: Vec<PointSpec>,
    /// Pattern for the completion point
    #[arg(long)]
    zero_pattern: Option<HapticPattern>,
    /// Synthetic tick cadence in milliseconds
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    tick_ms: u64,
}

pub fn run(args: SimulateArgs) -> Result<()> {
    let config = Config::load()?;
    let capacity = Tier::current(&StaticEntitlement(config.premium)).point_capacity();
    let points = build_points(
        args.duration,
        args.zero_pattern.unwrap_or(config.haptics.completion_pattern),
        &args.points,
        config.haptics.default_pattern,
        capacity,
    )?;

    let t0 = Instant::now();
    let cadence = Duration::from_millis(args.tick_ms);
    let mut engine = CountdownEngine::new(args.duration);
    println!("{}", serde_json::to_string(&engine.start(t0)?)?);

    let mut now = t0;
    while engine.state() == CountdownState::Running {
        now += cadence;
        let Some(outcome) = engine.tick(now) else {
            break;
        };
        for point in CountdownEngine::due_trigger_points(&points, outcome.before, outcome.after) {
            let line = json!({
                "type": "PointFired",
                "elapsed_ms": (now - t0).as_millis() as u64,
                "remaining_seconds": outcome.after,
                "trigger_seconds": point.trigger_seconds,
                "pattern": point.pattern,
            });
            println!("{line}");
        }
        if let Some(completed) = outcome.completed {
            println!("{}", serde_json::to_string(&completed)?);
        }
    }
    Ok(())
}
