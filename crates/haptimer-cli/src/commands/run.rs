use std::sync::Arc;

use clap::Args;
use haptimer_core::error::Result;
use haptimer_core::{
    Config, Event, HapticPattern, PresetStore, SessionOptions, StaticEntitlement, TimerSession,
    TracingSink, TriggerPointSet,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use super::{duration_arg, PointSpec};

#[derive(Args)]
pub struct RunArgs {
    /// Countdown length (600, 90s, 10m, 1h30m, 10:00)
    #[arg(long, value_parser = duration_arg, conflicts_with = "preset")]
    duration: Option<u32>,
    /// Haptic point as <time>[:<pattern>] (repeatable)
    #[arg(long = "point")]
    points: Vec<PointSpec>,
    /// Extra points placed in random free slots
    #[arg(long, default_value_t = 0)]
    random_points: usize,
    /// Pattern for the completion point
    #[arg(long)]
    zero_pattern: Option<HapticPattern>,
    /// Start from a saved timer
    #[arg(long)]
    preset: Option<String>,
    /// Also print a StateSnapshot line whenever the displayed second changes
    #[arg(long)]
    progress: bool,
}

pub fn run(args: RunArgs) -> Result<()> {
    let config = Config::load()?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_session(args, config))
}

fn print_event(event: &Event) -> Result<()> {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}

async fn run_session(args: RunArgs, config: Config) -> Result<()> {
    let options = SessionOptions::from_config(&config);
    let entitlements = Arc::new(StaticEntitlement(config.premium));
    let sink = Arc::new(TracingSink);

    let session = match &args.preset {
        Some(name) => {
            let record = PresetStore::open_default()?.touch(name)?;
            info!(preset = %name, duration_secs = record.duration_seconds, "loaded saved timer");
            TimerSession::from_record(&record, options, sink, entitlements)
        }
        None => {
            let duration = args.duration.unwrap_or(config.timer.default_duration_secs);
            let completion = args.zero_pattern.unwrap_or(config.haptics.completion_pattern);
            TimerSession::with_points(
                TriggerPointSet::with_completion_pattern(duration, completion),
                options,
                sink,
                entitlements,
            )
        }
    };
    if let (Some(_), Some(pattern)) = (&args.preset, args.zero_pattern) {
        let completion = session.point_set().mandatory().id;
        session.set_point_pattern(completion, pattern)?;
    }

    for spec in &args.points {
        session.add_point(spec.at, spec.pattern.unwrap_or(config.haptics.default_pattern))?;
    }
    for _ in 0..args.random_points {
        session.add_point_anywhere(config.haptics.default_pattern)?;
    }

    let mut events = session.events();
    let mut snapshots = session.subscribe();
    let mut shown_second = None;
    session.start()?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                print_event(&session.reset())?;
                break;
            }
            received = events.recv() => match received {
                Ok(event) => {
                    print_event(&event)?;
                    if matches!(event, Event::TimerAutoReset { .. }) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event stream lagged"),
                Err(RecvError::Closed) => break,
            },
            changed = snapshots.changed(), if args.progress => {
                if changed.is_err() {
                    break;
                }
                let second = snapshots.borrow_and_update().remaining_whole_seconds;
                if shown_second != Some(second) {
                    shown_second = Some(second);
                    print_event(&session.snapshot_event())?;
                }
            }
        }
    }
    Ok(())
}
