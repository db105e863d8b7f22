use clap::Subcommand;
use haptimer_core::haptics::{events_for, events_with_rng};
use haptimer_core::error::Result;
use haptimer_core::{Config, HapticPattern};
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;
use serde_json::json;

#[derive(Subcommand)]
pub enum PatternAction {
    /// List all patterns
    List,
    /// Print the haptic events of a pattern
    Show {
        /// Pattern id (pulse, heartbeat, wave, staccato, rolling, alert)
        id: HapticPattern,
        /// Seed for patterns with random intensity (defaults to haptics.rng_seed)
        #[arg(long)]
        seed: Option<u64>,
    },
}

pub fn run(action: PatternAction) -> Result<()> {
    match action {
        PatternAction::List => {
            let catalog: Vec<_> = HapticPattern::ALL
                .into_iter()
                .map(|p| {
                    json!({
                        "id": p.id(),
                        "name": p.display_name(),
                        "description": p.description(),
                        "duration_secs": p.total_duration_secs(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        }
        PatternAction::Show { id, seed } => {
            let seed = seed.or_else(|| Config::load_or_default().haptics.rng_seed);
            let events = match seed {
                Some(seed) => events_with_rng(id, &mut Mcg128Xsl64::seed_from_u64(seed)),
                None => events_for(id),
            };
            let detail = json!({
                "id": id.id(),
                "name": id.display_name(),
                "description": id.description(),
                "events": events,
            });
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
    }
    Ok(())
}
