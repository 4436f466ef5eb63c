//! Legwork - headless runner
//!
//! Plays a JSON level for a number of ticks with a seeded random input script
//! and reports what happened. Useful for smoke testing levels and settings.
//!
//! Usage: `legwork <level.json> [ticks] [seed] [checkpoint.json]`
//!
//! Settings are read from `legwork-settings.json`, which is written with the
//! defaults on first run. `LEGWORK_UNCLASSIFIED=abort|warn` overrides the
//! collision policy.

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::error::Error;
    use std::path::Path;

    use legwork::consts::SIM_DT;
    use legwork::persistence::{CheckpointStore, FileStore, MemoryStore};
    use legwork::sim::{LevelData, SimEvent, TickInput, World, tick};
    use legwork::{Settings, UnclassifiedPolicy};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    const SETTINGS_FILE: &str = "legwork-settings.json";
    const POLICY_VAR: &str = "LEGWORK_UNCLASSIFIED";
    const DEFAULT_TICKS: u64 = 60 * 60;
    /// Chance per tick that a scripted button changes state
    const TOGGLE_CHANCE: f64 = 1.0 / 20.0;

    pub fn run() -> Result<(), Box<dyn Error>> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let Some(level_path) = args.first() else {
            return Err("usage: legwork <level.json> [ticks] [seed] [checkpoint.json]".into());
        };
        let ticks = match args.get(1) {
            Some(arg) => arg.parse()?,
            None => DEFAULT_TICKS,
        };
        let seed = match args.get(2) {
            Some(arg) => arg.parse()?,
            None => 0,
        };

        let settings = load_settings();
        let level = LevelData::from_json(&std::fs::read_to_string(level_path)?)?;
        log::info!("Playing {level_path} for {ticks} ticks with seed {seed}");

        match args.get(3) {
            Some(save) => {
                let world = World::from_level(&level, FileStore::open(save)?, settings)?;
                simulate(world, ticks, seed)
            }
            None => simulate(World::from_level(&level, MemoryStore::new(), settings)?, ticks, seed),
        }
    }

    fn load_settings() -> Settings {
        let path = Path::new(SETTINGS_FILE);
        let mut settings = Settings::load(path);
        if !path.exists() {
            if let Err(e) = settings.save(path) {
                log::warn!("Could not write default settings to {SETTINGS_FILE}: {e}");
            }
        }

        if let Ok(value) = std::env::var(POLICY_VAR) {
            match UnclassifiedPolicy::from_str(&value) {
                Some(policy) => settings.unclassified_pair = policy,
                None => log::warn!("Ignoring {POLICY_VAR}={value}"),
            }
        }
        log::info!("Unclassified collision pairs: {}", settings.unclassified_pair.as_str());
        settings
    }

    fn simulate<S: CheckpointStore>(
        mut world: World<S>,
        ticks: u64,
        seed: u64,
    ) -> Result<(), Box<dyn Error>> {
        let mut rng = Pcg32::seed_from_u64(seed);
        let (mut left, mut right) = (false, false);
        let mut input = TickInput::default();
        let mut steps = 0u32;

        for _ in 0..ticks {
            if rng.random_bool(TOGGLE_CHANCE) {
                left = !left;
            }
            if rng.random_bool(TOGGLE_CHANCE) {
                right = !right;
            }
            input = input.next(left, right);
            tick(&mut world, &input, SIM_DT)?;

            for event in world.events() {
                log::debug!("tick {}: {event:?}", world.time_ticks);
                if matches!(event, SimEvent::Step(_)) {
                    steps += 1;
                }
            }
        }

        log::info!(
            "Finished after {} ticks: {steps} steps, {} hits taken, {} enemies killed, \
             {} enemies left, exit {:?}",
            world.time_ticks,
            world.stats.hits_taken,
            world.stats.enemies_killed,
            world.enemies.len(),
            world.exit_state()
        );
        log::info!("Camera at {}", world.camera_target());
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    env_logger::init();
    log::info!("Legwork (headless) starting...");

    match native::run() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The core is driven by an external frame loop on the web
}
