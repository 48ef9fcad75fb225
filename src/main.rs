//! Training Arcade - headless runner
//!
//! Plays a session on virtual time with a simple autoplayer and prints the
//! result. Personal bests, settings and the session lock use the same local
//! store a browser build would.

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::fs;
    use std::path::PathBuf;
    use std::rc::Rc;

    use anyhow::{Context, Result, bail};
    use clap::{Parser, Subcommand};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use training_arcade::audio::{CuePlayer, LogCueSink, SoundCue};
    use training_arcade::consts::PRESETS;
    use training_arcade::lock::SessionLock;
    use training_arcade::platform;
    use training_arcade::report::{KvPersonalBestStore, LogSubmitter, PersonalBestStore, ScoreSubmitter};
    use training_arcade::scheduler::Scheduler;
    use training_arcade::storage::{KeyValueStore, MemoryStore};
    use training_arcade::{Action, GamePhase, GameRunner, GameTuning, ScoreReporter, Session, Settings, VirtualScheduler};

    #[derive(Parser, Debug)]
    #[command(name = "training-arcade")]
    #[command(about = "Headless runner for the training arcade games")]
    struct Cli {
        /// Keep personal bests and settings in memory only
        #[arg(long, global = true)]
        ephemeral: bool,
        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Subcommand, Debug)]
    enum Commands {
        /// List the built-in games
        ListGames,
        /// Print a game's tuning as JSON (a starting point for --tuning)
        DumpTuning { game: String },
        /// Play one session with the autoplayer
        Play {
            #[arg(long, default_value = "meeting_defense")]
            game: String,
            /// Tuning JSON file (overrides --game)
            #[arg(long)]
            tuning: Option<PathBuf>,
            #[arg(long)]
            seed: Option<u64>,
            /// Chance the autoplayer picks a wrong action
            #[arg(long, default_value_t = 0.1)]
            mistake_rate: f64,
            /// How long the autoplayer waits before acting on a new entity
            #[arg(long, default_value_t = 400)]
            reaction_ms: u64,
            /// Stop an untimed session after this much game time
            #[arg(long, default_value_t = 300_000)]
            max_ms: u64,
            /// Print the final snapshot as JSON
            #[arg(long)]
            json: bool,
        },
        /// Show stored personal bests
        Best { game: Option<String> },
        /// Toggle sound cues on/off
        ToggleSound,
    }

    /// Simple reflex bot: collects every power-up and answers each entity after
    /// a fixed reaction time, raising the shield for targets that need it.
    struct AutoPlayer {
        rng: Pcg32,
        mistake_rate: f64,
        reaction_ms: u64,
    }

    enum Intent {
        Collect(u32),
        Shield,
        Act(u32, Action),
    }

    impl AutoPlayer {
        fn new(seed: u64, mistake_rate: f64, reaction_ms: u64) -> Self {
            Self {
                rng: Pcg32::seed_from_u64(seed ^ 0xB07),
                mistake_rate,
                reaction_ms,
            }
        }

        fn plan(&mut self, session: &Session) -> Vec<Intent> {
            let mut intents: Vec<Intent> = session.power_ups.iter().map(|p| Intent::Collect(p.id)).collect();
            let mut wants_shield = false;

            for entity in &session.entities {
                if entity.age_ms(session.clock_ms) < self.reaction_ms {
                    continue;
                }
                let template = &session.tuning.catalog[entity.kind];
                if template.requires_ability && !session.ability.is_active() {
                    wants_shield |= session.ability.is_ready();
                    continue;
                }
                let action = if self.rng.random_bool(self.mistake_rate) {
                    Action::ALL
                        .into_iter()
                        .find(|a| *a != template.correct_action)
                        .unwrap_or(template.correct_action)
                } else {
                    template.correct_action
                };
                intents.push(Intent::Act(entity.id, action));
            }

            if wants_shield {
                intents.push(Intent::Shield);
            }
            intents
        }

        fn act<P, U, S>(&mut self, runner: &mut GameRunner<P, U, S>)
        where
            P: PersonalBestStore,
            U: ScoreSubmitter,
            S: Scheduler,
        {
            for intent in self.plan(runner.session()) {
                match intent {
                    Intent::Collect(id) => {
                        runner.collect_power_up(id);
                    }
                    Intent::Shield => {
                        runner.activate_ability();
                    }
                    Intent::Act(id, action) => {
                        runner.resolve_action(id, action);
                    }
                }
            }
        }
    }

    fn open_store(ephemeral: bool) -> Result<Rc<dyn KeyValueStore>> {
        if ephemeral {
            return Ok(Rc::new(MemoryStore::new()));
        }
        let store = platform::default_store().context("Failed to open the local store")?;
        log::info!("Using local store at {:?}", store.root());
        Ok(Rc::new(store))
    }

    fn load_tuning(game: &str, tuning: Option<PathBuf>) -> Result<GameTuning> {
        match tuning {
            Some(path) => {
                let json = fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
                GameTuning::from_json(&json).with_context(|| format!("Failed to load tuning from {:?}", path))
            }
            None => GameTuning::preset(game)
                .with_context(|| format!("Unknown game '{}' (try one of: {})", game, PRESETS.join(", "))),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn play(
        store: Rc<dyn KeyValueStore>,
        game: &str,
        tuning: Option<PathBuf>,
        seed: Option<u64>,
        mistake_rate: f64,
        reaction_ms: u64,
        max_ms: u64,
        json: bool,
    ) -> Result<()> {
        if !(0.0..=1.0).contains(&mistake_rate) {
            bail!("--mistake-rate must lie within 0..=1");
        }
        let tuning = load_tuning(game, tuning)?;
        let seed = seed.unwrap_or_else(platform::unix_time_ms);
        let game_id = tuning.game_id.clone();
        let tick_ms = tuning.tick_ms;

        let mut lock = SessionLock::new(Rc::clone(&store), &game_id, rand::random());
        if !lock.try_acquire(platform::unix_time_ms()) {
            bail!("{} is already running in another instance", game_id);
        }

        let settings = Settings::load(&store);
        let mut cues = CuePlayer::new(LogCueSink, &settings);
        let reporter = ScoreReporter::new(KvPersonalBestStore::new(Rc::clone(&store)), LogSubmitter);
        let mut runner = GameRunner::new(Session::new(tuning, seed), VirtualScheduler::new(), reporter);
        let mut bot = AutoPlayer::new(seed, mistake_rate, reaction_ms);

        println!("Playing {} (seed {})", game_id, seed);
        runner.start_game();
        while runner.phase() == GamePhase::Playing && runner.session().clock_ms < max_ms {
            runner.advance(tick_ms);
            bot.act(&mut runner);
            let events = runner.drain_events();
            cues.handle_events(&events, runner.session().clock_ms);
            if !lock.heartbeat(platform::unix_time_ms()) {
                bail!("{} was taken over by another instance", game_id);
            }
        }

        if runner.phase() == GamePhase::Playing {
            runner.teardown();
            println!("Stopped after {} ms of game time", max_ms);
            return Ok(());
        }
        if runner.last_report().is_some_and(|r| r.new_best) {
            cues.play(SoundCue::HighScore, runner.session().clock_ms);
        }

        let snapshot = runner.snapshot();
        if json {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            return Ok(());
        }

        let stats = &snapshot.stats;
        println!();
        println!("=== {} ===", if snapshot.phase == GamePhase::Won { "WON" } else { "LOST" });
        println!("  Reason:     {:?}", snapshot.end_reason);
        println!("  Score:      {}", snapshot.score);
        println!("  Rank:       {}", snapshot.rank.as_deref().unwrap_or("-"));
        println!("  Time:       {:.1}s", stats.time_played_ms as f64 / 1000.0);
        println!("  Wave:       {}", stats.final_wave);
        println!("  Max combo:  {}", stats.max_combo);
        println!("  Correct:    {} ({} fast)", stats.correct, stats.fast_actions);
        println!("  Incorrect:  {}", stats.incorrect);
        println!("  Impacts:    {} ({} damage)", stats.impacts, stats.damage_taken);
        println!("  Expired:    {}", stats.expired);
        println!("  Bosses:     {} handled, {} blocked", stats.bosses_handled, stats.boss_blocked);
        if let Some(report) = runner.last_report() {
            println!(
                "  Best:       {} / {}{}",
                report.personal_best.score,
                report.personal_best.secondary,
                if report.new_best { " (new!)" } else { "" }
            );
        }
        Ok(())
    }

    pub fn run() -> Result<()> {
        platform::init_logging();
        let cli = Cli::parse();
        let store = open_store(cli.ephemeral)?;

        match cli.command {
            Commands::ListGames => {
                for name in PRESETS {
                    println!("{}", name);
                }
            }
            Commands::DumpTuning { game } => {
                let tuning = load_tuning(&game, None)?;
                println!("{}", serde_json::to_string_pretty(&tuning)?);
            }
            Commands::Play {
                game,
                tuning,
                seed,
                mistake_rate,
                reaction_ms,
                max_ms,
                json,
            } => play(store, &game, tuning, seed, mistake_rate, reaction_ms, max_ms, json)?,
            Commands::Best { game } => {
                let bests = KvPersonalBestStore::new(Rc::clone(&store));
                let games: Vec<String> = match game {
                    Some(game) => vec![load_tuning(&game, None)?.game_id],
                    None => PRESETS.iter().map(|s| s.to_string()).collect(),
                };
                for game_id in games {
                    let best = bests.get(&game_id);
                    println!("{:<16} {:>6} / {}", game_id, best.score, best.secondary);
                }
            }
            Commands::ToggleSound => {
                let mut settings = Settings::load(&store);
                let enabled = settings.toggle_sound();
                settings.save(&store);
                println!("Sound {}", if enabled { "on" } else { "off" });
            }
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    cli::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    training_arcade::platform::init_logging();
    log::info!("The headless runner is native-only; embed the library in a web host instead");
}
