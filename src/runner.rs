//! Session harness
//!
//! A `GameRunner` owns exactly one session plus its timers and collaborators.
//! It keeps at most one clock timer and one spawn timer alive, reschedules the
//! spawner when a wave changes its interval, and on game over cancels every
//! timer and reports the score exactly once.

use crate::report::{PersonalBest, PersonalBestStore, Report, ScoreReporter, ScoreSubmitter};
use crate::scheduler::{Scheduler, Task, TimerHandle, VirtualScheduler};
use crate::sim::{
    self, Action, ActionOutcome, GameEvent, GamePhase, Session, SpawnOutcome, Snapshot,
};

/// Receives the frame after every clock tick, together with every event
/// queued since the previous frame. Events handed to a sink are consumed;
/// hosts without a sink drain them with `GameRunner::drain_events`.
pub trait FrameSink {
    fn on_frame(&mut self, snapshot: &Snapshot, events: &[GameEvent]);
}

pub struct GameRunner<P, U, S = VirtualScheduler>
where
    P: PersonalBestStore,
    U: ScoreSubmitter,
    S: Scheduler,
{
    session: Session,
    scheduler: S,
    reporter: ScoreReporter<P, U>,
    clock_timer: Option<TimerHandle>,
    spawn_timer: Option<TimerHandle>,
    reported: bool,
    last_report: Option<Report>,
    /// Read at session start, refreshed by the game-over report
    personal_best: PersonalBest,
    frame_sink: Option<Box<dyn FrameSink>>,
    /// Events not yet drained by the host
    events: Vec<GameEvent>,
}

impl<P, U, S> GameRunner<P, U, S>
where
    P: PersonalBestStore,
    U: ScoreSubmitter,
    S: Scheduler,
{
    pub fn new(session: Session, scheduler: S, reporter: ScoreReporter<P, U>) -> Self {
        Self {
            session,
            scheduler,
            reporter,
            clock_timer: None,
            spawn_timer: None,
            reported: false,
            last_report: None,
            personal_best: PersonalBest::default(),
            frame_sink: None,
            events: Vec::new(),
        }
    }

    pub fn set_frame_sink(&mut self, sink: Box<dyn FrameSink>) {
        self.frame_sink = Some(sink);
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn reporter(&self) -> &ScoreReporter<P, U> {
        &self.reporter
    }

    pub fn phase(&self) -> GamePhase {
        self.session.phase
    }

    pub fn snapshot(&self) -> Snapshot {
        self.session.snapshot()
    }

    /// Report produced by the last finished session
    pub fn last_report(&self) -> Option<&Report> {
        self.last_report.as_ref()
    }

    /// Personal best for the current game
    pub fn personal_best(&self) -> PersonalBest {
        self.personal_best
    }

    /// Take every event produced since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Start (or restart) the session and its timers
    pub fn start_game(&mut self) {
        self.cancel_timers();
        sim::start_game(&mut self.session);
        self.reported = false;
        self.last_report = None;
        self.personal_best = self.reporter.personal_best(&self.session.tuning.game_id);

        self.clock_timer = Some(
            self.scheduler
                .schedule_repeating(self.session.tuning.tick_ms, Task::Clock),
        );
        self.reschedule_spawner(self.session.spawner.interval_ms);
        self.collect_events();
    }

    /// Let `dt_ms` of scheduler time pass, dispatching every due task
    pub fn advance(&mut self, dt_ms: u64) {
        let until = self.scheduler.now_ms() + dt_ms;
        while let Some(firing) = self.scheduler.pop_due(until) {
            match firing.task {
                Task::Clock => {
                    let tick_ms = self.session.tuning.tick_ms;
                    sim::advance_clock(&mut self.session, tick_ms);
                    self.collect_events();
                    if let Some(sink) = self.frame_sink.as_mut() {
                        let events = std::mem::take(&mut self.events);
                        sink.on_frame(&self.session.snapshot(), &events);
                    }
                }
                Task::Spawn => {
                    if sim::spawn_tick(&mut self.session) == SpawnOutcome::AtCapacity {
                        log::trace!("Spawn skipped at capacity");
                    }
                    self.collect_events();
                }
            }
        }
        self.scheduler.settle(until);
    }

    pub fn resolve_action(&mut self, id: u32, action: Action) -> ActionOutcome {
        let outcome = sim::resolve_action(&mut self.session, id, action);
        self.collect_events();
        outcome
    }

    pub fn activate_ability(&mut self) -> bool {
        let activated = sim::activate_ability(&mut self.session);
        self.collect_events();
        activated
    }

    pub fn collect_power_up(&mut self, id: u32) -> bool {
        let collected = sim::collect_power_up(&mut self.session, id);
        self.collect_events();
        collected
    }

    /// Cancel every timer this runner registered
    pub fn teardown(&mut self) {
        self.cancel_timers();
    }

    fn cancel_timers(&mut self) {
        for handle in [self.clock_timer.take(), self.spawn_timer.take()]
            .into_iter()
            .flatten()
        {
            self.scheduler.cancel(handle);
        }
    }

    fn reschedule_spawner(&mut self, interval_ms: u64) {
        if let Some(old) = self.spawn_timer.take() {
            self.scheduler.cancel(old);
        }
        self.spawn_timer = Some(self.scheduler.schedule_repeating(interval_ms, Task::Spawn));
    }

    /// Move session events into the host queue, reacting to the ones that
    /// affect timers
    fn collect_events(&mut self) {
        let fresh = self.session.drain_events();
        for event in &fresh {
            match event {
                GameEvent::WaveAdvanced {
                    spawn_interval_ms, ..
                } if self.session.is_playing() => self.reschedule_spawner(*spawn_interval_ms),
                GameEvent::GameOver { .. } => self.on_game_over(),
                _ => {}
            }
        }
        self.events.extend(fresh);
    }

    fn on_game_over(&mut self) {
        self.cancel_timers();
        if self.reported {
            return;
        }
        self.reported = true;

        let game_id = self.session.tuning.game_id.clone();
        let secondary = self
            .session
            .tuning
            .secondary_metric
            .measure(&self.session.stats);
        let report = self.reporter.report(&game_id, self.session.score, secondary);
        self.personal_best = report.personal_best;
        self.last_report = Some(report);
    }
}

impl<P, U, S> Drop for GameRunner<P, U, S>
where
    P: PersonalBestStore,
    U: ScoreSubmitter,
    S: Scheduler,
{
    fn drop(&mut self) {
        self.cancel_timers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{KvPersonalBestStore, SubmitError};
    use crate::storage::MemoryStore;
    use crate::tuning::GameTuning;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(String, u64)>,
    }

    impl ScoreSubmitter for Recorder {
        fn submit_score(&mut self, game_id: &str, score: u64) -> Result<(), SubmitError> {
            self.calls.push((game_id.to_owned(), score));
            Ok(())
        }
    }

    type TestRunner = GameRunner<KvPersonalBestStore<Rc<MemoryStore>>, Recorder>;

    fn runner(tuning: GameTuning) -> (TestRunner, Rc<MemoryStore>) {
        let store = Rc::new(MemoryStore::new());
        let reporter = ScoreReporter::new(KvPersonalBestStore::new(Rc::clone(&store)), Recorder::default());
        let runner = GameRunner::new(Session::new(tuning, 9), VirtualScheduler::new(), reporter);
        (runner, store)
    }

    #[test]
    fn test_start_registers_one_clock_and_one_spawner() {
        let (mut runner, _) = runner(GameTuning::meeting_defense());
        runner.start_game();
        runner.start_game();
        assert_eq!(runner.scheduler().active_timers(), 2);
        assert_eq!(runner.phase(), GamePhase::Playing);
    }

    #[test]
    fn test_spawns_follow_interval() {
        let (mut runner, _) = runner(GameTuning::meeting_defense());
        runner.start_game();
        runner.advance(1_499);
        assert_eq!(runner.session().stats.spawned, 0);
        runner.advance(1);
        assert_eq!(runner.session().stats.spawned, 1);
        assert_eq!(runner.session().clock_ms, 1_500);
    }

    #[test]
    fn test_wave_change_reschedules_spawner() {
        let mut tuning = GameTuning::meeting_defense();
        tuning.health = Some(10_000);
        let (mut runner, _) = runner(tuning);
        runner.start_game();
        runner.advance(20_000);
        assert_eq!(runner.session().wave, 2);
        assert_eq!(runner.scheduler().active_timers(), 2);

        let spawn = runner.spawn_timer.unwrap();
        assert_eq!(runner.scheduler().period_of(spawn), Some(1_200));
        let spawned = runner.session().stats.spawned;
        runner.advance(1_200);
        assert_eq!(runner.session().stats.spawned, spawned + 1);
    }

    #[test]
    fn test_game_over_cancels_timers_and_reports_once() {
        let (mut runner, store) = runner(GameTuning::inbox_triage());
        runner.start_game();
        // Nobody triages, so the inbox overflows
        runner.advance(60_000);
        assert_eq!(runner.phase(), GamePhase::Lost);
        assert_eq!(runner.scheduler().active_timers(), 0);
        assert_eq!(runner.reporter().submitter().calls.len(), 1);
        assert!(runner.last_report().is_some());

        let clock = runner.session().clock_ms;
        runner.advance(10_000);
        assert_eq!(runner.session().clock_ms, clock);
        assert_eq!(runner.reporter().submitter().calls.len(), 1);
        // A scoreless run is never a personal best
        assert!(!runner.last_report().unwrap().new_best);
        assert!(store.is_empty());
    }

    #[test]
    fn test_new_best_is_persisted() {
        let (mut runner, store) = runner(GameTuning::meeting_defense());
        runner.start_game();
        runner.session.score = 1_500;
        runner.advance(50);
        assert_eq!(runner.phase(), GamePhase::Won);
        let report = *runner.last_report().unwrap();
        assert!(report.new_best);
        assert_eq!(report.personal_best.score, 1_500);
        assert!(!store.is_empty());
    }

    #[test]
    fn test_restart_after_game_over_reports_again() {
        let (mut runner, _) = runner(GameTuning::meeting_defense());
        runner.start_game();
        runner.session.score = 1_500;
        runner.advance(50);
        runner.start_game();
        assert_eq!(runner.scheduler().active_timers(), 2);
        runner.session.score = 1_600;
        runner.advance(50);
        assert_eq!(runner.reporter().submitter().calls.len(), 2);
    }

    #[test]
    fn test_frame_sink_sees_every_clock_tick() {
        struct Frames(Rc<RefCell<Vec<u64>>>);
        impl FrameSink for Frames {
            fn on_frame(&mut self, snapshot: &Snapshot, _events: &[GameEvent]) {
                self.0.borrow_mut().push(snapshot.clock_ms);
            }
        }

        let frames = Rc::new(RefCell::new(Vec::new()));
        let (mut runner, _) = runner(GameTuning::meeting_defense());
        runner.set_frame_sink(Box::new(Frames(Rc::clone(&frames))));
        runner.start_game();
        runner.advance(200);
        assert_eq!(*frames.borrow(), vec![50, 100, 150, 200]);
    }

    #[test]
    fn test_input_events_reach_host() {
        let (mut runner, _) = runner(GameTuning::meeting_defense());
        runner.start_game();
        assert!(runner.activate_ability());
        assert!(!runner.activate_ability());
        let events = runner.drain_events();
        assert_eq!(events.first(), Some(&GameEvent::Started));
        assert!(matches!(
            events.last(),
            Some(GameEvent::AbilityActivated { charges_left: 1 })
        ));
        assert!(runner.drain_events().is_empty());
    }

    #[test]
    fn test_teardown_leaves_no_timers() {
        let (mut runner, _) = runner(GameTuning::meeting_defense());
        runner.start_game();
        runner.teardown();
        assert_eq!(runner.scheduler().active_timers(), 0);
    }

    #[test]
    fn test_drop_cancels_timers_on_shared_scheduler() {
        let shared = Rc::new(RefCell::new(VirtualScheduler::new()));
        let store = MemoryStore::new();
        let reporter = ScoreReporter::new(KvPersonalBestStore::new(&store), Recorder::default());
        let mut runner = GameRunner::new(
            Session::new(GameTuning::meeting_defense(), 9),
            Rc::clone(&shared),
            reporter,
        );
        runner.start_game();
        runner.advance(100);
        assert_eq!(shared.borrow().active_timers(), 2);

        drop(runner);
        assert_eq!(shared.borrow().active_timers(), 0);
    }

    #[test]
    fn test_personal_best_is_read_at_start() {
        let (mut runner, store) = runner(GameTuning::meeting_defense());
        let best = PersonalBest {
            score: 900,
            secondary: 4,
        };
        KvPersonalBestStore::new(Rc::clone(&store)).set("meeting_defense", best);
        assert_eq!(runner.personal_best(), PersonalBest::default());

        runner.start_game();
        assert_eq!(runner.personal_best(), best);

        runner.session.score = 1_500;
        runner.advance(50);
        assert_eq!(runner.phase(), GamePhase::Won);
        assert_eq!(runner.personal_best().score, 1_500);
    }

    #[test]
    fn test_frame_sink_consumes_events() {
        struct Counts(Rc<RefCell<Vec<usize>>>);
        impl FrameSink for Counts {
            fn on_frame(&mut self, _snapshot: &Snapshot, events: &[GameEvent]) {
                self.0.borrow_mut().push(events.len());
            }
        }

        let counts = Rc::new(RefCell::new(Vec::new()));
        let (mut runner, _) = runner(GameTuning::meeting_defense());
        runner.set_frame_sink(Box::new(Counts(Rc::clone(&counts))));
        runner.start_game();
        runner.advance(500);
        assert!(runner.drain_events().is_empty());
        // The first frame carries `Started`
        assert!(counts.borrow()[0] >= 1);
        assert_eq!(counts.borrow().len(), 10);
    }
}
