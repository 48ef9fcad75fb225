//! Repeating timers
//!
//! The engine never owns a real timer. Periodic work is registered with a
//! `Scheduler` as a plain `Task` value; whoever drives the scheduler pops due
//! firings and dispatches them to the session. `VirtualScheduler` runs on
//! caller-supplied time, which keeps headless runs and tests deterministic.

use std::cell::RefCell;
use std::rc::Rc;

/// Periodic work a runner can register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Master clock: movement, impacts, ability, waves
    Clock,
    /// Spawn tick
    Spawn,
}

/// Opaque timer identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// One due timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Firing {
    pub handle: TimerHandle,
    pub task: Task,
    /// Scheduler time the firing was due
    pub at_ms: u64,
}

/// Timer capability handed to a runner
pub trait Scheduler {
    fn now_ms(&self) -> u64;

    /// Fire `task` every `period_ms`, first at `now + period_ms`
    fn schedule_repeating(&mut self, period_ms: u64, task: Task) -> TimerHandle;

    /// Returns false if the handle was not live
    fn cancel(&mut self, handle: TimerHandle) -> bool;

    fn is_scheduled(&self, handle: TimerHandle) -> bool;

    fn active_timers(&self) -> usize;

    /// Earliest firing due at or before `until_ms`, advancing time to it
    fn pop_due(&mut self, until_ms: u64) -> Option<Firing>;

    /// Move time forward to `until_ms` once nothing more is due
    fn settle(&mut self, until_ms: u64);
}

/// Lets a host keep a handle on a scheduler it lends to a runner
impl<S: Scheduler + ?Sized> Scheduler for Rc<RefCell<S>> {
    fn now_ms(&self) -> u64 {
        self.borrow().now_ms()
    }

    fn schedule_repeating(&mut self, period_ms: u64, task: Task) -> TimerHandle {
        self.borrow_mut().schedule_repeating(period_ms, task)
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.borrow_mut().cancel(handle)
    }

    fn is_scheduled(&self, handle: TimerHandle) -> bool {
        self.borrow().is_scheduled(handle)
    }

    fn active_timers(&self) -> usize {
        self.borrow().active_timers()
    }

    fn pop_due(&mut self, until_ms: u64) -> Option<Firing> {
        self.borrow_mut().pop_due(until_ms)
    }

    fn settle(&mut self, until_ms: u64) {
        self.borrow_mut().settle(until_ms)
    }
}

#[derive(Debug, Clone)]
struct Timer {
    handle: TimerHandle,
    task: Task,
    period_ms: u64,
    next_due_ms: u64,
}

/// Deterministic scheduler driven by explicit time steps
#[derive(Debug, Default)]
pub struct VirtualScheduler {
    now_ms: u64,
    next_handle: u64,
    timers: Vec<Timer>,
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks of every live timer, in registration order
    pub fn scheduled_tasks(&self) -> Vec<Task> {
        self.timers.iter().map(|t| t.task).collect()
    }

    pub fn period_of(&self, handle: TimerHandle) -> Option<u64> {
        self.timers
            .iter()
            .find(|t| t.handle == handle)
            .map(|t| t.period_ms)
    }
}

impl Scheduler for VirtualScheduler {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn schedule_repeating(&mut self, period_ms: u64, task: Task) -> TimerHandle {
        let period_ms = period_ms.max(1);
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.timers.push(Timer {
            handle,
            task,
            period_ms,
            next_due_ms: self.now_ms + period_ms,
        });
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.handle != handle);
        self.timers.len() != before
    }

    fn is_scheduled(&self, handle: TimerHandle) -> bool {
        self.timers.iter().any(|t| t.handle == handle)
    }

    fn active_timers(&self) -> usize {
        self.timers.len()
    }

    fn pop_due(&mut self, until_ms: u64) -> Option<Firing> {
        // Ties go to the older timer
        let timer = self
            .timers
            .iter_mut()
            .filter(|t| t.next_due_ms <= until_ms)
            .min_by_key(|t| (t.next_due_ms, t.handle))?;

        let firing = Firing {
            handle: timer.handle,
            task: timer.task,
            at_ms: timer.next_due_ms,
        };
        timer.next_due_ms += timer.period_ms;
        self.now_ms = self.now_ms.max(firing.at_ms);
        Some(firing)
    }

    fn settle(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(s: &mut VirtualScheduler, until_ms: u64) -> Vec<(Task, u64)> {
        let fired = std::iter::from_fn(|| s.pop_due(until_ms))
            .map(|f| (f.task, f.at_ms))
            .collect();
        s.settle(until_ms);
        fired
    }

    #[test]
    fn test_repeating_fires_in_time_order() {
        let mut s = VirtualScheduler::new();
        s.schedule_repeating(50, Task::Clock);
        s.schedule_repeating(120, Task::Spawn);
        let fired = drain(&mut s, 150);
        assert_eq!(
            fired,
            vec![
                (Task::Clock, 50),
                (Task::Clock, 100),
                (Task::Spawn, 120),
                (Task::Clock, 150),
            ]
        );
        assert_eq!(s.now_ms(), 150);
    }

    #[test]
    fn test_cancel_stops_firing() {
        let mut s = VirtualScheduler::new();
        let clock = s.schedule_repeating(10, Task::Clock);
        assert!(s.cancel(clock));
        assert!(!s.cancel(clock));
        assert!(!s.is_scheduled(clock));
        assert!(drain(&mut s, 1_000).is_empty());
    }

    #[test]
    fn test_new_timer_starts_from_now() {
        let mut s = VirtualScheduler::new();
        s.settle(1_000);
        let spawn = s.schedule_repeating(300, Task::Spawn);
        assert_eq!(s.period_of(spawn), Some(300));
        assert_eq!(drain(&mut s, 1_299), vec![]);
        assert_eq!(drain(&mut s, 1_300), vec![(Task::Spawn, 1_300)]);
    }

    #[test]
    fn test_same_due_time_prefers_older_timer() {
        let mut s = VirtualScheduler::new();
        s.schedule_repeating(100, Task::Clock);
        s.schedule_repeating(100, Task::Spawn);
        let fired = drain(&mut s, 100);
        assert_eq!(fired, vec![(Task::Clock, 100), (Task::Spawn, 100)]);
    }

    #[test]
    fn test_shared_scheduler_sees_lent_timers() {
        let shared = Rc::new(RefCell::new(VirtualScheduler::new()));
        let mut lent = Rc::clone(&shared);
        let handle = lent.schedule_repeating(50, Task::Clock);
        assert_eq!(shared.borrow().active_timers(), 1);
        assert_eq!(lent.pop_due(60).map(|f| f.at_ms), Some(50));
        assert!(lent.cancel(handle));
        assert_eq!(shared.borrow().active_timers(), 0);
    }
}
