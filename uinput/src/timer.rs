//! Cancellable timers.
//!
//! Inputs never touch ambient timer state. They receive a [`Scheduler`] and
//! keep the [`TimerHandle`] of their pending debounce task, cancelling it
//! whenever a newer edit or a commit supersedes it.
//!
//! [`TimerQueue`] is the scheduler used everywhere. Time only moves when the
//! owner calls [`TimerQueue::advance_to`] (the terminal loop passes the wall
//! clock, tests pass virtual instants), so firing order is deterministic.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::{Duration, Instant},
};

/// Deferred work run by a scheduler.
pub type Task = Box<dyn FnOnce()>;

/// Something that runs a task after a delay.
pub trait Scheduler {
    /// Run `task` once `delay` has elapsed, unless the returned handle is
    /// cancelled first.
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Pending,
    Fired,
    Cancelled,
}

/// Handle to a scheduled task.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    id: u64,
    state: Rc<Cell<TimerState>>,
}

impl TimerHandle {
    /// Cancel the task. Cancelling a fired or cancelled task does nothing.
    pub fn cancel(&self) {
        if self.state.get() == TimerState::Pending {
            self.state.set(TimerState::Cancelled);
        }
    }

    /// Whether the task is still waiting to run.
    pub fn is_pending(&self) -> bool {
        self.state.get() == TimerState::Pending
    }

    /// Whether the task has already run.
    pub fn has_fired(&self) -> bool {
        self.state.get() == TimerState::Fired
    }

    /// Scheduler-assigned identifier.
    pub fn id(&self) -> u64 {
        self.id
    }
}

struct Entry {
    id: u64,
    deadline: Instant,
    state: Rc<Cell<TimerState>>,
    task: Task,
}

/// Single-threaded timer queue driven by an explicit clock.
pub struct TimerQueue {
    now: Cell<Instant>,
    next_id: Cell<u64>,
    entries: RefCell<Vec<Entry>>,
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerQueue {
    /// Create a queue whose clock starts at the current instant.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Create a queue whose clock starts at `now`.
    pub fn starting_at(now: Instant) -> Self {
        Self {
            now: Cell::new(now),
            next_id: Cell::new(0),
            entries: RefCell::new(Vec::new()),
        }
    }

    /// Current time of the queue clock.
    pub fn now(&self) -> Instant {
        self.now.get()
    }

    /// Number of tasks still waiting to run.
    pub fn pending(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.state.get() == TimerState::Pending)
            .count()
    }

    /// Earliest deadline among live tasks.
    pub fn next_deadline(&self) -> Option<Instant> {
        let mut entries = self.entries.borrow_mut();
        entries.retain(|e| e.state.get() == TimerState::Pending);
        entries.iter().map(|e| e.deadline).min()
    }

    /// Move the clock forward by `delta` and run everything that came due.
    pub fn advance(&self, delta: Duration) -> usize {
        self.advance_to(self.now() + delta)
    }

    /// Move the clock to `now` and run every task whose deadline has passed.
    ///
    /// Tasks run in deadline order, ties broken by scheduling order. While a
    /// task runs, the clock reads its deadline, so tasks scheduled from inside
    /// a task are timed from the moment it fired. Returns the number of tasks
    /// that ran.
    pub fn advance_to(&self, now: Instant) -> usize {
        let target = now.max(self.now());
        let mut fired = 0;

        while let Some(entry) = self.pop_due(target) {
            self.now.set(entry.deadline.max(self.now()));
            entry.state.set(TimerState::Fired);
            trace!("timer #{} fired", entry.id);
            (entry.task)();
            fired += 1;
        }

        self.now.set(target);
        fired
    }

    fn pop_due(&self, target: Instant) -> Option<Entry> {
        let mut entries = self.entries.borrow_mut();
        entries.retain(|e| e.state.get() == TimerState::Pending);
        let idx = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.deadline <= target)
            .min_by_key(|(_, e)| (e.deadline, e.id))
            .map(|(i, _)| i)?;
        Some(entries.swap_remove(idx))
    }
}

impl Scheduler for TimerQueue {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let state = Rc::new(Cell::new(TimerState::Pending));
        self.entries.borrow_mut().push(Entry {
            id,
            deadline: self.now() + delay,
            state: state.clone(),
            task,
        });

        TimerHandle { id, state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Task) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let make = {
            let log = log.clone();
            move |name: &'static str| -> Task {
                let log = log.clone();
                Box::new(move || log.borrow_mut().push(name))
            }
        };
        (log, make)
    }

    #[test]
    fn test_fires_in_deadline_order() {
        let queue = TimerQueue::new();
        let (log, task) = recorder();

        queue.schedule(Duration::from_millis(30), task("c"));
        queue.schedule(Duration::from_millis(10), task("a"));
        queue.schedule(Duration::from_millis(20), task("b"));
        assert_eq!(queue.pending(), 3);

        assert_eq!(queue.advance(Duration::from_millis(9)), 0);
        assert_eq!(queue.advance(Duration::from_millis(21)), 3);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_cancelled_never_fires() {
        let queue = TimerQueue::new();
        let (log, task) = recorder();

        let handle = queue.schedule(Duration::from_millis(5), task("stale"));
        handle.cancel();
        assert!(!handle.is_pending());
        assert_eq!(queue.next_deadline(), None);

        queue.advance(Duration::from_secs(1));
        assert!(log.borrow().is_empty());
        assert!(!handle.has_fired());
    }

    #[test]
    fn test_cancel_after_fire_is_noop() {
        let queue = TimerQueue::new();
        let (log, task) = recorder();

        let handle = queue.schedule(Duration::ZERO, task("now"));
        queue.advance(Duration::ZERO);
        handle.cancel();
        assert!(handle.has_fired());
        assert_eq!(*log.borrow(), vec!["now"]);
    }

    #[test]
    fn test_nested_schedule_uses_fire_time() {
        let queue = Rc::new(TimerQueue::new());
        let start = queue.now();
        let seen = Rc::new(Cell::new(None));

        let inner_queue = queue.clone();
        let inner_seen = seen.clone();
        queue.schedule(
            Duration::from_millis(10),
            Box::new(move || {
                let q = inner_queue.clone();
                let s = inner_seen.clone();
                inner_queue.schedule(
                    Duration::from_millis(10),
                    Box::new(move || s.set(Some(q.now()))),
                );
            }),
        );

        queue.advance(Duration::from_millis(100));
        assert_eq!(seen.get(), Some(start + Duration::from_millis(20)));
        assert_eq!(queue.now(), start + Duration::from_millis(100));
    }

    #[test]
    fn test_clock_never_goes_back() {
        let start = Instant::now();
        let queue = TimerQueue::starting_at(start + Duration::from_secs(1));
        queue.advance_to(start);
        assert_eq!(queue.now(), start + Duration::from_secs(1));
    }
}
