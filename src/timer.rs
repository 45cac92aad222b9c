//! Deferred work driven by host clock ticks.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::surface::MindMap;

pub type Task = Rc<dyn Fn(&mut MindMap)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

struct Timer {
    id: TimerId,
    due: Duration,
    every: Option<Duration>,
    task: Task,
}

/// Timers ordered by due time on a virtual clock that only advances when
/// the host calls [`MindMap::tick`].
#[derive(Default)]
pub struct TimerQueue {
    now: Duration,
    next_id: u64,
    timers: Vec<Timer>,
}

impl fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("now", &self.now)
            .field("pending", &self.timers.len())
            .finish()
    }
}

impl TimerQueue {
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn set_timeout(&mut self, delay: Duration, task: Task) -> TimerId {
        self.push(delay, None, task)
    }

    pub fn set_interval(&mut self, every: Duration, task: Task) -> TimerId {
        // A zero period would never let the clock move past it.
        let every = every.max(Duration::from_millis(1));
        self.push(every, Some(every), task)
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.id != id);
        self.timers.len() != before
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.iter().any(|timer| timer.id == id)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Removes and returns the earliest timer due at or before `deadline`,
    /// moving the clock to its due time. Interval timers are re-armed.
    pub(crate) fn pop_due(&mut self, deadline: Duration) -> Option<(TimerId, Task)> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= deadline)
            .min_by_key(|(_, timer)| (timer.due, timer.id))
            .map(|(index, _)| index)?;
        let timer = &mut self.timers[index];
        self.now = self.now.max(timer.due);
        let fired = (timer.id, timer.task.clone());
        match timer.every {
            Some(every) => timer.due += every,
            None => {
                self.timers.remove(index);
            }
        }
        Some(fired)
    }

    pub(crate) fn settle(&mut self, deadline: Duration) {
        self.now = self.now.max(deadline);
    }

    fn push(&mut self, delay: Duration, every: Option<Duration>, task: Task) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.timers.push(Timer {
            id,
            due: self.now + delay,
            every,
            task,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Task {
        Rc::new(|_: &mut MindMap| {})
    }

    #[test]
    fn timers_fire_in_due_order() {
        let mut queue = TimerQueue::default();
        let late = queue.set_timeout(Duration::from_millis(900), noop());
        let early = queue.set_timeout(Duration::from_millis(100), noop());
        let deadline = Duration::from_millis(1000);
        assert_eq!(queue.pop_due(deadline).map(|(id, _)| id), Some(early));
        assert_eq!(queue.pop_due(deadline).map(|(id, _)| id), Some(late));
        assert!(queue.pop_due(deadline).is_none());
        assert_eq!(queue.now(), Duration::from_millis(900));
    }

    #[test]
    fn intervals_rearm_until_cancelled() {
        let mut queue = TimerQueue::default();
        let poll = queue.set_interval(Duration::from_millis(100), noop());
        let deadline = Duration::from_millis(350);
        let mut fired = 0;
        while queue.pop_due(deadline).is_some() {
            fired += 1;
        }
        assert_eq!(fired, 3);
        assert!(queue.cancel(poll));
        assert!(!queue.cancel(poll));
        assert!(queue.is_empty());
    }
}
