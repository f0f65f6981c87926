//! Discrete-event tick scheduler
//!
//! Every interval-driven concern (player input, AI, projectiles, mode timers,
//! presentation delays) registers a named timer against one millisecond clock.
//! The owner pulls due timers one at a time with [`Scheduler::next_due`], so a
//! handler can cancel other timers and nothing stale fires afterwards.

/// A registered timer
#[derive(Debug, Clone)]
struct Timer<K> {
    key: K,
    due_ms: u64,
    /// `None` for one-shot timers
    interval_ms: Option<u64>,
    /// Registration order, breaks ties between timers due at the same instant
    seq: u64,
}

/// Millisecond clock with named periodic and one-shot timers
#[derive(Debug, Clone)]
pub struct Scheduler<K> {
    now_ms: u64,
    timers: Vec<Timer<K>>,
    next_seq: u64,
}

impl<K: Copy + Eq> Default for Scheduler<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + Eq> Scheduler<K> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            timers: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Fire `key` every `interval_ms`, first firing one interval from now.
    /// Replaces any timer already registered under `key`.
    pub fn every(&mut self, key: K, interval_ms: u64) {
        let interval_ms = interval_ms.max(1);
        self.insert(key, self.now_ms + interval_ms, Some(interval_ms));
    }

    /// Fire `key` once after `delay_ms`. Re-arming restarts the countdown.
    pub fn after(&mut self, key: K, delay_ms: u64) {
        self.insert(key, self.now_ms + delay_ms, None);
    }

    pub fn cancel(&mut self, key: K) {
        self.timers.retain(|t| t.key != key);
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    pub fn is_scheduled(&self, key: K) -> bool {
        self.timers.iter().any(|t| t.key == key)
    }

    pub fn is_idle(&self) -> bool {
        self.timers.is_empty()
    }

    /// Milliseconds until `key` next fires
    pub fn remaining_ms(&self, key: K) -> Option<u64> {
        self.timers
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.due_ms.saturating_sub(self.now_ms))
    }

    /// Due time of the earliest registered timer
    pub fn peek_due_ms(&self) -> Option<u64> {
        self.timers.iter().map(|t| t.due_ms).min()
    }

    /// Pop the earliest timer due at or before `until_ms`, moving the clock to
    /// its due time. Periodic timers are re-armed before returning.
    pub fn next_due(&mut self, until_ms: u64) -> Option<K> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= until_ms)
            .min_by_key(|(_, t)| (t.due_ms, t.seq))
            .map(|(i, _)| i)?;

        let Timer {
            key,
            due_ms,
            interval_ms,
            ..
        } = self.timers[idx];
        self.now_ms = self.now_ms.max(due_ms);

        match interval_ms {
            Some(interval) => {
                let seq = self.next_seq;
                self.next_seq += 1;
                let timer = &mut self.timers[idx];
                timer.due_ms += interval;
                timer.seq = seq;
            }
            None => {
                self.timers.swap_remove(idx);
            }
        }
        Some(key)
    }

    /// Move the clock forward to `until_ms` once every due timer has been handled
    pub fn settle(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }

    fn insert(&mut self, key: K, due_ms: u64, interval_ms: Option<u64>) {
        self.cancel(key);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.push(Timer {
            key,
            due_ms,
            interval_ms,
            seq,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Key {
        Fast,
        Slow,
        Once,
    }

    fn drain(clock: &mut Scheduler<Key>, dt: u64) -> Vec<(u64, Key)> {
        let target = clock.now_ms() + dt;
        let mut fired = Vec::new();
        while let Some(key) = clock.next_due(target) {
            fired.push((clock.now_ms(), key));
        }
        clock.settle(target);
        fired
    }

    #[test]
    fn test_periodic_timers_interleave_by_due_time() {
        let mut clock = Scheduler::new();
        clock.every(Key::Fast, 100);
        clock.every(Key::Slow, 250);

        let fired = drain(&mut clock, 500);
        assert_eq!(
            fired,
            vec![
                (100, Key::Fast),
                (200, Key::Fast),
                (250, Key::Slow),
                (300, Key::Fast),
                (400, Key::Fast),
                // Tie at 500: Slow was re-armed before Fast
                (500, Key::Slow),
                (500, Key::Fast),
            ]
        );
        assert_eq!(clock.now_ms(), 500);
    }

    #[test]
    fn test_one_shot_fires_once() {
        let mut clock = Scheduler::new();
        clock.after(Key::Once, 300);
        assert_eq!(drain(&mut clock, 299), vec![]);
        assert_eq!(clock.remaining_ms(Key::Once), Some(1));
        assert_eq!(clock.peek_due_ms(), Some(300));
        assert_eq!(drain(&mut clock, 10), vec![(300, Key::Once)]);
        assert!(!clock.is_scheduled(Key::Once));
        assert_eq!(drain(&mut clock, 1000), vec![]);
    }

    #[test]
    fn test_rearm_restarts_countdown() {
        let mut clock = Scheduler::new();
        clock.after(Key::Once, 300);
        drain(&mut clock, 200);
        clock.after(Key::Once, 300);
        assert_eq!(drain(&mut clock, 200), vec![]);
        assert_eq!(drain(&mut clock, 100), vec![(500, Key::Once)]);
    }

    #[test]
    fn test_cancel_inside_handler_stops_later_timers() {
        let mut clock = Scheduler::new();
        clock.every(Key::Fast, 100);
        clock.every(Key::Slow, 100);

        let mut fired = Vec::new();
        while let Some(key) = clock.next_due(1000) {
            fired.push(key);
            if key == Key::Fast {
                clock.cancel_all();
            }
        }
        assert_eq!(fired, vec![Key::Fast]);
        assert!(clock.is_idle());
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let mut clock = Scheduler::new();
        clock.every(Key::Fast, 0);
        assert_eq!(drain(&mut clock, 3).len(), 3);
    }
}
