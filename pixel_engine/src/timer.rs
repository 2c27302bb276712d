use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::ActorId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TimerHandle(u64);

/// Scheduled transitions the scene knows how to dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimerEvent {
    RevealTick,
    InputUnlock,
    Reinteract { actor: ActorId },
}

/// Delayed and repeating callbacks, expressed as events rather than closures.
pub trait TimerService {
    fn schedule_repeating(&mut self, period_ms: u64, event: TimerEvent) -> TimerHandle;
    fn schedule_once(&mut self, delay_ms: u64, event: TimerEvent) -> TimerHandle;
    /// Returns false when the handle already fired (one-shot) or was cancelled.
    fn cancel(&mut self, handle: TimerHandle) -> bool;
}

#[derive(Debug, Clone)]
struct TimerEntry {
    due_ms: u64,
    period_ms: Option<u64>,
    event: TimerEvent,
}

#[derive(Debug, Clone, Serialize)]
pub struct FiredTimer {
    pub at_ms: u64,
    pub handle: TimerHandle,
    pub event: TimerEvent,
}

/// Deterministic timer wheel driven by the host loop.
///
/// Time only moves when the host calls [`VirtualClock::pop_due`] or
/// [`VirtualClock::settle`]. Timers fire one at a time in deadline order (ties
/// broken by creation order) so that a timer cancelled while another is being
/// dispatched never fires.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now_ms: u64,
    next_handle: u64,
    entries: BTreeMap<TimerHandle, TimerEntry>,
    history: Vec<FiredTimer>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn is_scheduled(&self, handle: TimerHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn history(&self) -> &[FiredTimer] {
        &self.history
    }

    /// Fires the earliest timer due at or before `until_ms`, moving the clock to
    /// its deadline. Repeating timers are re-armed under the same handle.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(TimerHandle, TimerEvent)> {
        let (handle, due_ms) = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.due_ms <= until_ms)
            .map(|(handle, entry)| (*handle, entry.due_ms))
            .min_by_key(|(handle, due_ms)| (*due_ms, *handle))?;

        self.now_ms = self.now_ms.max(due_ms);
        let period = self.entries.get(&handle)?.period_ms;
        // A repeating timer whose next deadline is past the end of time is retired.
        let event = match period.and_then(|period| due_ms.checked_add(period)) {
            Some(next_due) => {
                let entry = self.entries.get_mut(&handle)?;
                entry.due_ms = next_due;
                entry.event.clone()
            }
            None => self.entries.remove(&handle)?.event,
        };

        self.history.push(FiredTimer {
            at_ms: self.now_ms,
            handle,
            event: event.clone(),
        });
        Some((handle, event))
    }

    /// Moves the clock forward once every due timer has been popped.
    pub fn settle(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }

    fn insert(&mut self, delay_ms: u64, period_ms: Option<u64>, event: TimerEvent) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.entries.insert(
            handle,
            TimerEntry {
                due_ms: self.now_ms.saturating_add(delay_ms),
                period_ms,
                event,
            },
        );
        handle
    }
}

impl TimerService for VirtualClock {
    fn schedule_repeating(&mut self, period_ms: u64, event: TimerEvent) -> TimerHandle {
        // A zero period would spin forever inside a single advance.
        let period = period_ms.max(1);
        self.insert(period, Some(period), event)
    }

    fn schedule_once(&mut self, delay_ms: u64, event: TimerEvent) -> TimerHandle {
        self.insert(delay_ms, None, event)
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.entries.remove(&handle).is_some()
    }
}
