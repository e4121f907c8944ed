use crate::{
    config::TimingConfig,
    types::{TimerId, TimerPhase},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Started(TimerId),
    Stopped { timer: TimerId, result_ms: u64 },
    StopTooEarly { timer: TimerId, elapsed_ms: u64 },
    Reset(TimerId),
    IdleReset(TimerId),
}

/// One stopwatch. While `started_at_ms` is set the slot is running and
/// `result_ms` is stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerSlot {
    started_at_ms: Option<u64>,
    result_ms: u64,
    stopped_at_ms: Option<u64>,
}

impl TimerSlot {
    pub fn started_at_ms(&self) -> Option<u64> {
        self.started_at_ms
    }

    pub fn result_ms(&self) -> u64 {
        self.result_ms
    }

    pub fn stopped_at_ms(&self) -> Option<u64> {
        self.stopped_at_ms
    }

    pub fn is_running(&self) -> bool {
        self.started_at_ms.is_some()
    }

    pub fn phase(&self) -> TimerPhase {
        if self.started_at_ms.is_some() {
            TimerPhase::Running
        } else if self.stopped_at_ms.is_some() {
            TimerPhase::Stopped
        } else {
            TimerPhase::Idle
        }
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        match self.started_at_ms {
            Some(start) => now_ms.saturating_sub(start),
            None => self.result_ms,
        }
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone)]
pub struct TimerBank {
    config: TimingConfig,
    slots: [TimerSlot; 2],
    last_toggle_ms: [Option<u64>; 2],
}

impl TimerBank {
    pub fn new(config: TimingConfig) -> Self {
        Self {
            config,
            slots: [TimerSlot::default(); 2],
            last_toggle_ms: [None; 2],
        }
    }

    pub fn slot(&self, timer: TimerId) -> &TimerSlot {
        &self.slots[timer.index()]
    }

    pub fn is_running(&self, timer: TimerId) -> bool {
        self.slot(timer).is_running()
    }

    pub fn phase(&self, timer: TimerId) -> TimerPhase {
        self.slot(timer).phase()
    }

    pub fn result_ms(&self, timer: TimerId) -> u64 {
        self.slot(timer).result_ms()
    }

    pub fn elapsed_ms(&self, timer: TimerId, now_ms: u64) -> u64 {
        self.slot(timer).elapsed_ms(now_ms)
    }

    /// A slot is free when it is not running and either never produced a
    /// result or its result has been on display for the cool-down window.
    pub fn is_free(&self, timer: TimerId, now_ms: u64) -> bool {
        let slot = self.slot(timer);
        if slot.is_running() {
            return false;
        }
        if slot.result_ms == 0 {
            return true;
        }
        slot.stopped_at_ms
            .map(|stopped| now_ms.saturating_sub(stopped) > self.config.free_cooldown_ms)
            .unwrap_or(true)
    }

    pub fn start(&mut self, timer: TimerId, now_ms: u64) -> Option<TimerEvent> {
        let slot = &mut self.slots[timer.index()];
        if slot.is_running() {
            return None;
        }
        slot.started_at_ms = Some(now_ms);
        slot.stopped_at_ms = None;
        Some(TimerEvent::Started(timer))
    }

    pub fn stop(
        &mut self,
        timer: TimerId,
        now_ms: u64,
        ignore_min_duration: bool,
    ) -> Option<TimerEvent> {
        let min_run_ms = self.config.min_run_ms;
        let slot = &mut self.slots[timer.index()];
        let start = slot.started_at_ms?;
        let elapsed_ms = now_ms.saturating_sub(start);

        if !ignore_min_duration && elapsed_ms < min_run_ms {
            return Some(TimerEvent::StopTooEarly { timer, elapsed_ms });
        }

        slot.result_ms = elapsed_ms;
        slot.stopped_at_ms = Some(now_ms);
        slot.started_at_ms = None;
        Some(TimerEvent::Stopped {
            timer,
            result_ms: elapsed_ms,
        })
    }

    pub fn reset(&mut self, timer: TimerId) -> TimerEvent {
        self.slots[timer.index()].clear();
        TimerEvent::Reset(timer)
    }

    pub fn reset_all(&mut self) -> Vec<TimerEvent> {
        TimerId::ALL.into_iter().map(|timer| self.reset(timer)).collect()
    }

    /// Manual start/stop. Toggles closer together than the debounce window
    /// are dropped; a manual stop skips the minimum run guard.
    pub fn toggle(&mut self, timer: TimerId, now_ms: u64) -> Option<TimerEvent> {
        if let Some(last) = self.last_toggle_ms[timer.index()] {
            if now_ms.saturating_sub(last) < self.config.toggle_debounce_ms {
                return None;
            }
        }
        self.last_toggle_ms[timer.index()] = Some(now_ms);

        if self.is_running(timer) {
            self.stop(timer, now_ms, true)
        } else {
            self.start(timer, now_ms)
        }
    }

    pub fn idle_sweep(&mut self, now_ms: u64) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        for timer in TimerId::ALL {
            let Some(stopped) = self.slot(timer).stopped_at_ms else {
                continue;
            };
            if now_ms.saturating_sub(stopped) > self.config.idle_reset_ms {
                self.slots[timer.index()].clear();
                events.push(TimerEvent::IdleReset(timer));
            }
        }
        events
    }
}
