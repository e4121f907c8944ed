use crate::{
    config::TimingConfig,
    types::{EndpointId, EndpointStatus},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceEvent {
    Connected(EndpointId),
    Disconnected(EndpointId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresenceEndpoint {
    last_ping_ms: Option<u64>,
    waiting_for_pairing: bool,
}

impl PresenceEndpoint {
    pub fn last_ping_ms(&self) -> Option<u64> {
        self.last_ping_ms
    }

    pub fn status(&self) -> EndpointStatus {
        match self.last_ping_ms {
            None => EndpointStatus::Disconnected,
            Some(_) if self.waiting_for_pairing => EndpointStatus::WaitingForPairing,
            Some(_) => EndpointStatus::Connected,
        }
    }
}

/// Liveness of the four client endpoints, fed by pings and aged out by
/// periodic sweeps.
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    interval_ms: u64,
    grace_ms: u64,
    endpoints: [PresenceEndpoint; 4],
    last_sweep_ms: Option<u64>,
}

impl PresenceTracker {
    pub fn new(config: &TimingConfig) -> Self {
        Self {
            interval_ms: config.ping_interval_ms,
            grace_ms: config.ping_grace_ms,
            endpoints: [PresenceEndpoint::default(); 4],
            last_sweep_ms: None,
        }
    }

    pub fn endpoint(&self, endpoint: EndpointId) -> &PresenceEndpoint {
        &self.endpoints[endpoint.index()]
    }

    pub fn status(&self, endpoint: EndpointId) -> EndpointStatus {
        self.endpoint(endpoint).status()
    }

    pub fn ping(
        &mut self,
        endpoint: EndpointId,
        waiting: bool,
        now_ms: u64,
    ) -> Option<PresenceEvent> {
        let slot = &mut self.endpoints[endpoint.index()];
        let connected = slot.last_ping_ms.is_none();
        slot.last_ping_ms = Some(now_ms);
        slot.waiting_for_pairing = waiting;

        connected.then_some(PresenceEvent::Connected(endpoint))
    }

    /// Runs at most once per ping interval. An endpoint silent for longer
    /// than the interval plus grace is cleared and reported once.
    pub fn sweep(&mut self, now_ms: u64) -> Vec<PresenceEvent> {
        if let Some(last) = self.last_sweep_ms {
            if now_ms.saturating_sub(last) < self.interval_ms {
                return Vec::new();
            }
        }
        self.last_sweep_ms = Some(now_ms);

        let stale_after_ms = self.interval_ms + self.grace_ms;
        let mut events = Vec::new();
        for endpoint in EndpointId::ALL {
            let slot = &mut self.endpoints[endpoint.index()];
            let Some(last_ping) = slot.last_ping_ms else {
                continue;
            };
            if now_ms.saturating_sub(last_ping) > stale_after_ms {
                *slot = PresenceEndpoint::default();
                events.push(PresenceEvent::Disconnected(endpoint));
            }
        }
        events
    }
}
