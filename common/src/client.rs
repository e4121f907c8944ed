use crate::{
    request::Request,
    types::{EndpointId, Side, TimerId},
};

/// Message logic of a remote client device. The device is wired to one
/// timer and one end of the run by its two selector switches.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    endpoint: EndpointId,
    waiting: bool,
    ping_interval_ms: u64,
    last_ping_ms: Option<u64>,
}

impl RemoteClient {
    pub fn new(timer: TimerId, side: Side, ping_interval_ms: u64) -> Self {
        Self {
            endpoint: EndpointId::new(timer, side),
            waiting: false,
            ping_interval_ms,
            last_ping_ms: None,
        }
    }

    pub fn endpoint(&self) -> EndpointId {
        self.endpoint
    }

    /// Switch positions can change while the device is running.
    pub fn set_selection(&mut self, timer: TimerId, side: Side) {
        self.endpoint = EndpointId::new(timer, side);
    }

    pub fn set_waiting(&mut self, waiting: bool) {
        self.waiting = waiting;
    }

    pub fn start_message(&self) -> String {
        self.encode(Request::SetRunning {
            endpoint: self.endpoint,
        })
    }

    pub fn reset_message(&self) -> String {
        // The side rides along for servers that log it.
        format!(
            "{}&stop-side={}",
            self.encode(Request::Reset(self.endpoint.timer)),
            self.endpoint.side.as_wire()
        )
    }

    pub fn ping_message(&self) -> String {
        self.encode(Request::Ping {
            endpoint: self.endpoint,
            waiting: self.waiting,
        })
    }

    /// Returns a ping when the interval has passed since the last one.
    pub fn poll_ping(&mut self, now_ms: u64) -> Option<String> {
        if let Some(last) = self.last_ping_ms {
            if now_ms.saturating_sub(last) < self.ping_interval_ms {
                return None;
            }
        }
        self.last_ping_ms = Some(now_ms);
        Some(self.ping_message())
    }

    fn encode(&self, request: Request) -> String {
        request.to_message().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_messages_for_selected_endpoint() {
        let mut client = RemoteClient::new(TimerId::Second, Side::Stop, 2_000);

        assert_eq!(client.start_message(), "timer=1&stop-side=1");
        assert_eq!(client.reset_message(), "reset=1&timer=1&stop-side=1");
        assert_eq!(client.ping_message(), "ping=1&timer=1&stop-side=1");

        client.set_waiting(true);
        client.set_selection(TimerId::First, Side::Start);
        assert_eq!(client.ping_message(), "ping=1&timer=0&stop-side=0&wait=1");
    }

    #[test]
    fn reset_message_still_classifies_as_reset() {
        let client = RemoteClient::new(TimerId::First, Side::Stop, 2_000);
        assert_eq!(
            Request::parse(&client.reset_message()),
            Request::Reset(TimerId::First)
        );
    }

    #[test]
    fn pings_are_rate_limited() {
        let mut client = RemoteClient::new(TimerId::First, Side::Start, 2_000);

        assert!(client.poll_ping(0).is_some());
        assert!(client.poll_ping(1_999).is_none());
        assert!(client.poll_ping(2_000).is_some());
        assert!(client.poll_ping(2_500).is_none());
    }
}
