use serde::Serialize;

use crate::{
    brightness::Brightness,
    config::RuntimeConfig,
    display::{DisplayFrame, DisplayLayout},
    inputs::{Button, InputSource},
    presence::{PresenceEvent, PresenceTracker},
    request::Request,
    response::{StatusReport, TimerReport},
    timers::{TimerBank, TimerEvent},
    types::{EndpointId, EndpointStatus, Side, TimerId, TimerPhase},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Timer(TimerEvent),
    Presence(PresenceEvent),
    BrightnessChanged(u8),
}

/// Reply to one inbound message plus whatever happened while handling it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub request: Request,
    pub reply: String,
    pub events: Vec<EngineEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimerView {
    pub phase: TimerPhase,
    #[serde(flatten)]
    pub report: TimerReport,
    #[serde(rename = "resultMs")]
    pub result_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointView {
    pub timer: TimerId,
    pub side: Side,
    pub status: EndpointStatus,
    #[serde(rename = "lastPingAgeMs")]
    pub last_ping_age_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub brightness: u8,
    #[serde(rename = "brightnessState")]
    pub brightness_state: usize,
    pub timers: Vec<TimerView>,
    pub endpoints: Vec<EndpointView>,
}

/// Owns both timers, the four presence endpoints and the brightness
/// selection. Every mutation goes through `dispatch` or `tick`.
#[derive(Debug, Clone)]
pub struct ExamTimerEngine {
    pub config: RuntimeConfig,
    timers: TimerBank,
    presence: PresenceTracker,
    brightness: Brightness,
}

impl ExamTimerEngine {
    pub fn new(mut config: RuntimeConfig) -> Self {
        config.sanitize();
        Self {
            timers: TimerBank::new(config.timing.clone()),
            presence: PresenceTracker::new(&config.timing),
            brightness: Brightness::new(config.brightness.clone()),
            config,
        }
    }

    pub fn timers(&self) -> &TimerBank {
        &self.timers
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn brightness(&self) -> &Brightness {
        &self.brightness
    }

    /// Parses, dispatches and answers one wire message.
    pub fn handle_message(&mut self, message: &str, now_ms: u64) -> Exchange {
        let request = Request::parse(message);
        let events = self.dispatch(request, now_ms);
        Exchange {
            request,
            reply: self.response(now_ms),
            events,
        }
    }

    pub fn dispatch(&mut self, request: Request, now_ms: u64) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        match request {
            Request::Noop => {}
            Request::Reset(timer) => {
                events.push(EngineEvent::Timer(self.timers.reset(timer)));
            }
            Request::Ping { endpoint, waiting } => {
                if let Some(event) = self.presence.ping(endpoint, waiting, now_ms) {
                    events.push(EngineEvent::Presence(event));
                }
            }
            Request::SetRunning { endpoint } => {
                let event = match endpoint.side {
                    Side::Start => self.timers.start(endpoint.timer, now_ms),
                    Side::Stop => self.timers.stop(endpoint.timer, now_ms, false),
                };
                events.extend(event.map(EngineEvent::Timer));
            }
            Request::Toggle(timer) => {
                events.extend(self.timers.toggle(timer, now_ms).map(EngineEvent::Timer));
            }
        }
        events
    }

    /// One control loop pass: buttons, presence sweep, idle sweep.
    pub fn tick(&mut self, now_ms: u64, inputs: &impl InputSource) -> Vec<EngineEvent> {
        let mut events = Vec::new();

        for timer in TimerId::ALL {
            if inputs.is_pressed(Button::Toggle(timer)) {
                events.extend(self.timers.toggle(timer, now_ms).map(EngineEvent::Timer));
            }
        }
        if inputs.is_pressed(Button::ResetAll) {
            events.extend(self.timers.reset_all().into_iter().map(EngineEvent::Timer));
        }
        if inputs.is_pressed(Button::CycleBrightness) {
            events.extend(self.brightness.cycle(now_ms).map(EngineEvent::BrightnessChanged));
        }

        events.extend(
            self.presence
                .sweep(now_ms)
                .into_iter()
                .map(EngineEvent::Presence),
        );
        events.extend(
            self.timers
                .idle_sweep(now_ms)
                .into_iter()
                .map(EngineEvent::Timer),
        );

        events
    }

    pub fn report(&self, now_ms: u64) -> StatusReport {
        StatusReport::capture(&self.timers, &self.brightness, now_ms)
    }

    pub fn response(&self, now_ms: u64) -> String {
        self.report(now_ms).to_wire()
    }

    pub fn display_frame(&self, layout: DisplayLayout, now_ms: u64) -> DisplayFrame {
        DisplayFrame::compose(
            &self.config.display,
            layout,
            &self.timers,
            &self.presence,
            now_ms,
        )
    }

    pub fn status(&self, now_ms: u64) -> EngineStatus {
        let report = self.report(now_ms);
        EngineStatus {
            brightness: report.brightness,
            brightness_state: self.brightness.state(),
            timers: TimerId::ALL
                .into_iter()
                .map(|timer| TimerView {
                    phase: self.timers.phase(timer),
                    report: *report.timer(timer),
                    result_ms: self.timers.result_ms(timer),
                })
                .collect(),
            endpoints: EndpointId::ALL
                .into_iter()
                .map(|endpoint| EndpointView {
                    timer: endpoint.timer,
                    side: endpoint.side,
                    status: self.presence.status(endpoint),
                    last_ping_age_ms: self
                        .presence
                        .endpoint(endpoint)
                        .last_ping_ms()
                        .map(|last| now_ms.saturating_sub(last)),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Pressed(Vec<Button>);

    impl InputSource for Pressed {
        fn is_pressed(&self, button: Button) -> bool {
            self.0.contains(&button)
        }
    }

    fn engine() -> ExamTimerEngine {
        ExamTimerEngine::new(RuntimeConfig::default())
    }

    #[test]
    fn remote_start_then_reset_round_trip() {
        let mut engine = engine();

        let first = engine.handle_message("timer=0&stop-side=0", 1_000);
        assert_eq!(
            first.events,
            vec![EngineEvent::Timer(TimerEvent::Started(TimerId::First))]
        );
        assert_eq!(first.reply, "b=5&s0=0&t0=0&r0=1&s1=1&t1=0&r1=0");

        let later = StatusReport::from_wire(&engine.handle_message("", 1_500).reply).unwrap();
        let latest = StatusReport::from_wire(&engine.handle_message("", 2_750).reply).unwrap();
        assert_eq!(later.timers[0].elapsed_ms, 500);
        assert_eq!(latest.timers[0].elapsed_ms, 1_750);
        assert!(latest.timers[0].running);

        let reset = engine.handle_message("timer=0&reset=1", 3_000);
        assert!(reset.reply.contains("s0=1&t0=0&r0=0"));
        assert_eq!(reset.request, Request::Reset(TimerId::First));
    }

    #[test]
    fn remote_stop_respects_minimum_run() {
        let mut engine = engine();
        engine.handle_message("timer=1&stop-side=0", 0);

        let early = engine.handle_message("timer=1&stop-side=1", 4_000);
        assert_eq!(
            early.events,
            vec![EngineEvent::Timer(TimerEvent::StopTooEarly {
                timer: TimerId::Second,
                elapsed_ms: 4_000
            })]
        );
        assert!(engine.timers().is_running(TimerId::Second));

        let stopped = engine.handle_message("timer=1&stop-side=1", 6_000);
        assert!(stopped.reply.ends_with("s1=0&t1=6000&r1=0"));
    }

    #[test]
    fn reset_with_ping_does_not_ping() {
        let mut engine = engine();
        let exchange = engine.handle_message("timer=0&reset=1&ping=1&stop-side=0", 10);

        assert_eq!(
            exchange.events,
            vec![EngineEvent::Timer(TimerEvent::Reset(TimerId::First))]
        );
        let endpoint = EndpointId::new(TimerId::First, Side::Start);
        assert_eq!(
            engine.presence().status(endpoint),
            EndpointStatus::Disconnected
        );
    }

    #[test]
    fn ping_connects_and_tick_disconnects() {
        let mut engine = engine();
        let endpoint = EndpointId::new(TimerId::Second, Side::Stop);

        let exchange = engine.handle_message("ping=1&timer=1&stop-side=1", 100);
        assert_eq!(
            exchange.events,
            vec![EngineEvent::Presence(PresenceEvent::Connected(endpoint))]
        );
        assert!(engine.handle_message("p=1&t=1&s=1", 1_000).events.is_empty());

        let inputs = Pressed::default();
        assert!(engine.tick(2_000, &inputs).is_empty());
        assert_eq!(
            engine.tick(4_000, &inputs),
            vec![EngineEvent::Presence(PresenceEvent::Disconnected(endpoint))]
        );
    }

    #[test]
    fn malformed_messages_only_report_status() {
        let mut engine = engine();
        for message in ["", "&&", "garbage", "=1", "stop-side=1&ping=1"] {
            let exchange = engine.handle_message(message, 50);
            assert_eq!(exchange.request, Request::Noop);
            assert!(exchange.events.is_empty());
            assert_eq!(exchange.reply, "b=5&s0=1&t0=0&r0=0&s1=1&t1=0&r1=0");
        }
    }

    #[test]
    fn buttons_toggle_reset_and_cycle_brightness() {
        let mut engine = engine();

        let events = engine.tick(
            1_000,
            &Pressed(vec![Button::Toggle(TimerId::First), Button::CycleBrightness]),
        );
        assert_eq!(
            events,
            vec![
                EngineEvent::Timer(TimerEvent::Started(TimerId::First)),
                EngineEvent::BrightnessChanged(10),
            ]
        );

        // Button still held on the next tick: debounced.
        let held = engine.tick(1_050, &Pressed(vec![Button::Toggle(TimerId::First)]));
        assert!(held.is_empty());

        let stop = engine.tick(2_000, &Pressed(vec![Button::Toggle(TimerId::First)]));
        assert_eq!(
            stop,
            vec![EngineEvent::Timer(TimerEvent::Stopped {
                timer: TimerId::First,
                result_ms: 1_000
            })]
        );

        let reset = engine.tick(2_100, &Pressed(vec![Button::ResetAll]));
        assert_eq!(reset.len(), 2);
        assert_eq!(engine.response(2_100), "b=10&s0=1&t0=0&r0=0&s1=1&t1=0&r1=0");
    }

    #[test]
    fn tick_runs_idle_reset() {
        let mut engine = engine();
        engine.handle_message("timer=0", 0);
        engine.handle_message("timer=0", 1_000);
        assert_eq!(engine.timers().phase(TimerId::First), TimerPhase::Stopped);

        let events = engine.tick(301_001, &Pressed::default());

        assert_eq!(
            events,
            vec![EngineEvent::Timer(TimerEvent::IdleReset(TimerId::First))]
        );
        assert_eq!(engine.timers().phase(TimerId::First), TimerPhase::Idle);
    }

    #[test]
    fn status_view_lists_every_endpoint() {
        let mut engine = engine();
        engine.handle_message("ping=1&timer=0&stop-side=0&wait=1", 500);

        let status = engine.status(800);

        assert_eq!(status.timers.len(), 2);
        assert_eq!(status.endpoints.len(), 4);
        assert_eq!(
            status.endpoints[0].status,
            EndpointStatus::WaitingForPairing
        );
        assert_eq!(status.endpoints[0].last_ping_age_ms, Some(300));
        assert_eq!(status.endpoints[3].last_ping_age_ms, None);
    }
}
