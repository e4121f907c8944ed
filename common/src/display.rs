//! What the LED matrix should show. Pixel placement and fonts belong to the
//! renderer; this module only decides digits and colours.

use serde::{Deserialize, Serialize};

use crate::{
    config::DisplayConfig,
    presence::PresenceTracker,
    timers::TimerBank,
    types::{EndpointId, EndpointStatus, TimerId, TimerPhase},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayColor {
    Blue,
    Red,
    Green,
    Yellow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayLayout {
    /// `m:ss:d` per timer with pairing indicators.
    Full,
    /// `ss:d` per timer, both on one row.
    Compact,
}

/// Colour of an active slot: `base` until `switch_at_ms` of elapsed time,
/// `after` from then on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotColorRule {
    pub base: DisplayColor,
    pub after: DisplayColor,
    pub switch_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerFace {
    pub timer: TimerId,
    pub color: DisplayColor,
    pub minutes: u64,
    pub seconds: u8,
    pub tenths: u8,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayFrame {
    pub layout: DisplayLayout,
    pub faces: [TimerFace; 2],
    pub indicators: [DisplayColor; 4],
}

impl DisplayFrame {
    pub fn compose(
        config: &DisplayConfig,
        layout: DisplayLayout,
        timers: &TimerBank,
        presence: &PresenceTracker,
        now_ms: u64,
    ) -> Self {
        let face = |timer: TimerId| {
            TimerFace::compose(config, layout, timer, timers, now_ms)
        };
        let indicator = |endpoint: EndpointId| indicator_color(presence.status(endpoint), layout);

        Self {
            layout,
            faces: [face(TimerId::First), face(TimerId::Second)],
            indicators: EndpointId::ALL.map(indicator),
        }
    }
}

impl TimerFace {
    fn compose(
        config: &DisplayConfig,
        layout: DisplayLayout,
        timer: TimerId,
        timers: &TimerBank,
        now_ms: u64,
    ) -> Self {
        let elapsed_ms = timers.elapsed_ms(timer, now_ms);
        let active = timers.phase(timer) == TimerPhase::Running || elapsed_ms > 0;

        let color = if active {
            let rule = &config.rules[timer.index()];
            if elapsed_ms >= rule.switch_at_ms {
                rule.after
            } else {
                rule.base
            }
        } else {
            config.idle_color
        };

        let total_tenths = elapsed_ms / 100;
        let total_seconds = total_tenths / 10;
        let minutes = total_seconds / 60;
        let seconds = (total_seconds % 60) as u8;
        let tenths = (total_tenths % 10) as u8;

        let text = match layout {
            DisplayLayout::Full => format!("{minutes}:{seconds:02}:{tenths}"),
            DisplayLayout::Compact => format!("{seconds:02}:{tenths}"),
        };

        Self {
            timer,
            color,
            minutes,
            seconds,
            tenths,
            text,
        }
    }
}

/// The compact layout has no room for the pairing colour.
pub fn indicator_color(status: EndpointStatus, layout: DisplayLayout) -> DisplayColor {
    match (status, layout) {
        (EndpointStatus::Disconnected, _) => DisplayColor::Red,
        (EndpointStatus::WaitingForPairing, DisplayLayout::Full) => DisplayColor::Yellow,
        (EndpointStatus::Connected | EndpointStatus::WaitingForPairing, _) => DisplayColor::Green,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::TimingConfig, types::Side};
    use pretty_assertions::assert_eq;

    fn setup() -> (DisplayConfig, TimerBank, PresenceTracker) {
        let timing = TimingConfig::default();
        (
            DisplayConfig::default(),
            TimerBank::new(timing.clone()),
            PresenceTracker::new(&timing),
        )
    }

    #[test]
    fn idle_frame_is_blue_zeroes() {
        let (config, timers, presence) = setup();

        let frame = DisplayFrame::compose(&config, DisplayLayout::Full, &timers, &presence, 0);

        assert_eq!(frame.faces[0].text, "0:00:0");
        assert_eq!(frame.faces[0].color, DisplayColor::Blue);
        assert_eq!(frame.faces[1].color, DisplayColor::Blue);
        assert_eq!(frame.indicators, [DisplayColor::Red; 4]);
    }

    #[test]
    fn first_timer_turns_green_at_fifteen_seconds() {
        let (config, mut timers, presence) = setup();
        timers.start(TimerId::First, 0);

        let before = DisplayFrame::compose(&config, DisplayLayout::Full, &timers, &presence, 14_999);
        let after = DisplayFrame::compose(&config, DisplayLayout::Full, &timers, &presence, 15_000);

        assert_eq!(before.faces[0].color, DisplayColor::Red);
        assert_eq!(before.faces[0].text, "0:14:9");
        assert_eq!(after.faces[0].color, DisplayColor::Green);
    }

    #[test]
    fn second_timer_turns_red_past_limit() {
        let (config, mut timers, presence) = setup();
        timers.start(TimerId::Second, 0);
        timers.stop(TimerId::Second, 83_450, false);

        let frame = DisplayFrame::compose(&config, DisplayLayout::Compact, &timers, &presence, 90_000);
        let face = &frame.faces[1];

        assert_eq!(face.color, DisplayColor::Red);
        assert_eq!((face.minutes, face.seconds, face.tenths), (1, 23, 4));
        assert_eq!(face.text, "23:4");
    }

    #[test]
    fn indicators_reflect_presence() {
        let (config, timers, mut presence) = setup();
        presence.ping(EndpointId::new(TimerId::First, Side::Stop), true, 0);
        presence.ping(EndpointId::new(TimerId::Second, Side::Start), false, 0);

        let full = DisplayFrame::compose(&config, DisplayLayout::Full, &timers, &presence, 10);
        let compact = DisplayFrame::compose(&config, DisplayLayout::Compact, &timers, &presence, 10);

        assert_eq!(
            full.indicators,
            [
                DisplayColor::Red,
                DisplayColor::Yellow,
                DisplayColor::Green,
                DisplayColor::Red
            ]
        );
        assert_eq!(compact.indicators[1], DisplayColor::Green);
    }
}
