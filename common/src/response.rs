use serde::Serialize;
use thiserror::Error;

use crate::{
    brightness::Brightness,
    codec,
    timers::TimerBank,
    types::TimerId,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatusDecodeError {
    #[error("status field `{0}` is missing")]
    MissingField(String),
    #[error("status field `{field}` has invalid value `{value}`")]
    InvalidValue { field: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimerReport {
    pub free: bool,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    pub running: bool,
}

/// The status line sent back for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub brightness: u8,
    pub timers: [TimerReport; 2],
}

impl StatusReport {
    pub fn capture(timers: &TimerBank, brightness: &Brightness, now_ms: u64) -> Self {
        let report = |timer: TimerId| TimerReport {
            free: timers.is_free(timer, now_ms),
            elapsed_ms: timers.elapsed_ms(timer, now_ms),
            running: timers.is_running(timer),
        };
        Self {
            brightness: brightness.level(),
            timers: [report(TimerId::First), report(TimerId::Second)],
        }
    }

    pub fn timer(&self, timer: TimerId) -> &TimerReport {
        &self.timers[timer.index()]
    }

    /// `b=..&s0=..&t0=..&r0=..&s1=..&t1=..&r1=..`
    pub fn to_wire(&self) -> String {
        let mut fields = vec![("b".to_string(), self.brightness.to_string())];
        for (i, report) in self.timers.iter().enumerate() {
            fields.push((format!("s{i}"), flag(report.free).to_string()));
            fields.push((format!("t{i}"), report.elapsed_ms.to_string()));
            fields.push((format!("r{i}"), flag(report.running).to_string()));
        }
        codec::encode(fields)
    }

    pub fn from_wire(message: &str) -> Result<Self, StatusDecodeError> {
        let params = codec::parse(message);
        let field = |name: &str| {
            params
                .get(name)
                .ok_or_else(|| StatusDecodeError::MissingField(name.to_string()))
        };
        let invalid = |name: &str, value: &str| StatusDecodeError::InvalidValue {
            field: name.to_string(),
            value: value.to_string(),
        };
        let number = |name: &str| -> Result<u64, StatusDecodeError> {
            let value = field(name)?;
            value.parse::<u64>().map_err(|_| invalid(name, value))
        };
        let boolean = |name: &str| -> Result<bool, StatusDecodeError> {
            match field(name)? {
                "0" => Ok(false),
                "1" => Ok(true),
                other => Err(invalid(name, other)),
            }
        };

        let raw_brightness = field("b")?;
        let brightness = raw_brightness
            .parse::<u8>()
            .map_err(|_| invalid("b", raw_brightness))?;

        let mut timers = [TimerReport {
            free: true,
            elapsed_ms: 0,
            running: false,
        }; 2];
        for (i, report) in timers.iter_mut().enumerate() {
            report.free = boolean(&format!("s{i}"))?;
            report.elapsed_ms = number(&format!("t{i}"))?;
            report.running = boolean(&format!("r{i}"))?;
        }

        Ok(Self { brightness, timers })
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BrightnessConfig, TimingConfig};
    use pretty_assertions::assert_eq;

    #[test]
    fn each_timer_reports_its_own_fields() {
        let mut timers = TimerBank::new(TimingConfig::default());
        let brightness = Brightness::new(BrightnessConfig::default());
        timers.start(TimerId::First, 1_000);
        timers.start(TimerId::Second, 0);
        timers.stop(TimerId::Second, 9_000, false);

        let report = StatusReport::capture(&timers, &brightness, 11_000);

        assert_eq!(report.to_wire(), "b=5&s0=0&t0=10000&r0=1&s1=0&t1=9000&r1=0");
    }

    #[test]
    fn idle_bank_reports_free_zeroes() {
        let timers = TimerBank::new(TimingConfig::default());
        let brightness = Brightness::new(BrightnessConfig::default());

        let report = StatusReport::capture(&timers, &brightness, 42);

        assert_eq!(report.to_wire(), "b=5&s0=1&t0=0&r0=0&s1=1&t1=0&r1=0");
    }

    #[test]
    fn decodes_wire_form() {
        let report = StatusReport::from_wire("b=20&s0=0&t0=1234&r0=1&s1=1&t1=0&r1=0\0").unwrap();

        assert_eq!(report.brightness, 20);
        assert_eq!(
            *report.timer(TimerId::First),
            TimerReport {
                free: false,
                elapsed_ms: 1_234,
                running: true
            }
        );
        assert!(report.timer(TimerId::Second).free);
    }

    #[test]
    fn decode_reports_missing_and_invalid_fields() {
        assert_eq!(
            StatusReport::from_wire("b=20&s0=0&t0=1&r0=1"),
            Err(StatusDecodeError::MissingField("s1".to_string()))
        );
        assert_eq!(
            StatusReport::from_wire("b=20&s0=0&t0=abc&r0=1&s1=1&t1=0&r1=0"),
            Err(StatusDecodeError::InvalidValue {
                field: "t0".to_string(),
                value: "abc".to_string()
            })
        );
    }
}
