use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerId {
    First,
    Second,
}

impl TimerId {
    pub const ALL: [TimerId; 2] = [TimerId::First, TimerId::Second];

    pub fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }

    /// `"0"` selects the first timer, any other value the second.
    pub fn from_wire(value: &str) -> Self {
        if value == "0" {
            Self::First
        } else {
            Self::Second
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            Self::First => "0",
            Self::Second => "1",
        }
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.index())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Start,
    Stop,
}

impl Side {
    pub fn index(self) -> usize {
        match self {
            Self::Start => 0,
            Self::Stop => 1,
        }
    }

    /// `"0"` is the start side, any other value the stop side.
    pub fn from_wire(value: &str) -> Self {
        if value == "0" {
            Self::Start
        } else {
            Self::Stop
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Start => "0",
            Self::Stop => "1",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Stop => "STOP",
        }
    }
}

/// One of the four presence endpoints: a client device sits at the start or
/// the stop end of one timer's run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointId {
    pub timer: TimerId,
    pub side: Side,
}

impl EndpointId {
    pub const ALL: [EndpointId; 4] = [
        EndpointId::new(TimerId::First, Side::Start),
        EndpointId::new(TimerId::First, Side::Stop),
        EndpointId::new(TimerId::Second, Side::Start),
        EndpointId::new(TimerId::Second, Side::Stop),
    ];

    pub const fn new(timer: TimerId, side: Side) -> Self {
        Self { timer, side }
    }

    pub fn index(self) -> usize {
        self.timer.index() * 2 + self.side.index()
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}][{}]", self.timer, self.side.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerPhase {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndpointStatus {
    Disconnected,
    Connected,
    WaitingForPairing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_indices_follow_timer_then_side() {
        let indices: Vec<usize> = EndpointId::ALL.iter().map(|e| e.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn wire_values_other_than_zero_select_second() {
        assert_eq!(TimerId::from_wire("0"), TimerId::First);
        assert_eq!(TimerId::from_wire("1"), TimerId::Second);
        assert_eq!(TimerId::from_wire("7"), TimerId::Second);
        assert_eq!(TimerId::from_wire(""), TimerId::Second);
        assert_eq!(Side::from_wire("0"), Side::Start);
        assert_eq!(Side::from_wire("yes"), Side::Stop);
    }

    #[test]
    fn endpoint_label_matches_log_format() {
        let endpoint = EndpointId::new(TimerId::Second, Side::Stop);
        assert_eq!(endpoint.to_string(), "[T1][STOP]");
    }
}
