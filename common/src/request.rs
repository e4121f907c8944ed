use crate::{
    codec::{self, ParameterSet},
    types::{EndpointId, Side, TimerId},
};

// Long names first; deployed client devices send the one-letter forms.
pub const KEY_TIMER: &[&str] = &["timer", "t"];
pub const KEY_RESET: &[&str] = &["reset", "r"];
pub const KEY_STOP_SIDE: &[&str] = &["stop-side", "s"];
pub const KEY_PING: &[&str] = &["ping", "p"];
pub const KEY_WAIT: &[&str] = &["wait", "w"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Noop,
    Reset(TimerId),
    Ping { endpoint: EndpointId, waiting: bool },
    SetRunning { endpoint: EndpointId },
    Toggle(TimerId),
}

impl Request {
    pub fn parse(message: &str) -> Self {
        Self::from_params(&codec::parse(message))
    }

    /// Classifies a parameter set. Reset beats everything else, and a ping
    /// is only recognised together with an explicit side.
    pub fn from_params(params: &ParameterSet) -> Self {
        let Some(timer) = params.get_any(KEY_TIMER).map(TimerId::from_wire) else {
            return Self::Noop;
        };

        if params.contains_any(KEY_RESET) {
            return Self::Reset(timer);
        }

        let Some(side) = params.get_any(KEY_STOP_SIDE).map(Side::from_wire) else {
            return Self::Toggle(timer);
        };
        let endpoint = EndpointId::new(timer, side);

        if params.contains_any(KEY_PING) {
            let waiting = params.get_any(KEY_WAIT) == Some("1");
            Self::Ping { endpoint, waiting }
        } else {
            Self::SetRunning { endpoint }
        }
    }

    /// Wire form using the long key names. `Noop` has no wire form.
    pub fn to_message(&self) -> Option<String> {
        let mut params = ParameterSet::new();
        match *self {
            Self::Noop => return None,
            Self::Reset(timer) => {
                params.insert(KEY_RESET[0], "1");
                params.insert(KEY_TIMER[0], timer.as_wire());
            }
            Self::Ping { endpoint, waiting } => {
                params.insert(KEY_PING[0], "1");
                params.insert(KEY_TIMER[0], endpoint.timer.as_wire());
                params.insert(KEY_STOP_SIDE[0], endpoint.side.as_wire());
                if waiting {
                    params.insert(KEY_WAIT[0], "1");
                }
            }
            Self::SetRunning { endpoint } => {
                params.insert(KEY_TIMER[0], endpoint.timer.as_wire());
                params.insert(KEY_STOP_SIDE[0], endpoint.side.as_wire());
            }
            Self::Toggle(timer) => {
                params.insert(KEY_TIMER[0], timer.as_wire());
            }
        }
        Some(params.encode())
    }
}
