pub mod brightness;
pub mod client;
pub mod codec;
pub mod config;
pub mod display;
pub mod engine;
pub mod inputs;
pub mod presence;
pub mod request;
pub mod response;
pub mod timers;
pub mod topics;
pub mod types;

pub use brightness::Brightness;
pub use client::RemoteClient;
pub use codec::{parse, ParameterSet};
pub use config::{BrightnessConfig, DisplayConfig, NetworkConfig, RuntimeConfig, TimingConfig};
pub use display::{DisplayColor, DisplayFrame, DisplayLayout};
pub use engine::{EngineEvent, EngineStatus, ExamTimerEngine, Exchange};
pub use inputs::{Button, InputSource};
pub use presence::{PresenceEvent, PresenceTracker};
pub use request::Request;
pub use response::{StatusDecodeError, StatusReport, TimerReport};
pub use timers::{TimerBank, TimerEvent};
pub use topics::*;
pub use types::{EndpointId, EndpointStatus, Side, TimerId, TimerPhase};
