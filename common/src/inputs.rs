use crate::types::TimerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Toggle(TimerId),
    ResetAll,
    CycleBrightness,
}

impl Button {
    pub const ALL: [Button; 4] = [
        Button::Toggle(TimerId::First),
        Button::Toggle(TimerId::Second),
        Button::ResetAll,
        Button::CycleBrightness,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Toggle(TimerId::First) => "t0",
            Self::Toggle(TimerId::Second) => "t1",
            Self::ResetAll => "reset",
            Self::CycleBrightness => "brightness",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|button| button.name() == name)
    }
}

/// Physical buttons, polled once per control loop tick. Implementors do
/// their own edge detection and report a press once.
pub trait InputSource {
    fn is_pressed(&self, button: Button) -> bool;
}
