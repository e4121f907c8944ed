use crate::config::BrightnessConfig;

/// Position in a fixed table of display brightness levels.
#[derive(Debug, Clone)]
pub struct Brightness {
    levels: Vec<u8>,
    state: usize,
    debounce_ms: u64,
    last_cycle_ms: Option<u64>,
}

impl Brightness {
    pub fn new(mut config: BrightnessConfig) -> Self {
        config.sanitize();
        Self {
            levels: config.levels,
            state: config.initial_state,
            debounce_ms: config.cycle_debounce_ms,
            last_cycle_ms: None,
        }
    }

    pub fn state(&self) -> usize {
        self.state
    }

    pub fn level(&self) -> u8 {
        self.levels[self.state]
    }

    /// Steps to the next level, wrapping after the last one. Returns the new
    /// level, or `None` when the press falls inside the debounce window.
    pub fn cycle(&mut self, now_ms: u64) -> Option<u8> {
        if let Some(last) = self.last_cycle_ms {
            if now_ms.saturating_sub(last) < self.debounce_ms {
                return None;
            }
        }
        self.last_cycle_ms = Some(now_ms);
        self.state = (self.state + 1) % self.levels.len();
        Some(self.level())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_and_wraps() {
        let mut brightness = Brightness::new(BrightnessConfig::default());
        let mut observed = vec![brightness.level()];

        for step in 1..=5u64 {
            observed.push(brightness.cycle(step * 1_000).unwrap());
        }

        assert_eq!(observed, vec![5, 10, 20, 40, 80, 5]);
        assert_eq!(brightness.state(), 0);
    }

    #[test]
    fn presses_inside_debounce_are_ignored() {
        let mut brightness = Brightness::new(BrightnessConfig::default());
        assert_eq!(brightness.cycle(1_000), Some(10));
        assert_eq!(brightness.cycle(1_150), None);
        assert_eq!(brightness.cycle(1_200), Some(20));
    }

    #[test]
    fn empty_table_falls_back_to_defaults() {
        let brightness = Brightness::new(BrightnessConfig {
            levels: Vec::new(),
            initial_state: 3,
            cycle_debounce_ms: 200,
        });
        assert_eq!(brightness.level(), 5);
    }
}
