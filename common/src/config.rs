use serde::{Deserialize, Serialize};

use crate::display::{DisplayColor, SlotColorRule};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub min_run_ms: u64,
    pub toggle_debounce_ms: u64,
    pub idle_reset_ms: u64,
    pub free_cooldown_ms: u64,
    pub ping_interval_ms: u64,
    pub ping_grace_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            min_run_ms: 5_000,
            toggle_debounce_ms: 200,
            idle_reset_ms: 300_000,
            free_cooldown_ms: 8_000,
            ping_interval_ms: 2_000,
            ping_grace_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrightnessConfig {
    pub levels: Vec<u8>,
    pub initial_state: usize,
    pub cycle_debounce_ms: u64,
}

impl Default for BrightnessConfig {
    fn default() -> Self {
        Self {
            levels: vec![5, 10, 20, 40, 80],
            initial_state: 0,
            cycle_debounce_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub refresh_ms: u64,
    pub idle_color: DisplayColor,
    pub rules: [SlotColorRule; 2],
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_ms: 100,
            idle_color: DisplayColor::Blue,
            rules: [
                SlotColorRule {
                    base: DisplayColor::Red,
                    after: DisplayColor::Green,
                    switch_at_ms: 15_000,
                },
                SlotColorRule {
                    base: DisplayColor::Green,
                    after: DisplayColor::Red,
                    switch_at_ms: 26_000,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub http_port: u16,
    pub udp_port: u16,
    pub radio_relay_enabled: bool,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            udp_port: 404,
            radio_relay_enabled: false,
            mqtt_host: "127.0.0.1".to_string(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub timing: TimingConfig,
    pub brightness: BrightnessConfig,
    pub display: DisplayConfig,
    pub network: NetworkConfig,
}

impl RuntimeConfig {
    /// Parses a config document and sanitizes it. Missing sections and
    /// fields fall back to their defaults.
    pub fn from_json(raw: &[u8]) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_slice(raw)?;
        config.sanitize();
        Ok(config)
    }

    pub fn sanitize(&mut self) {
        self.timing.sanitize();
        self.brightness.sanitize();
        self.display.sanitize();
    }
}

impl TimingConfig {
    pub fn sanitize(&mut self) {
        self.min_run_ms = self.min_run_ms.min(60_000);
        self.toggle_debounce_ms = self.toggle_debounce_ms.clamp(20, 5_000);
        self.idle_reset_ms = self.idle_reset_ms.max(10_000);
        self.ping_interval_ms = self.ping_interval_ms.clamp(250, 60_000);
        self.ping_grace_ms = self.ping_grace_ms.min(10_000);
    }
}

impl BrightnessConfig {
    pub fn sanitize(&mut self) {
        if self.levels.is_empty() {
            self.levels = Self::default().levels;
        }
        if self.initial_state >= self.levels.len() {
            self.initial_state = 0;
        }
    }
}

impl DisplayConfig {
    pub fn sanitize(&mut self) {
        self.refresh_ms = self.refresh_ms.clamp(20, 5_000);
    }
}
