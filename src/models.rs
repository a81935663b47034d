use serde::Deserialize;
use std::fmt;
use time::OffsetDateTime;

/// Sentinel shown until the first prediction arrives.
pub const NO_PREDICTION: &str = "-";

pub const DEFAULT_LED_COLOR: &str = "OFF";

#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub time: OffsetDateTime,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub soil_moisture: Option<f64>,
}

/// Wire format of the sensor topic. Missing or null fields stay absent.
#[derive(Debug, Clone, Deserialize)]
pub struct SensorPayload {
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub hum: Option<f64>,
    #[serde(default)]
    pub soil: Option<f64>,
}

impl SensorPayload {
    pub fn into_reading(self, time: OffsetDateTime) -> SensorReading {
        SensorReading {
            time,
            temperature: self.temp,
            humidity: self.hum,
            soil_moisture: self.soil,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Level {
    Info,
    Warning,
    High,
    Critical,
    Error,
    Other(String),
}

impl Level {
    /// Level names are case-sensitive.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "INFO" => Level::Info,
            "WARNING" => Level::Warning,
            "HIGH" => Level::High,
            "CRITICAL" => Level::Critical,
            "ERROR" => Level::Error,
            other => Level::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "INFO"),
            Level::Warning => write!(f, "WARNING"),
            Level::High => write!(f, "HIGH"),
            Level::Critical => write!(f, "CRITICAL"),
            Level::Error => write!(f, "ERROR"),
            Level::Other(tag) => write!(f, "{}", tag),
        }
    }
}

/// Typed form of a `[LEVEL]key` prediction label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionLabel {
    pub level: Level,
    pub key: String,
}

impl PredictionLabel {
    /// Parse `[LEVEL]key`
    ///
    /// LEVEL is the text between the first `[` and the first `]`, key is the
    /// trimmed remainder. Returns None when the text does not start with `[`
    /// or has no closing `]`, which callers present as "not yet available".
    pub fn parse(raw: &str) -> Option<Self> {
        if !raw.starts_with('[') {
            return None;
        }
        let level_end = raw.find(']')?;
        Some(PredictionLabel {
            level: Level::from_tag(&raw[1..level_end]),
            key: raw[level_end + 1..].trim().to_string(),
        })
    }
}

/// Prediction as received from the broker, parsed once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    raw: String,
    label: Option<PredictionLabel>,
}

impl Prediction {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let label = PredictionLabel::parse(&raw);
        Prediction { raw, label }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn label(&self) -> Option<&PredictionLabel> {
        self.label.as_ref()
    }
}

impl Default for Prediction {
    fn default() -> Self {
        Prediction::new(NO_PREDICTION)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActuatorOutput {
    #[serde(default = "default_led_color")]
    pub led_color: String,
    #[serde(default)]
    pub buzzer_on: bool,
}

fn default_led_color() -> String {
    DEFAULT_LED_COLOR.to_string()
}

impl Default for ActuatorOutput {
    fn default() -> Self {
        ActuatorOutput {
            led_color: default_led_color(),
            buzzer_on: false,
        }
    }
}

/// A sensor reading together with the prediction current when it arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub reading: SensorReading,
    pub prediction: Prediction,
}
