use std::env;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::state::RetentionPolicy;

const DEFAULT_BROKER_URL: &str = "mqtt://broker.hivemq.com:1883";
const DEFAULT_MQTT_PORT: u16 = 1883;

pub const DEFAULT_TOPIC_SENSOR: &str = "sic7/stage4/DI-Binary/sensor";
pub const DEFAULT_TOPIC_PREDICTION: &str = "sic7/stage4/DI-Binary/prediction";
pub const DEFAULT_TOPIC_OUTPUT: &str = "sic7/stage4/DI-Binary/output";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub sensor: String,
    pub prediction: String,
    pub output: String,
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub keepalive: Duration,
    pub reconnect_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub broker: BrokerConfig,
    pub topics: Topics,
    pub refresh_interval: Duration,
    pub retention: RetentionPolicy,
    pub analytics_window: usize,
}

impl MonitorConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup, the process environment
    /// in production and a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let broker_url =
            lookup("MQTT_BROKER_URL").unwrap_or_else(|| DEFAULT_BROKER_URL.to_string());
        let (host, port) = parse_broker_url(&broker_url)?;

        let keepalive_secs: u64 = parse_var(&lookup, "MQTT_KEEPALIVE_SECS", 60)?;
        let reconnect_secs: u64 = parse_var(&lookup, "RECONNECT_DELAY_SECS", 1)?;
        let refresh_ms: u64 = parse_var(&lookup, "REFRESH_INTERVAL_MS", 1000)?;
        if refresh_ms == 0 {
            return Err("REFRESH_INTERVAL_MS must be greater than zero".into());
        }

        let history_capacity: usize = parse_var(&lookup, "HISTORY_CAPACITY", 200)?;
        if history_capacity == 0 {
            return Err("HISTORY_CAPACITY must be greater than zero".into());
        }
        // Zero disables the audit log bound
        let log_capacity: usize = parse_var(&lookup, "LOG_CAPACITY", 10_000)?;
        let analytics_window: usize = parse_var(&lookup, "ANALYTICS_WINDOW", 50)?;

        let topics = Topics {
            sensor: lookup("MQTT_TOPIC_SENSOR").unwrap_or_else(|| DEFAULT_TOPIC_SENSOR.to_string()),
            prediction: lookup("MQTT_TOPIC_PREDICTION")
                .unwrap_or_else(|| DEFAULT_TOPIC_PREDICTION.to_string()),
            output: lookup("MQTT_TOPIC_OUTPUT").unwrap_or_else(|| DEFAULT_TOPIC_OUTPUT.to_string()),
        };

        Ok(MonitorConfig {
            broker: BrokerConfig {
                host,
                port,
                keepalive: Duration::from_secs(keepalive_secs),
                reconnect_delay: Duration::from_secs(reconnect_secs),
            },
            topics,
            refresh_interval: Duration::from_millis(refresh_ms),
            retention: RetentionPolicy {
                history_capacity,
                log_capacity: (log_capacity > 0).then_some(log_capacity),
            },
            analytics_window,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| format!("Invalid value '{}' for {}: {}", value, key, e).into()),
        None => Ok(default),
    }
}

/// Split a broker URL such as `mqtt://broker.hivemq.com:1883` into host and port.
fn parse_broker_url(raw: &str) -> Result<(String, u16), Box<dyn std::error::Error>> {
    let url = Url::parse(raw).map_err(|e| format!("Invalid MQTT_BROKER_URL '{}': {}", raw, e))?;

    match url.scheme() {
        "mqtt" | "tcp" => {}
        other => return Err(format!("Unsupported broker scheme '{}'", other).into()),
    }

    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_string(),
        _ => return Err(format!("MQTT_BROKER_URL '{}' has no host", raw).into()),
    };

    Ok((host, url.port().unwrap_or(DEFAULT_MQTT_PORT)))
}
