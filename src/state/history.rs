/// Bounded history kept by the display loop
use std::collections::VecDeque;

use crate::models::{LogEntry, SensorReading};

/// Retention bounds for chart history and the audit log
///
/// `log_capacity` of None keeps every entry for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub history_capacity: usize,
    pub log_capacity: Option<usize>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy {
            history_capacity: 200,
            log_capacity: Some(10_000),
        }
    }
}

/// Rolling window of the most recent readings, oldest evicted first.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    readings: VecDeque<SensorReading>,
    capacity: usize,
}

impl HistoryWindow {
    pub fn new(capacity: usize) -> Self {
        HistoryWindow {
            readings: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, reading: SensorReading) {
        self.readings.push_back(reading);
        while self.readings.len() > self.capacity {
            self.readings.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorReading> {
        self.readings.iter()
    }

    /// The last `n` readings in arrival order
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &SensorReading> {
        self.readings.iter().skip(self.readings.len().saturating_sub(n))
    }
}

/// Audit log of sensor readings with their capture-time prediction
#[derive(Debug, Clone)]
pub struct AuditLog {
    entries: VecDeque<LogEntry>,
    capacity: Option<usize>,
    evicted: u64,
}

impl AuditLog {
    pub fn new(capacity: Option<usize>) -> Self {
        AuditLog {
            entries: VecDeque::new(),
            capacity,
            evicted: 0,
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push_back(entry);
        if let Some(capacity) = self.capacity {
            while self.entries.len() > capacity {
                self.entries.pop_front();
                self.evicted += 1;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Number of entries dropped by the retention bound so far.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Total entries ever appended, retained or evicted
    pub fn total_appended(&self) -> u64 {
        self.evicted + self.entries.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Prediction;
    use time::OffsetDateTime;

    fn reading(temp: f64) -> SensorReading {
        SensorReading {
            time: OffsetDateTime::UNIX_EPOCH,
            temperature: Some(temp),
            humidity: None,
            soil_moisture: None,
        }
    }

    #[test]
    fn history_never_exceeds_capacity_and_keeps_latest() {
        let mut window = HistoryWindow::new(200);
        for i in 0..500 {
            window.push(reading(i as f64));
            assert!(window.len() <= 200);
        }

        let temps: Vec<f64> = window.iter().filter_map(|r| r.temperature).collect();
        let expected: Vec<f64> = (300..500).map(|i| i as f64).collect();
        assert_eq!(temps, expected);
    }

    #[test]
    fn tail_returns_last_readings_in_order() {
        let mut window = HistoryWindow::new(10);
        for i in 0..8 {
            window.push(reading(i as f64));
        }
        let temps: Vec<f64> = window.tail(3).filter_map(|r| r.temperature).collect();
        assert_eq!(temps, vec![5.0, 6.0, 7.0]);
        assert_eq!(window.tail(50).count(), 8);
    }

    #[test]
    fn bounded_log_evicts_oldest_and_counts() {
        let mut log = AuditLog::new(Some(3));
        for i in 0..5 {
            log.push(LogEntry {
                reading: reading(i as f64),
                prediction: Prediction::default(),
            });
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.evicted(), 2);
        assert_eq!(log.total_appended(), 5);
        let first = log.iter().next().and_then(|e| e.reading.temperature);
        assert_eq!(first, Some(2.0));
    }

    #[test]
    fn unbounded_log_keeps_everything() {
        let mut log = AuditLog::new(None);
        for i in 0..1000 {
            log.push(LogEntry {
                reading: reading(i as f64),
                prediction: Prediction::default(),
            });
        }
        assert_eq!(log.len(), 1000);
        assert_eq!(log.evicted(), 0);
    }
}
