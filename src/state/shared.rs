/// State shared between the MQTT receiver task and the display loop
use log::warn;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::{ActuatorOutput, LogEntry, Prediction, SensorReading};

/// Connection health and message counters reported on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStatus {
    pub connected: bool,
    pub messages_received: u64,
    pub decode_failures: u64,
}

#[derive(Debug, Default)]
struct Buffer {
    sensor: Option<SensorReading>,
    prediction: Prediction,
    output: ActuatorOutput,
    pending: VecDeque<LogEntry>,
    link: LinkStatus,
}

impl Buffer {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            sensor: self.sensor.clone(),
            prediction: self.prediction.clone(),
            output: self.output.clone(),
            link: self.link.clone(),
        }
    }
}

/// Point-in-time copy of the current values, taken while draining.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub sensor: Option<SensorReading>,
    pub prediction: Prediction,
    pub output: ActuatorOutput,
    pub link: LinkStatus,
}

/// Result of one drain: the queued entries in arrival order plus a snapshot.
#[derive(Debug, Clone, Default)]
pub struct Drained {
    pub entries: Vec<LogEntry>,
    pub snapshot: Snapshot,
}

/// Handle to the shared buffer
///
/// Cloning yields another handle to the same buffer. Every method holds the
/// lock only for in-memory updates, never across an await or I/O, so neither
/// side can stall the other.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<Buffer>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Buffer> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Shared state lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Store a new sensor snapshot and queue its log entry
    ///
    /// The entry captures the prediction current at this moment, in the same
    /// critical section as the snapshot update.
    pub fn record_sensor(&self, reading: SensorReading) {
        let mut buffer = self.lock();
        let entry = LogEntry {
            reading: reading.clone(),
            prediction: buffer.prediction.clone(),
        };
        buffer.sensor = Some(reading);
        buffer.pending.push_back(entry);
    }

    pub fn set_prediction(&self, prediction: Prediction) {
        self.lock().prediction = prediction;
    }

    pub fn set_output(&self, output: ActuatorOutput) {
        self.lock().output = output;
    }

    pub fn set_connected(&self, connected: bool) {
        self.lock().link.connected = connected;
    }

    pub fn count_message(&self) {
        self.lock().link.messages_received += 1;
    }

    pub fn count_decode_failure(&self) {
        self.lock().link.decode_failures += 1;
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot()
    }

    /// Take every pending entry and a snapshot of the current values
    ///
    /// The queue is left empty. Entries recorded after this returns are kept
    /// for the next drain.
    pub fn drain(&self) -> Drained {
        let mut buffer = self.lock();
        let entries: Vec<LogEntry> = std::mem::take(&mut buffer.pending).into();
        Drained {
            entries,
            snapshot: buffer.snapshot(),
        }
    }
}
