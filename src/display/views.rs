/// View models for the dashboard, log and analytics pages, and the
/// rendering surface they are handed to
use log::{debug, error, info, log_enabled, warn, Level};
use time::OffsetDateTime;

use crate::display::presenter::{Presentation, Severity};
use crate::models::{LogEntry, SensorReading};
use crate::state::{AuditLog, HistoryWindow, LinkStatus, Snapshot};
use crate::utils::{calculate_stats, count_labels, format_datetime, format_value, MetricStats};

const LED_OFF: &str = "OFF";
const LED_OFF_SWATCH: &str = "#ddd";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Temperature,
    Humidity,
    SoilMoisture,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Temperature, Metric::Humidity, Metric::SoilMoisture];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Temperature => "Suhu (°C)",
            Metric::Humidity => "Kelembapan (%)",
            Metric::SoilMoisture => "Kelembapan Tanah (%)",
        }
    }

    pub fn value(&self, reading: &SensorReading) -> Option<f64> {
        match self {
            Metric::Temperature => reading.temperature,
            Metric::Humidity => reading.humidity,
            Metric::SoilMoisture => reading.soil_moisture,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub metric: Metric,
    /// Absent values are skipped, so series may differ in length
    pub points: Vec<(OffsetDateTime, f64)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedPanel {
    pub color: String,
    pub swatch: String,
}

impl LedPanel {
    pub fn new(color: &str) -> Self {
        let swatch = if color == LED_OFF {
            LED_OFF_SWATCH.to_string()
        } else {
            color.to_lowercase()
        };
        LedPanel {
            color: color.to_string(),
            swatch,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub metrics: Vec<(Metric, Option<f64>)>,
    pub status: Presentation,
    pub chart: Vec<ChartSeries>,
    pub led: LedPanel,
    pub buzzer_on: bool,
    pub link: LinkStatus,
}

impl DashboardView {
    pub fn build(snapshot: &Snapshot, history: &HistoryWindow) -> Self {
        let metrics = Metric::ALL
            .iter()
            .map(|metric| (*metric, snapshot.sensor.as_ref().and_then(|s| metric.value(s))))
            .collect();

        let chart = Metric::ALL
            .iter()
            .map(|metric| ChartSeries {
                metric: *metric,
                points: history
                    .iter()
                    .filter_map(|r| metric.value(r).map(|v| (r.time, v)))
                    .collect(),
            })
            .collect();

        DashboardView {
            metrics,
            status: Presentation::of(&snapshot.prediction),
            chart,
            led: LedPanel::new(&snapshot.output.led_color),
            buzzer_on: snapshot.output.buzzer_on,
            link: snapshot.link.clone(),
        }
    }

    /// True when there is nothing to chart yet
    pub fn waiting_for_data(&self) -> bool {
        self.chart.iter().all(|series| series.points.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRow {
    pub time: String,
    pub temperature: String,
    pub humidity: String,
    pub soil_moisture: String,
    pub prediction: String,
}

impl From<&LogEntry> for LogRow {
    fn from(entry: &LogEntry) -> Self {
        LogRow {
            time: format_datetime(&entry.reading.time),
            temperature: format_value(entry.reading.temperature),
            humidity: format_value(entry.reading.humidity),
            soil_moisture: format_value(entry.reading.soil_moisture),
            prediction: entry.prediction.raw().to_string(),
        }
    }
}

/// Borrowed view over the audit log; rows are formatted on demand.
#[derive(Debug, Clone, Copy)]
pub struct LogView<'a> {
    log: &'a AuditLog,
}

impl<'a> LogView<'a> {
    pub fn new(log: &'a AuditLog) -> Self {
        LogView { log }
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn evicted(&self) -> u64 {
        self.log.evicted()
    }

    pub fn total_appended(&self) -> u64 {
        self.log.total_appended()
    }

    pub fn rows(&self) -> impl Iterator<Item = LogRow> + 'a {
        let log = self.log;
        log.iter().map(LogRow::from)
    }

    /// The last `n` rows, oldest first
    pub fn last_rows(&self, n: usize) -> impl Iterator<Item = LogRow> + 'a {
        let log = self.log;
        let skip = log.len().saturating_sub(n);
        log.iter().skip(skip).map(LogRow::from)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsView {
    pub window: usize,
    /// Empty until the history has readings
    pub stats: Vec<(Metric, MetricStats)>,
    /// Raw prediction labels with their counts, most frequent first
    pub distribution: Vec<(String, usize)>,
}

impl AnalyticsView {
    pub fn build(history: &HistoryWindow, log: &AuditLog, window: usize) -> Self {
        let stats = if history.is_empty() {
            Vec::new()
        } else {
            Metric::ALL
                .iter()
                .map(|metric| {
                    let values = history.tail(window).map(|r| metric.value(r));
                    (*metric, calculate_stats(values))
                })
                .collect()
        };

        AnalyticsView {
            window,
            stats,
            distribution: count_labels(log.iter().map(|e| e.prediction.raw())),
        }
    }
}

/// Everything rendered on one tick
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    pub rendered_at: OffsetDateTime,
    /// Entries merged into the log on this tick
    pub new_entries: usize,
    pub dashboard: DashboardView,
    pub log: LogView<'a>,
    pub analytics: AnalyticsView,
}

/// Rendering surface the display loop hands each frame to
pub trait Renderer {
    fn render(&mut self, frame: &Frame<'_>);
}

/// Renders frames as log lines
#[derive(Debug, Default)]
pub struct ConsoleRenderer {
    rows_rendered: u64,
    last_status: Option<Presentation>,
    last_link: Option<LinkStatus>,
}

impl ConsoleRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn render_dashboard(&mut self, frame: &Frame<'_>) {
        let dashboard = &frame.dashboard;

        let metrics = dashboard
            .metrics
            .iter()
            .map(|(metric, value)| format!("{}: {}", metric.label(), format_value(*value)))
            .collect::<Vec<_>>()
            .join(" | ");

        let status = match &dashboard.status {
            Presentation::NotYetAvailable => "waiting".to_string(),
            Presentation::Ready { label, .. } => label.clone(),
        };

        if frame.new_entries > 0 || self.last_status.as_ref() != Some(&dashboard.status) {
            info!(
                "[{}] {} | Status: {} | LED: {} ({}) | Buzzer: {}",
                format_datetime(&frame.rendered_at),
                metrics,
                status,
                dashboard.led.color,
                dashboard.led.swatch,
                if dashboard.buzzer_on { "ON" } else { "OFF" }
            );
            let suggestion = dashboard.status.suggestion_text();
            match dashboard.status.severity() {
                Severity::Info => info!("Saran: {}", suggestion),
                Severity::Warning => warn!("Saran: {}", suggestion),
                Severity::Critical => error!("Saran: {}", suggestion),
            }
            self.last_status = Some(dashboard.status.clone());
        }

        if dashboard.waiting_for_data() {
            debug!("Menunggu data sensor...");
        } else {
            for series in &dashboard.chart {
                debug!(
                    "Chart {}: {} points, latest {}",
                    series.metric.label(),
                    series.points.len(),
                    format_value(series.points.last().map(|(_, v)| *v))
                );
            }
        }

        if self.last_link.as_ref() != Some(&dashboard.link) {
            info!(
                "MQTT {} | messages: {} | decode failures: {}",
                if dashboard.link.connected { "connected" } else { "disconnected" },
                dashboard.link.messages_received,
                dashboard.link.decode_failures
            );
            self.last_link = Some(dashboard.link.clone());
        }
    }

    fn render_log(&mut self, frame: &Frame<'_>) {
        let total = frame.log.total_appended();
        let fresh = total.saturating_sub(self.rows_rendered) as usize;
        if !log_enabled!(Level::Debug) {
            self.rows_rendered = total;
            return;
        }
        for row in frame.log.last_rows(fresh) {
            debug!(
                "Log {} | temp={} hum={} soil={} | {}",
                row.time, row.temperature, row.humidity, row.soil_moisture, row.prediction
            );
        }
        if fresh > frame.log.len() {
            debug!(
                "{} log rows evicted before display ({} evicted in total)",
                fresh - frame.log.len(),
                frame.log.evicted()
            );
        }
        self.rows_rendered = total;
    }

    fn render_analytics(&self, frame: &Frame<'_>) {
        if frame.new_entries == 0 {
            return;
        }
        for (metric, stats) in &frame.analytics.stats {
            debug!(
                "{} over last {}: mean={} min={} max={} range={} std={}",
                metric.label(),
                frame.analytics.window,
                format_value(stats.mean),
                format_value(stats.min),
                format_value(stats.max),
                format_value(stats.range),
                format_value(stats.std_dev)
            );
        }
        for (label, count) in &frame.analytics.distribution {
            debug!("Prediction {}: {}", label, count);
        }
    }
}

impl Renderer for ConsoleRenderer {
    fn render(&mut self, frame: &Frame<'_>) {
        self.render_dashboard(frame);
        self.render_log(frame);
        self.render_analytics(frame);
    }
}
