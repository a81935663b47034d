/// Presentation of prediction labels: severity and suggested action
use crate::models::{Level, Prediction, PredictionLabel};

pub const WAITING_FOR_PREDICTION: &str = "Menunggu prediksi...";
pub const WAITING_FOR_SUGGESTION: &str = "Menunggu saran...";

const SUGGESTIONS: [(&str, &str); 6] = [
    ("sensor_failure", "Sensor bermasalah! Periksa koneksi sensor."),
    ("kondisi_optimal", "Tanaman sehat. Tidak perlu tindakan."),
    ("segera_siram", "Tanah mulai kering. Segera siram tanaman!"),
    (
        "dehidrasi_panas",
        "Tanaman kepanasan dan dehidrasi! Pindahkan ke tempat teduh atau segera siram.",
    ),
    (
        "bahaya_akar",
        "Risiko masalah pada akar! Bisa terjadi karena drainase buruk atau terlalu sering disiram.",
    ),
    (
        "risiko_jamur",
        "Risiko jamur! Kelembapan tinggi dapat merusak tanaman. Tingkatkan sirkulasi udara dan hindari terlalu sering menyiram.",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn of(level: &Level) -> Self {
        match level {
            Level::Warning => Severity::Warning,
            Level::High | Level::Critical | Level::Error => Severity::Critical,
            Level::Info | Level::Other(_) => Severity::Info,
        }
    }
}

pub fn suggestion_for(key: &str) -> Option<&'static str> {
    SUGGESTIONS
        .iter()
        .find(|(known, _)| *known == key)
        .map(|(_, message)| *message)
}

/// What the dashboard shows for the current prediction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    /// No parseable label yet
    NotYetAvailable,
    Ready {
        severity: Severity,
        label: String,
        level: Level,
        key: String,
        /// None when the key is not in the suggestion table
        suggestion: Option<&'static str>,
    },
}

impl Presentation {
    /// Derived from the given prediction alone; nothing is carried over
    /// from earlier renders.
    pub fn of(prediction: &Prediction) -> Self {
        match prediction.label() {
            Some(PredictionLabel { level, key }) => Presentation::Ready {
                severity: Severity::of(level),
                label: prediction.raw().to_string(),
                level: level.clone(),
                key: key.clone(),
                suggestion: suggestion_for(key),
            },
            None => Presentation::NotYetAvailable,
        }
    }

    pub fn suggestion_text(&self) -> &'static str {
        match self {
            Presentation::NotYetAvailable => WAITING_FOR_PREDICTION,
            Presentation::Ready { suggestion, .. } => suggestion.unwrap_or(WAITING_FOR_SUGGESTION),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Presentation::NotYetAvailable => Severity::Info,
            Presentation::Ready { severity, .. } => *severity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::decode::decode_prediction;

    #[test]
    fn warning_label_maps_to_watering_suggestion() {
        let prediction = decode_prediction("status:[WARNING]segera_siram").unwrap();
        let presentation = Presentation::of(&prediction);
        match &presentation {
            Presentation::Ready { level, key, severity, .. } => {
                assert_eq!(*level, Level::Warning);
                assert_eq!(key, "segera_siram");
                assert_eq!(*severity, Severity::Warning);
            }
            other => panic!("expected a ready presentation, got {:?}", other),
        }
        assert_eq!(
            presentation.suggestion_text(),
            "Tanah mulai kering. Segera siram tanaman!"
        );
    }

    #[test]
    fn sentinel_and_empty_are_not_yet_available() {
        for raw in ["-", "", "kondisi_optimal", "[INFO kondisi_optimal"] {
            let presentation = Presentation::of(&Prediction::new(raw));
            assert_eq!(presentation, Presentation::NotYetAvailable);
            assert_eq!(presentation.suggestion_text(), WAITING_FOR_PREDICTION);
        }
    }

    #[test]
    fn unknown_key_waits_for_suggestion() {
        let presentation = Presentation::of(&Prediction::new("[INFO]daun_kuning"));
        assert_eq!(presentation.suggestion_text(), WAITING_FOR_SUGGESTION);
        assert_ne!(presentation, Presentation::NotYetAvailable);
    }

    #[test]
    fn severity_follows_level() {
        assert_eq!(Severity::of(&Level::Info), Severity::Info);
        assert_eq!(Severity::of(&Level::Warning), Severity::Warning);
        assert_eq!(Severity::of(&Level::High), Severity::Critical);
        assert_eq!(Severity::of(&Level::Critical), Severity::Critical);
        assert_eq!(Severity::of(&Level::Error), Severity::Critical);
        assert_eq!(Severity::of(&Level::Other("DEBUG".into())), Severity::Info);
    }

    #[test]
    fn presentation_does_not_keep_stale_parse() {
        let good = Presentation::of(&Prediction::new("[CRITICAL]bahaya_akar"));
        assert_eq!(good.severity(), Severity::Critical);

        let after = Presentation::of(&Prediction::new("broken"));
        assert_eq!(after, Presentation::NotYetAvailable);
        assert_eq!(after.severity(), Severity::Info);
    }

    #[test]
    fn all_six_keys_have_suggestions() {
        for key in [
            "sensor_failure",
            "kondisi_optimal",
            "segera_siram",
            "dehidrasi_panas",
            "bahaya_akar",
            "risiko_jamur",
        ] {
            assert!(suggestion_for(key).is_some(), "missing {}", key);
        }
    }
}
