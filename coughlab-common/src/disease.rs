//! Static disease reference data
//!
//! The table is built once at startup and shared read-only. Label order is
//! significant: classifiers report probabilities in this order.

use serde::{Deserialize, Serialize};

/// How serious a condition is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    None,
    Low,
    Moderate,
    High,
}

/// Reference information attached to a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseRecord {
    pub symptoms: Vec<String>,
    pub recommendations: Vec<String>,
    pub severity: Severity,
    pub contagious: bool,
    pub recovery_time: String,
}

impl DiseaseRecord {
    fn new(
        symptoms: &[&str],
        recommendations: &[&str],
        severity: Severity,
        contagious: bool,
        recovery_time: &str,
    ) -> Self {
        Self {
            symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
            recommendations: recommendations.iter().map(|s| s.to_string()).collect(),
            severity,
            contagious,
            recovery_time: recovery_time.to_string(),
        }
    }
}

/// Ordered, read-only mapping of disease name to record
#[derive(Debug, Clone)]
pub struct DiseaseTable {
    entries: Vec<(String, DiseaseRecord)>,
}

impl DiseaseTable {
    /// Build a table from `(name, record)` pairs; later duplicates are dropped
    pub fn from_entries(entries: impl IntoIterator<Item = (String, DiseaseRecord)>) -> Self {
        let mut unique: Vec<(String, DiseaseRecord)> = Vec::new();
        for (name, record) in entries {
            if !unique.iter().any(|(existing, _)| *existing == name) {
                unique.push((name, record));
            }
        }
        Self { entries: unique }
    }

    /// The five conditions the cough analyzer reports on
    pub fn standard() -> Self {
        Self::from_entries([
            (
                "COVID-19".to_string(),
                DiseaseRecord::new(
                    &[
                        "Dry cough",
                        "Fever",
                        "Loss of taste/smell",
                        "Fatigue",
                        "Shortness of breath",
                        "Body aches",
                    ],
                    &[
                        "Isolate immediately",
                        "Monitor oxygen levels",
                        "Stay hydrated",
                        "Take rest",
                        "Consult doctor",
                    ],
                    Severity::High,
                    true,
                    "10-14 days",
                ),
            ),
            (
                "Pneumonia".to_string(),
                DiseaseRecord::new(
                    &[
                        "Wet cough with mucus",
                        "High fever",
                        "Difficulty breathing",
                        "Chest pain",
                        "Rapid breathing",
                        "Night sweats",
                    ],
                    &[
                        "Seek medical attention",
                        "Complete antibiotics",
                        "Breathing exercises",
                        "Rest",
                        "Stay hydrated",
                    ],
                    Severity::High,
                    false,
                    "1-3 weeks",
                ),
            ),
            (
                "Bronchitis".to_string(),
                DiseaseRecord::new(
                    &[
                        "Persistent wet cough",
                        "Wheezing",
                        "Chest tightness",
                        "Low fever",
                        "Sore throat",
                        "Fatigue",
                    ],
                    &[
                        "Use humidifier",
                        "Drink warm fluids",
                        "Rest",
                        "Avoid irritants",
                        "Over-the-counter meds",
                    ],
                    Severity::Moderate,
                    true,
                    "7-10 days",
                ),
            ),
            (
                "Common Cold".to_string(),
                DiseaseRecord::new(
                    &[
                        "Mild cough",
                        "Runny nose",
                        "Sneezing",
                        "Sore throat",
                        "Slight fatigue",
                        "Mild body aches",
                    ],
                    &[
                        "Rest",
                        "Stay hydrated",
                        "Over-the-counter meds",
                        "Salt water gargle",
                        "Nasal decongestants",
                    ],
                    Severity::Low,
                    true,
                    "7-10 days",
                ),
            ),
            (
                "Healthy".to_string(),
                DiseaseRecord::new(
                    &[
                        "Normal breathing",
                        "No cough",
                        "Normal energy",
                        "No fever",
                        "No distress",
                    ],
                    &[
                        "Good hygiene",
                        "Regular exercise",
                        "Balanced diet",
                        "Adequate sleep",
                        "Regular checkups",
                    ],
                    Severity::None,
                    false,
                    "N/A",
                ),
            ),
        ])
    }

    /// Disease names in table order
    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&DiseaseRecord> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, record)| record)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
