//! Case, urgency and run-record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;

/// Declared clinical urgency, decoupled from any presentation label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Routine,
    Moderate,
    Urgent,
}

impl Urgency {
    /// Parse a presentation label (including the legacy emoji-tagged
    /// Portuguese forms). Unrecognized values default to `Routine`.
    pub fn from_label(label: &str) -> Self {
        let lower = label.to_lowercase();
        if lower.contains("urgente") || lower.contains("urgent") {
            Self::Urgent
        } else if lower.contains("moderada") || lower.contains("moderate") {
            Self::Moderate
        } else {
            Self::Routine
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Routine => "Rotina",
            Self::Moderate => "Moderada",
            Self::Urgent => "Urgente",
        }
    }
}

impl Default for Urgency {
    fn default() -> Self {
        Self::Routine
    }
}

/// Per-case resource budget derived from the urgency level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrgencyProfile {
    pub max_web_results: usize,
    pub vision_timeout: Duration,
    pub knowledge_timeout: Duration,
    pub diagnosis_timeout: Duration,
    pub detailed_research: bool,
}

impl UrgencyProfile {
    /// Pure lookup: urgent cases trade research depth for latency
    pub fn for_urgency(urgency: Urgency) -> Self {
        match urgency {
            Urgency::Urgent => Self {
                max_web_results: 3,
                vision_timeout: Duration::from_secs(15),
                knowledge_timeout: Duration::from_secs(10),
                diagnosis_timeout: Duration::from_secs(30),
                detailed_research: false,
            },
            Urgency::Moderate => Self {
                max_web_results: 5,
                vision_timeout: Duration::from_secs(25),
                knowledge_timeout: Duration::from_secs(15),
                diagnosis_timeout: Duration::from_secs(45),
                detailed_research: true,
            },
            Urgency::Routine => Self {
                max_web_results: 8,
                vision_timeout: Duration::from_secs(30),
                knowledge_timeout: Duration::from_secs(25),
                diagnosis_timeout: Duration::from_secs(60),
                detailed_research: true,
            },
        }
    }
}

/// One clinical request. Constructed once from form input, immutable
/// thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseInput {
    pub species: String,
    pub breed: String,
    pub age: String,
    pub weight: String,
    pub sex: String,
    pub neutered: bool,
    pub history: String,
    pub symptoms: String,
    pub urgency: Urgency,
    pub image_paths: Vec<PathBuf>,
}

impl CaseInput {
    pub fn new(species: impl Into<String>, symptoms: impl Into<String>) -> Self {
        Self {
            species: species.into(),
            symptoms: symptoms.into(),
            ..Default::default()
        }
    }

    /// Stable content fingerprint usable as a cache/dedup key
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}:{}:{}", self.species, self.symptoms, self.history));
        let digest = format!("{:x}", hasher.finalize());
        digest[..16].to_string()
    }
}

impl Default for CaseInput {
    fn default() -> Self {
        Self {
            species: String::new(),
            breed: "Desconhecida".to_string(),
            age: "Desconhecida".to_string(),
            weight: "Desconhecido".to_string(),
            sex: "Desconhecido".to_string(),
            neutered: false,
            history: String::new(),
            symptoms: String::new(),
            urgency: Urgency::Routine,
            image_paths: Vec::new(),
        }
    }
}

/// Outcome of one pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failed,
    Skipped,
    Fallback,
}

/// Record of one executed stage, written regardless of downstream outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl StepRecord {
    pub fn new(name: &str, status: StepStatus, duration_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            status,
            duration_ms,
            error: None,
            model: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Aggregate of what the knowledge stage found
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeSummary {
    pub documents_found: usize,
    pub web_results: usize,
    pub web_chars: usize,
}

/// Complete output of one diagnostic run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub timestamp: DateTime<Utc>,
    pub case: CaseInput,
    pub steps: Vec<StepRecord>,
    pub visual_analysis: String,
    pub diagnosis: String,
    pub knowledge: KnowledgeSummary,
    pub total_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgency_from_label() {
        assert_eq!(Urgency::from_label("🔴 Urgente"), Urgency::Urgent);
        assert_eq!(Urgency::from_label("🟡 Moderada"), Urgency::Moderate);
        assert_eq!(Urgency::from_label("🟢 Rotina"), Urgency::Routine);
        assert_eq!(Urgency::from_label("whatever"), Urgency::Routine);
    }

    #[test]
    fn test_urgent_profile_strictly_tighter_than_routine() {
        let urgent = UrgencyProfile::for_urgency(Urgency::Urgent);
        let routine = UrgencyProfile::for_urgency(Urgency::Routine);

        assert!(urgent.max_web_results < routine.max_web_results);
        assert!(urgent.vision_timeout < routine.vision_timeout);
        assert!(urgent.knowledge_timeout < routine.knowledge_timeout);
        assert!(urgent.diagnosis_timeout < routine.diagnosis_timeout);
        assert!(!urgent.detailed_research);
        assert!(routine.detailed_research);
    }

    #[test]
    fn test_fingerprint_depends_on_clinical_fields_only() {
        let mut a = CaseInput::new("Cão", "vómito persistente");
        let mut b = CaseInput::new("Cão", "vómito persistente");
        a.weight = "12kg".to_string();
        b.weight = "30kg".to_string();
        assert_eq!(a.fingerprint(), b.fingerprint());

        b.symptoms = "tosse seca".to_string();
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 16);
    }
}
