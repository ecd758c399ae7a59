//! Veterinary query builder
//!
//! Maps free-text Portuguese symptom descriptions onto clinical English
//! search terms, so both the retriever and the web chain get queries the
//! literature actually uses.

use super::types::{CaseInput, Urgency};
use lazy_static::lazy_static;

lazy_static! {
    /// Symptom phrases (PT) mapped to clinical English synonyms, in match
    /// priority order. Only the first two synonyms of a matched phrase are
    /// used.
    static ref MEDICAL_TERMS: Vec<(&'static str, &'static [&'static str])> = vec![
        ("vomito", &["emesis", "vomiting", "gastric"][..]),
        ("vómito", &["emesis", "vomiting", "gastric"][..]),
        ("diarreia", &["diarrhea", "enteritis", "colitis"][..]),
        ("tosse", &["cough", "respiratory", "bronchitis"][..]),
        ("coceira", &["pruritus", "dermatitis", "itching"][..]),
        ("coçar", &["pruritus", "dermatitis", "scratching"][..]),
        ("claudicação", &["lameness", "orthopedic", "limping"][..]),
        ("mancar", &["lameness", "limping"][..]),
        ("letargia", &["lethargy", "weakness", "malaise"][..]),
        ("febre", &["fever", "pyrexia", "infection"][..]),
        ("perda de apetite", &["anorexia", "inappetence"][..]),
        ("não come", &["anorexia", "inappetence"][..]),
        ("perda de peso", &["weight loss", "cachexia"][..]),
        ("convulsões", &["seizures", "epilepsy", "neurological"][..]),
        ("tremores", &["tremors", "shaking", "neurological"][..]),
        ("lesão", &["lesion", "wound", "skin"][..]),
        ("ferida", &["wound", "laceration", "injury"][..]),
        ("inchaço", &["swelling", "edema", "inflammation"][..]),
        ("sangue", &["bleeding", "hemorrhage", "hematuria"][..]),
        ("urina", &["urinary", "dysuria", "UTI"][..]),
        ("olhos", &["ocular", "conjunctivitis", "eye"][..]),
        ("ouvido", &["otitis", "ear", "auricular"][..]),
    ];
}

/// Age markers that select a life-stage hint
const JUVENILE_MARKERS: &[&str] = &["filhote", "puppy", "kitten", "meses", "semanas"];
const SENIOR_MARKERS: &[&str] = &["senior", "idoso", "velho", "12 anos", "13 anos", "14 anos", "15 anos"];

/// Maximum clinical terms carried into the query
const MAX_MEDICAL_TERMS: usize = 4;

/// Research focus appended to every query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFocus {
    Diagnosis,
    Treatment,
    Emergency,
}

impl QueryFocus {
    pub fn for_urgency(urgency: Urgency) -> Self {
        match urgency {
            Urgency::Urgent => Self::Emergency,
            Urgency::Routine | Urgency::Moderate => Self::Diagnosis,
        }
    }

    fn terms(self) -> &'static str {
        match self {
            Self::Diagnosis => "differential diagnosis",
            Self::Treatment => "treatment therapy",
            Self::Emergency => "emergency urgent critical",
        }
    }
}

/// Canonical species token for search
fn species_token(species: &str) -> &'static str {
    match species {
        "Cão" => "canine",
        "Gato" => "feline",
        _ => "veterinary",
    }
}

/// Build the search query for a case
pub fn build_query(case: &CaseInput, focus: QueryFocus) -> String {
    let mut parts: Vec<String> = vec![species_token(&case.species).to_string()];

    let symptoms_lower = case.symptoms.to_lowercase();
    let mut medical_found: Vec<&str> = Vec::new();
    for (pt_term, en_terms) in MEDICAL_TERMS.iter() {
        if symptoms_lower.contains(pt_term) {
            medical_found.extend(en_terms.iter().take(2));
        }
    }

    if medical_found.is_empty() {
        // No lexicon hit: fall back to the raw symptom words
        parts.push("veterinary".to_string());
        parts.extend(
            case.symptoms
                .split_whitespace()
                .take(4)
                .filter(|w| w.len() > 3)
                .map(String::from),
        );
    } else {
        let mut seen = Vec::new();
        for term in medical_found {
            if !seen.contains(&term) {
                seen.push(term);
                if seen.len() == MAX_MEDICAL_TERMS {
                    break;
                }
            }
        }
        parts.extend(seen.into_iter().map(String::from));
    }

    parts.push(focus.terms().to_string());

    let age_lower = case.age.to_lowercase();
    if JUVENILE_MARKERS.iter().any(|m| age_lower.contains(m)) {
        parts.push(if case.species == "Cão" { "puppy" } else { "kitten" }.to_string());
    } else if SENIOR_MARKERS.iter().any(|m| age_lower.contains(m)) {
        parts.push("geriatric senior".to_string());
    }

    parts.join(" ")
}
