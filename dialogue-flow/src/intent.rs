use serde::{Deserialize, Serialize};

/// What the clinician is asking for; selects the prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Diagnosis,
    Treatment,
    GeneralDialogue,
}

/// Seam for swapping the question classifier without touching the pipeline.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, question: &str) -> Intent;
}

/// Case-insensitive keyword match on the question text only.
///
/// "diagnosis" is checked before "treatment" and the first hit wins, so
/// "treatment for this diagnosis" is a diagnosis question.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordIntentClassifier;

impl IntentClassifier for KeywordIntentClassifier {
    fn classify(&self, question: &str) -> Intent {
        let question = question.to_lowercase();
        if question.contains("diagnosis") {
            Intent::Diagnosis
        } else if question.contains("treatment") {
            Intent::Treatment
        } else {
            Intent::GeneralDialogue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(question: &str) -> Intent {
        KeywordIntentClassifier.classify(question)
    }

    #[test]
    fn test_keyword_routing() {
        assert_eq!(classify("What is the most likely DIAGNOSIS?"), Intent::Diagnosis);
        assert_eq!(classify("What treatment is recommended?"), Intent::Treatment);
        assert_eq!(classify("What could cause fever and cough?"), Intent::GeneralDialogue);
    }

    #[test]
    fn test_diagnosis_wins_over_treatment() {
        assert_eq!(
            classify("Which treatment fits this diagnosis?"),
            Intent::Diagnosis
        );
    }

    #[test]
    fn test_substring_match_is_literal() {
        // Negation is not understood.
        assert_eq!(classify("There is no diagnosis yet"), Intent::Diagnosis);
        assert_eq!(classify("Any treatments to avoid?"), Intent::Treatment);
    }
}
