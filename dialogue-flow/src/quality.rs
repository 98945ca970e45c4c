//! Advisory structural check on rendered prompts. The gate repairs, it never rejects.

use crate::prompt::QUESTION_MARKER;

/// Sections every dialogue prompt is expected to carry.
pub const REQUIRED_SECTIONS: [&str; 3] = ["Patient Overview", "Current Symptoms", "Medical History"];

/// Required sections that do not occur anywhere in `prompt`.
pub fn missing_sections(prompt: &str) -> Vec<&'static str> {
    REQUIRED_SECTIONS
        .iter()
        .copied()
        .filter(|section| !prompt.contains(section))
        .collect()
}

pub fn validate(prompt: &str) -> bool {
    missing_sections(prompt).is_empty()
}

/// Add an empty block for every missing section.
///
/// Blocks go right before the `Clinical Question:` line so the question stays
/// last; without that line they are appended.
pub fn enhance(prompt: &str) -> String {
    let missing = missing_sections(prompt);
    if missing.is_empty() {
        return prompt.to_string();
    }

    let placeholders: String = missing
        .iter()
        .map(|section| format!("{}:\n", section))
        .collect();

    let marker = format!("\n{}", QUESTION_MARKER);
    match prompt.rfind(&marker) {
        Some(index) => {
            let (head, tail) = prompt.split_at(index + 1);
            format!("{}{}\n{}", head, placeholders, tail)
        }
        None => format!("{}\n\n{}", prompt.trim_end(), placeholders),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLETE: &str = "Patient Overview:\n- History: Asthma\n\nCurrent Symptoms:\n- cough\n\nMedical History:\n\nClinical Question: why?";

    #[test]
    fn test_complete_prompt_is_valid_and_untouched() {
        assert!(validate(COMPLETE));
        assert_eq!(enhance(COMPLETE), COMPLETE);
    }

    #[test]
    fn test_missing_symptoms_detected_and_repaired() {
        let prompt = "Patient Overview:\n- History: Asthma\n\nClinical Question: why?";
        assert!(!validate(prompt));
        assert_eq!(missing_sections(prompt), vec!["Current Symptoms", "Medical History"]);

        let repaired = enhance(prompt);
        assert!(validate(&repaired));
        assert!(repaired.contains("Current Symptoms:\nMedical History:\n\nClinical Question:"));
        assert_eq!(repaired.lines().last(), Some("Clinical Question: why?"));
    }

    #[test]
    fn test_enhance_appends_without_question_marker() {
        let repaired = enhance("Free text prompt\n");
        assert_eq!(
            repaired,
            "Free text prompt\n\nPatient Overview:\nCurrent Symptoms:\nMedical History:\n"
        );
        assert!(validate(&repaired));
    }
}
