//! Prompt templates.
//!
//! Every dialogue template shares the same context block (patient overview,
//! doctor's notes, recent discussion, symptoms, findings) and always ends with
//! the verbatim `Clinical Question:` line. The intent only changes the
//! preamble and the instructions in between.

use crate::context::{ChatTurn, Message};
use crate::intent::Intent;
use crate::patient::{DoctorNotes, PATIENT_FIELDS, PatientSnapshot};

/// Number of prior messages included in a dialogue prompt.
pub const RECENT_MESSAGE_WINDOW: usize = 3;

/// Prefix of the final line of every dialogue prompt.
pub const QUESTION_MARKER: &str = "Clinical Question:";

/// Stand-in used by the treatment template when no diagnosis is on record.
pub const UNESTABLISHED_DIAGNOSIS: &str = "diagnosis not yet established";

/// Everything a dialogue template may draw on, borrowed for one render.
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub patient: &'a PatientSnapshot,
    pub symptoms: &'a [String],
    pub recent_messages: &'a [Message],
    pub clinical_findings: &'a [String],
    pub doctor_notes: Option<&'a DoctorNotes>,
    pub current_diagnosis: Option<&'a str>,
    pub question: &'a str,
}

/// Render the dialogue prompt for `intent`.
pub fn render(intent: Intent, input: &PromptInput<'_>) -> String {
    match intent {
        Intent::Diagnosis => render_diagnosis(input),
        Intent::Treatment => render_treatment(input),
        Intent::GeneralDialogue => render_general(input),
    }
}

fn render_general(input: &PromptInput<'_>) -> String {
    let mut prompt = String::from(
        "You are an AI clinical assistant engaging in an ongoing medical dialogue with a healthcare professional.
Review the conversation history and continue the professional discussion.
",
    );
    push_context(&mut prompt, input);
    prompt.push_str(
        "
Continue the discussion naturally and stay consistent with the previous turns of this conversation.
Maintain a professional yet conversational tone, as between colleagues discussing a case.
Focus on the current question while building on what has already been established.
",
    );
    push_question(&mut prompt, input.question);
    prompt
}

fn render_diagnosis(input: &PromptInput<'_>) -> String {
    let mut prompt = String::from(
        "As an AI clinical assistant, analyze the following presentation and provide a structured differential diagnosis.
",
    );
    push_context(&mut prompt, input);
    prompt.push_str(
        "
Please provide:
1. Differential diagnoses, ordered from most to least likely
2. Key supporting factors for each diagnosis
3. Recommended workup and investigations
4. Red flags to consider
5. Suggested immediate actions

Put the differential under a \"Differential Diagnosis:\" heading and the warning signs under a \"Red Flags:\" heading, one bullet per item.
",
    );
    push_question(&mut prompt, input.question);
    prompt
}

fn render_treatment(input: &PromptInput<'_>) -> String {
    let diagnosis = input
        .current_diagnosis
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(UNESTABLISHED_DIAGNOSIS);

    let mut prompt = format!(
        "Working diagnosis: {}
Based on this working diagnosis, provide evidence-based treatment recommendations.
",
        diagnosis
    );
    push_context(&mut prompt, input);
    prompt.push_str(
        "
Please provide:
1. First-line treatment options
2. Alternative approaches if first-line options are unsuitable
3. Monitoring parameters
4. Expected outcomes
5. Follow-up recommendations
6. Patient education points

Consider patient-specific factors and contraindications. If the working diagnosis is not yet established, state what is needed to establish it before committing to a treatment plan.
",
    );
    push_question(&mut prompt, input.question);
    prompt
}

fn push_context(prompt: &mut String, input: &PromptInput<'_>) {
    prompt.push_str("\nPatient Overview:\n");
    push_patient_fields(prompt, input.patient);

    if let Some(notes) = input.doctor_notes.filter(|n| !n.is_empty()) {
        prompt.push_str("\nDoctor's Notes:\n");
        for (heading, text) in notes.sections() {
            prompt.push_str(&format!("{}:\n{}\n", heading, text.trim()));
        }
    }

    let window_start = input
        .recent_messages
        .len()
        .saturating_sub(RECENT_MESSAGE_WINDOW);
    let recent = &input.recent_messages[window_start..];
    if !recent.is_empty() {
        prompt.push_str("\nRecent Discussion:\n");
        for message in recent {
            prompt.push_str(&format!("{}: {}\n", message.role.title(), message.content));
        }
    }

    push_bullets(prompt, "Current Symptoms", input.symptoms);
    push_bullets(prompt, "Established Clinical Findings", input.clinical_findings);
}

fn push_patient_fields(prompt: &mut String, patient: &PatientSnapshot) {
    for (label, value) in patient.labeled_fields() {
        prompt.push_str(&format!("- {}: {}\n", label, value));
    }
}

fn push_bullets(prompt: &mut String, heading: &str, items: &[String]) {
    let mut items = items.iter().map(|i| i.trim()).filter(|i| !i.is_empty()).peekable();
    if items.peek().is_none() {
        return;
    }
    prompt.push_str(&format!("\n{}:\n", heading));
    for item in items {
        prompt.push_str(&format!("- {}\n", item));
    }
}

fn push_question(prompt: &mut String, question: &str) {
    prompt.push_str(&format!("\n{} {}", QUESTION_MARKER, question));
}

/// Short clinical summary of a patient record.
pub fn patient_summary(patient: &PatientSnapshot) -> String {
    let mut prompt = String::from(
        "As a medical AI assistant, provide a very brief (2-3 sentences) clinical summary of this patient:

Patient Information:
",
    );
    for &(name, _) in PATIENT_FIELDS.iter() {
        let value = patient.field(name).map(str::trim).unwrap_or_default();
        if !value.is_empty() {
            prompt.push_str(&format!("- {}: {}\n", title_case(name), value));
        }
    }
    prompt.push_str(
        "
Provide a concise, clinically relevant summary focusing on key findings and concerns.",
    );
    prompt
}

/// Structured list of potential diseases plus recommended investigations.
pub fn disease_prediction(patient: &PatientSnapshot, symptoms: &[String]) -> String {
    format!(
        "As an AI medical assistant, analyze the following patient information and provide a structured assessment of potential diseases. Format your response strictly as follows:

# Potential Diagnoses
For each diagnosis (maximum 5), provide:
- Condition name followed by a brief explanation
Do not use markdown emphasis symbols (* or **) in the response.

# Recommendations
Organize recommendations into these categories:

## Immediate Tests
- Urgent or immediate diagnostic tests needed

## Laboratory Tests
- Relevant blood work and other laboratory investigations

## Imaging Studies
- Recommended imaging studies

## Specialist Referrals
- Specialist consultations recommended

Patient Information:
Age: {}
Gender: {}
Current Symptoms: {}
Medical History: {}
Vital Signs: {}
Current Medications: {}

Ensure recommendations are specific and clinically relevant.",
        or_default(&patient.age, "Not specified"),
        or_default(&patient.gender, "Not specified"),
        or_default(&join_items(symptoms), "None reported"),
        or_default(&patient.medical_history, "None provided"),
        or_default(&patient.vital_signs, "Not available"),
        or_default(&patient.current_medications, "None listed"),
    )
}

/// Explanation of why `diagnosis` is under consideration for this patient.
pub fn diagnosis_analysis(
    diagnosis: &str,
    symptoms: &[String],
    patient: &PatientSnapshot,
) -> String {
    format!(
        "As an AI medical assistant, provide a detailed analysis of why {diagnosis} is being considered as a potential diagnosis for this patient.

Patient Information:
- Age: {age}
- Gender: {gender}
- Current Symptoms: {symptoms}
- Medical History: {history}
- Current Medications: {medications}
- Vital Signs: {vitals}

Provide your analysis in markdown format using the following structure:

## Symptom Correlation
[How the patient's symptoms align with {diagnosis}]

## Patient Profile & Risk Factors
[How the patient's age, gender and other characteristics relate to this diagnosis]

## Key Clinical Indicators
[The main clinical findings that support this diagnosis]

## Concerning Features
[Red flags or features requiring immediate attention]

## Differential Diagnoses
[Other conditions to consider and why they should be ruled out]

## Medical History Relevance
[How the patient's medical history impacts this diagnosis]

## Recommendations
[Next steps, tests or monitoring required]
",
        diagnosis = diagnosis,
        age = or_default(&patient.age, "Not specified"),
        gender = or_default(&patient.gender, "Not specified"),
        symptoms = or_default(&join_items(symptoms), "None reported"),
        history = or_default(&patient.medical_history, "None"),
        medications = or_default(&patient.current_medications, "None"),
        vitals = or_default(&patient.vital_signs, "None"),
    )
}

const RESEARCH_INSTRUCTIONS: &str = "You are a medical research assistant AI. Help users understand medical research papers and provide accurate information from reliable sources. Always cite sources when possible and maintain academic integrity in your responses. Use markdown formatting for better readability.";

/// Research-assistant reply to `message`, given the caller's prior exchanges.
pub fn research_chat(message: &str, history: &[ChatTurn]) -> String {
    let mut prompt = format!("{}\n", RESEARCH_INSTRUCTIONS);
    if !history.is_empty() {
        prompt.push_str("\nConversation so far:\n");
        for turn in history {
            prompt.push_str(&format!("{}: {}\n", turn.role.title(), turn.content.trim()));
        }
    }
    prompt.push_str(&format!("\nUser: {}", message));
    prompt
}

/// `current_medications` → `Current Medications`.
fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn join_items(items: &[String]) -> String {
    items
        .iter()
        .map(|i| i.trim())
        .filter(|i| !i.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() { default } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Role;
    use chrono::Utc;

    fn message(role: Role, content: &str) -> Message {
        Message {
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }

    fn input<'a>(patient: &'a PatientSnapshot, question: &'a str) -> PromptInput<'a> {
        PromptInput {
            patient,
            symptoms: &[],
            recent_messages: &[],
            clinical_findings: &[],
            doctor_notes: None,
            current_diagnosis: None,
            question,
        }
    }

    #[test]
    fn test_only_populated_fields_are_rendered() {
        let patient = PatientSnapshot {
            age: "45".to_string(),
            chief_complaint: "chest pain".to_string(),
            ..Default::default()
        };

        for intent in [Intent::GeneralDialogue, Intent::Diagnosis, Intent::Treatment] {
            let prompt = render(intent, &input(&patient, "What next?"));
            let labeled: Vec<_> = PATIENT_FIELDS
                .iter()
                .filter(|(_, label)| prompt.contains(&format!("- {}:", label)))
                .map(|(_, label)| *label)
                .collect();
            assert_eq!(labeled, vec!["Age", "Chief Complaint"], "intent {:?}", intent);
            assert!(prompt.contains("- Age: 45\n"));
            assert!(prompt.contains("- Chief Complaint: chest pain\n"));
        }
    }

    #[test]
    fn test_question_is_final_line() {
        let patient = PatientSnapshot::default();
        let question = "Is this   verbatim?";
        for intent in [Intent::GeneralDialogue, Intent::Diagnosis, Intent::Treatment] {
            let prompt = render(intent, &input(&patient, question));
            assert_eq!(
                prompt.lines().last(),
                Some("Clinical Question: Is this   verbatim?")
            );
        }
    }

    #[test]
    fn test_empty_lists_are_omitted() {
        let patient = PatientSnapshot::default();
        let prompt = render(Intent::GeneralDialogue, &input(&patient, "Hello"));
        assert!(!prompt.contains("Current Symptoms"));
        assert!(!prompt.contains("Established Clinical Findings"));
        assert!(!prompt.contains("Recent Discussion"));
        assert!(!prompt.contains("Doctor's Notes"));
    }

    #[test]
    fn test_lists_render_as_bullets() {
        let patient = PatientSnapshot::default();
        let symptoms = vec!["fever".to_string(), "cough".to_string()];
        let findings = vec!["Influenza".to_string()];
        let prompt = render(
            Intent::GeneralDialogue,
            &PromptInput {
                symptoms: &symptoms,
                clinical_findings: &findings,
                ..input(&patient, "Hello")
            },
        );
        assert!(prompt.contains("\nCurrent Symptoms:\n- fever\n- cough\n"));
        assert!(prompt.contains("\nEstablished Clinical Findings:\n- Influenza\n"));
    }

    #[test]
    fn test_recent_discussion_keeps_last_three() {
        let patient = PatientSnapshot::default();
        let messages = vec![
            message(Role::User, "one"),
            message(Role::Assistant, "two"),
            message(Role::User, "three"),
            message(Role::Assistant, "four"),
        ];
        let prompt = render(
            Intent::GeneralDialogue,
            &PromptInput {
                recent_messages: &messages,
                ..input(&patient, "Hello")
            },
        );
        assert!(prompt.contains("\nRecent Discussion:\nAssistant: two\nUser: three\nAssistant: four\n"));
        assert!(!prompt.contains("User: one"));
    }

    #[test]
    fn test_doctor_notes_only_non_empty_blocks() {
        let patient = PatientSnapshot::default();
        let notes = DoctorNotes {
            physical_exam: "Crackles at right base".to_string(),
            potential_diagnosis: "Pneumonia".to_string(),
            ..Default::default()
        };
        let prompt = render(
            Intent::GeneralDialogue,
            &PromptInput {
                doctor_notes: Some(&notes),
                ..input(&patient, "Hello")
            },
        );
        assert!(prompt.contains(
            "\nDoctor's Notes:\nPhysical Examination:\nCrackles at right base\nPotential Diagnosis:\nPneumonia\n"
        ));
        assert!(!prompt.contains("Clinical Notes:"));

        let empty = DoctorNotes::default();
        let prompt = render(
            Intent::GeneralDialogue,
            &PromptInput {
                doctor_notes: Some(&empty),
                ..input(&patient, "Hello")
            },
        );
        assert!(!prompt.contains("Doctor's Notes"));
    }

    #[test]
    fn test_treatment_without_diagnosis_degrades() {
        let patient = PatientSnapshot::default();
        let prompt = render(Intent::Treatment, &input(&patient, "What treatment?"));
        assert!(prompt.starts_with("Working diagnosis: diagnosis not yet established\n"));
        assert!(prompt.contains("First-line treatment options"));

        let prompt = render(
            Intent::Treatment,
            &PromptInput {
                current_diagnosis: Some("Influenza"),
                ..input(&patient, "What treatment?")
            },
        );
        assert!(prompt.starts_with("Working diagnosis: Influenza\n"));
    }

    #[test]
    fn test_intent_specific_instructions() {
        let patient = PatientSnapshot::default();
        let general = render(Intent::GeneralDialogue, &input(&patient, "q"));
        let diagnosis = render(Intent::Diagnosis, &input(&patient, "q"));
        assert!(general.contains("previous turns"));
        assert!(diagnosis.contains("ordered from most to least likely"));
        assert!(diagnosis.contains("Red flags to consider"));
        assert!(diagnosis.contains("Suggested immediate actions"));
    }

    #[test]
    fn test_one_shot_templates_fill_defaults() {
        let patient = PatientSnapshot {
            age: "62".to_string(),
            ..Default::default()
        };
        let prediction = disease_prediction(&patient, &[]);
        assert!(prediction.contains("Age: 62"));
        assert!(prediction.contains("Gender: Not specified"));
        assert!(prediction.contains("Current Symptoms: None reported"));

        let analysis = diagnosis_analysis("Angina", &["chest pain".to_string()], &patient);
        assert!(analysis.contains("why Angina is being considered"));
        assert!(analysis.contains("- Current Symptoms: chest pain"));

        let summary = patient_summary(&patient);
        assert!(summary.contains("- Age: 62\n"));
    }

    #[test]
    fn test_summary_uses_key_names() {
        let patient = PatientSnapshot {
            current_medications: "Metformin".to_string(),
            lab_results: "HbA1c 7.9".to_string(),
            ..Default::default()
        };
        let summary = patient_summary(&patient);
        assert!(summary.contains("- Current Medications: Metformin\n- Lab Results: HbA1c 7.9\n"));
        assert!(!summary.contains("- Medications:"));
    }

    #[test]
    fn test_research_chat_carries_history() {
        let history = vec![
            ChatTurn {
                role: Role::User,
                content: "What is GLP-1?".to_string(),
            },
            ChatTurn {
                role: Role::Assistant,
                content: "An incretin hormone.".to_string(),
            },
        ];
        let prompt = research_chat("Any trials in obesity?", &history);
        assert!(prompt.starts_with("You are a medical research assistant AI."));
        assert!(prompt.contains("User: What is GLP-1?\nAssistant: An incretin hormone.\n"));
        assert!(prompt.ends_with("User: Any trials in obesity?"));

        let fresh = research_chat("Hello", &[]);
        assert!(!fresh.contains("Conversation so far"));
    }
}
