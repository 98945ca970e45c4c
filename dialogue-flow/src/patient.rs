use serde::{Deserialize, Serialize};

/// Known snapshot fields and their prompt labels, in rendering order.
pub const PATIENT_FIELDS: [(&str, &str); 8] = [
    ("age", "Age"),
    ("gender", "Gender"),
    ("chief_complaint", "Chief Complaint"),
    ("vital_signs", "Vitals"),
    ("medical_history", "History"),
    ("current_medications", "Medications"),
    ("allergies", "Allergies"),
    ("lab_results", "Labs"),
];

/// Structured patient context supplied with a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientSnapshot {
    pub age: String,
    pub gender: String,
    pub chief_complaint: String,
    pub vital_signs: String,
    pub medical_history: String,
    pub current_medications: String,
    pub allergies: String,
    pub lab_results: String,
}

impl PatientSnapshot {
    /// Look up a field by its snake_case name.
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "age" => &self.age,
            "gender" => &self.gender,
            "chief_complaint" => &self.chief_complaint,
            "vital_signs" => &self.vital_signs,
            "medical_history" => &self.medical_history,
            "current_medications" => &self.current_medications,
            "allergies" => &self.allergies,
            "lab_results" => &self.lab_results,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Non-empty fields as `(label, value)` pairs, in [`PATIENT_FIELDS`] order.
    pub fn labeled_fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        PATIENT_FIELDS.iter().filter_map(move |&(name, label)| {
            let value = self.field(name)?.trim();
            (!value.is_empty()).then_some((label, value))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.labeled_fields().next().is_none()
    }
}

/// Free-text notes from the treating clinician, scoped to one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoctorNotes {
    pub physical_exam: String,
    pub clinical_notes: String,
    pub potential_diagnosis: String,
}

impl DoctorNotes {
    pub fn is_empty(&self) -> bool {
        self.sections().next().is_none()
    }

    /// Non-empty note fields as `(heading, text)` pairs.
    pub fn sections(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("Physical Examination", self.physical_exam.as_str()),
            ("Clinical Notes", self.clinical_notes.as_str()),
            ("Potential Diagnosis", self.potential_diagnosis.as_str()),
        ]
        .into_iter()
        .filter(|(_, text)| !text.trim().is_empty())
    }

    pub fn potential_diagnosis(&self) -> Option<&str> {
        let diagnosis = self.potential_diagnosis.trim();
        (!diagnosis.is_empty()).then_some(diagnosis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labeled_fields_follow_declared_order() {
        let snapshot = PatientSnapshot {
            lab_results: "Normal CBC".to_string(),
            age: "45".to_string(),
            current_medications: "Lisinopril".to_string(),
            medical_history: "Hypertension".to_string(),
            vital_signs: "BP 120/80".to_string(),
            ..Default::default()
        };

        let fields: Vec<_> = snapshot.labeled_fields().collect();
        assert_eq!(
            fields,
            vec![
                ("Age", "45"),
                ("Vitals", "BP 120/80"),
                ("History", "Hypertension"),
                ("Medications", "Lisinopril"),
                ("Labs", "Normal CBC"),
            ]
        );
    }

    #[test]
    fn test_blank_fields_are_skipped() {
        let snapshot = PatientSnapshot {
            gender: "   ".to_string(),
            ..Default::default()
        };
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.field("unknown"), None);
    }

    #[test]
    fn test_snapshot_ignores_unknown_keys() {
        let snapshot: PatientSnapshot = serde_json::from_str(
            r#"{"age": "30", "chief_complaint": "headache", "favourite_colour": "blue"}"#,
        )
        .unwrap();
        assert_eq!(snapshot.age, "30");
        assert_eq!(snapshot.chief_complaint, "headache");
        assert!(snapshot.gender.is_empty());
    }

    #[test]
    fn test_doctor_notes_sections() {
        let notes = DoctorNotes {
            clinical_notes: "Wheeze on expiration".to_string(),
            ..Default::default()
        };
        assert!(!notes.is_empty());
        assert_eq!(
            notes.sections().collect::<Vec<_>>(),
            vec![("Clinical Notes", "Wheeze on expiration")]
        );
        assert_eq!(notes.potential_diagnosis(), None);
        assert!(DoctorNotes::default().is_empty());
    }
}
