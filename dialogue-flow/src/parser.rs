//! Best-effort extraction of diagnoses and red flags from model output.
//!
//! Each pass is a small line scanner: it waits for a trigger header, collects
//! bullet lines, and stops at the first markdown heading after the trigger.
//! Nothing here fails; text without a matching header yields an empty list.

use serde::{Deserialize, Serialize};

const DIAGNOSIS_HEADERS: &[&str] = &[
    "diagnosis:",
    "diagnoses:",
    "differential diagnosis:",
    "assessment:",
];

const RED_FLAG_HEADERS: &[&str] = &["red flags:", "warnings:", "caution:"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub diagnoses: Vec<String>,
    pub red_flags: Vec<String>,
}

/// Run both extraction passes over `text`.
pub fn parse(text: &str) -> ParsedResponse {
    ParsedResponse {
        diagnoses: extract_diagnoses(text),
        red_flags: extract_red_flags(text),
    }
}

/// Diagnosis labels: the part of each bullet before its first colon.
pub fn extract_diagnoses(text: &str) -> Vec<String> {
    SectionScanner::new(DIAGNOSIS_HEADERS, diagnosis_label).scan(text)
}

/// Red flags: the full text of each bullet.
pub fn extract_red_flags(text: &str) -> Vec<String> {
    SectionScanner::new(RED_FLAG_HEADERS, |item| Some(item.to_string())).scan(text)
}

fn diagnosis_label(item: &str) -> Option<String> {
    let label = item.split(':').next()?.trim().trim_matches('*').trim();
    (!label.is_empty()).then(|| label.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Searching,
    InSection,
    Finished,
}

struct SectionScanner {
    headers: &'static [&'static str],
    extract: fn(&str) -> Option<String>,
}

impl SectionScanner {
    fn new(headers: &'static [&'static str], extract: fn(&str) -> Option<String>) -> Self {
        Self { headers, extract }
    }

    fn scan(&self, text: &str) -> Vec<String> {
        let mut state = ScanState::Searching;
        let mut items = Vec::new();

        for line in text.lines() {
            state = self.step(state, line.trim(), &mut items);
            if state == ScanState::Finished {
                break;
            }
        }
        items
    }

    fn step(&self, state: ScanState, line: &str, items: &mut Vec<String>) -> ScanState {
        match state {
            ScanState::Searching if self.is_header(line) => ScanState::InSection,
            ScanState::Searching => ScanState::Searching,
            ScanState::InSection if self.is_header(line) => ScanState::InSection,
            ScanState::InSection if line.starts_with('#') => ScanState::Finished,
            ScanState::InSection => {
                if let Some(item) = bullet_text(line).and_then(self.extract) {
                    items.push(item);
                }
                ScanState::InSection
            }
            ScanState::Finished => ScanState::Finished,
        }
    }

    fn is_header(&self, line: &str) -> bool {
        let line = line.to_lowercase();
        self.headers.iter().any(|header| line.contains(header))
    }
}

/// Text of a bullet line with the marker removed, or `None` for any other line.
///
/// `*` only counts as a marker when followed by whitespace, so `**bold**`
/// lines are not mistaken for bullets.
fn bullet_text(line: &str) -> Option<&str> {
    let rest = if let Some(rest) = line.strip_prefix('-').or_else(|| line.strip_prefix('•')) {
        rest.trim_start_matches('-')
    } else if let Some(rest) = line.strip_prefix("* ").or_else(|| line.strip_prefix("*\t")) {
        rest
    } else {
        return None;
    };

    let rest = rest.trim();
    (!rest.is_empty()).then_some(rest)
}
