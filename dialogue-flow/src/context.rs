use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Default bound on the message history kept per conversation.
pub const DEFAULT_MAX_MESSAGES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Capitalised form used when rendering a transcript line.
    pub fn title(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A prior exchange supplied by the caller rather than kept in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalFinding {
    pub finding: String,
    pub timestamp: DateTime<Utc>,
}

/// Accumulated state of one dialogue.
///
/// `messages` is a bounded FIFO; every other collection only grows.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationState {
    messages: VecDeque<Message>,
    max_messages: usize,
    clinical_findings: Vec<ClinicalFinding>,
    differential_diagnoses: Vec<String>,
    current_diagnosis: Option<String>,
    red_flags: Vec<String>,
    #[serde(skip)]
    last_touched: Instant,
}

impl ConversationState {
    pub fn new(max_messages: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(max_messages.saturating_add(1)),
            max_messages,
            clinical_findings: Vec::new(),
            differential_diagnoses: Vec::new(),
            current_diagnosis: None,
            red_flags: Vec::new(),
            last_touched: Instant::now(),
        }
    }

    /// Append a message, evicting the oldest entries once the bound is exceeded.
    pub fn append_message(&mut self, content: impl Into<String>, role: Role) {
        self.messages.push_back(Message {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
        while self.messages.len() > self.max_messages {
            self.messages.pop_front();
        }
        self.touch();
    }

    pub fn record_finding(&mut self, finding: impl Into<String>) {
        self.clinical_findings.push(ClinicalFinding {
            finding: finding.into(),
            timestamp: Utc::now(),
        });
        self.touch();
    }

    pub fn record_differential(&mut self, diagnosis: impl Into<String>) {
        self.differential_diagnoses.push(diagnosis.into());
        self.touch();
    }

    pub fn record_red_flag(&mut self, flag: impl Into<String>) {
        self.red_flags.push(flag.into());
        self.touch();
    }

    pub fn set_current_diagnosis(&mut self, diagnosis: impl Into<String>) {
        self.current_diagnosis = Some(diagnosis.into());
        self.touch();
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// The last `n` messages, oldest first.
    pub fn recent_messages(&self, n: usize) -> impl Iterator<Item = &Message> {
        self.messages.iter().skip(self.messages.len().saturating_sub(n))
    }

    pub fn clinical_findings(&self) -> &[ClinicalFinding] {
        &self.clinical_findings
    }

    pub fn finding_texts(&self) -> impl Iterator<Item = &str> {
        self.clinical_findings.iter().map(|f| f.finding.as_str())
    }

    pub fn differential_diagnoses(&self) -> &[String] {
        &self.differential_diagnoses
    }

    pub fn current_diagnosis(&self) -> Option<&str> {
        self.current_diagnosis.as_deref()
    }

    pub fn red_flags(&self) -> &[String] {
        &self.red_flags
    }

    /// Time since the state was created or last modified.
    pub fn idle_for(&self) -> Duration {
        self.last_touched.elapsed()
    }

    fn touch(&mut self) {
        self.last_touched = Instant::now();
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_history_is_bounded_fifo() {
        let mut state = ConversationState::default();
        for i in 0..25 {
            state.append_message(format!("message {}", i), Role::User);
            assert!(state.message_count() <= DEFAULT_MAX_MESSAGES);
        }

        let contents: Vec<_> = state.messages().map(|m| m.content.as_str()).collect();
        assert_eq!(contents.len(), DEFAULT_MAX_MESSAGES);
        assert_eq!(contents.first(), Some(&"message 15"));
        assert_eq!(contents.last(), Some(&"message 24"));
    }

    #[test]
    fn test_recent_messages_window() {
        let mut state = ConversationState::new(4);
        state.append_message("first", Role::User);
        state.append_message("second", Role::Assistant);

        let recent: Vec<_> = state.recent_messages(3).map(|m| m.content.clone()).collect();
        assert_eq!(recent, vec!["first", "second"]);

        state.append_message("third", Role::User);
        state.append_message("fourth", Role::Assistant);
        let recent: Vec<_> = state.recent_messages(3).map(|m| m.content.clone()).collect();
        assert_eq!(recent, vec!["second", "third", "fourth"]);
    }

    #[test]
    fn test_findings_are_not_deduplicated() {
        let mut state = ConversationState::default();
        state.record_finding("Influenza");
        state.record_finding("Influenza");
        assert_eq!(state.finding_texts().collect::<Vec<_>>(), vec!["Influenza", "Influenza"]);
    }

    #[test]
    fn test_current_diagnosis_starts_empty() {
        let mut state = ConversationState::default();
        assert_eq!(state.current_diagnosis(), None);
        state.set_current_diagnosis("Community-acquired pneumonia");
        assert_eq!(state.current_diagnosis(), Some("Community-acquired pneumonia"));
    }
}
