//! DialogueOrchestrator – runs one clinical question through the full pipeline:
//! resolve conversation → classify → render → quality gate → complete → parse → record.
//!
//! ## Locking
//! The conversation lock is taken twice per turn: once to snapshot what the
//! prompt needs, and once to record the results. It is never held while the
//! completion call is in flight, so a slow model answer on one turn does not
//! stall readers of the same conversation.
//!
//! ## Failure
//! Any error before the second lock leaves the conversation untouched. Callers
//! receive a [`DialogueError`]; its message is meant for logs, not for end users.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    completion::{CompletionClient, GenerationParams},
    context::{ChatTurn, ConversationState, Message, Role},
    error::{DialogueError, Result},
    intent::{Intent, IntentClassifier, KeywordIntentClassifier},
    parser,
    patient::{DoctorNotes, PatientSnapshot},
    prompt::{self, PromptInput, RECENT_MESSAGE_WINDOW},
    quality,
    storage::ConversationStore,
};

pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

/// A clinical question with the patient context it should be answered in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DialogueRequest {
    pub question: String,
    #[serde(default)]
    pub patient_data: PatientSnapshot,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub clinical_findings: Vec<String>,
    /// Absent means the turn is not remembered.
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub doctor_notes: Option<DoctorNotes>,
}

impl DialogueRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn in_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_symptoms<I, S>(mut self, symptoms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symptoms = symptoms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_patient(mut self, patient: PatientSnapshot) -> Self {
        self.patient_data = patient;
        self
    }

    pub fn with_doctor_notes(mut self, notes: DoctorNotes) -> Self {
        self.doctor_notes = Some(notes);
        self
    }
}

/// Outcome of a successful turn.
#[derive(Debug, Clone, Serialize)]
pub struct DialogueTurn {
    pub answer: String,
    pub intent: Intent,
    pub diagnoses: Vec<String>,
    pub red_flags: Vec<String>,
}

/// Lifecycle of a single turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TurnState {
    Idle,
    PromptReady,
    Completing,
    Parsed,
    Done,
    Failed,
}

struct TurnTracker {
    conversation: String,
    state: TurnState,
}

impl TurnTracker {
    fn new(conversation: String) -> Self {
        Self {
            conversation,
            state: TurnState::Idle,
        }
    }

    fn advance(&mut self, next: TurnState) {
        debug!(
            conversation_id = %self.conversation,
            from = ?self.state,
            to = ?next,
            "Dialogue turn transition"
        );
        self.state = next;
    }

    fn fail(&mut self, err: &DialogueError) {
        error!(
            conversation_id = %self.conversation,
            state = ?self.state,
            error = %err,
            "Dialogue turn failed"
        );
        self.state = TurnState::Failed;
    }
}

/// What a prompt needs from conversation state, copied out under the lock.
struct PromptContext {
    recent_messages: Vec<Message>,
    clinical_findings: Vec<String>,
    current_diagnosis: Option<String>,
}

impl PromptContext {
    fn capture(
        state: &ConversationState,
        request_findings: &[String],
        notes: Option<&DoctorNotes>,
    ) -> Self {
        let recent_messages = state
            .recent_messages(RECENT_MESSAGE_WINDOW)
            .cloned()
            .collect();

        let mut clinical_findings: Vec<String> =
            state.finding_texts().map(str::to_string).collect();
        for finding in request_findings.iter().map(|f| f.trim()) {
            if !finding.is_empty() && !clinical_findings.iter().any(|f| f == finding) {
                clinical_findings.push(finding.to_string());
            }
        }

        let current_diagnosis = state
            .current_diagnosis()
            .or_else(|| notes.and_then(DoctorNotes::potential_diagnosis))
            .map(str::to_string);

        Self {
            recent_messages,
            clinical_findings,
            current_diagnosis,
        }
    }
}

/// Wires conversation state, prompt templates and the completion client.
#[derive(Clone)]
pub struct DialogueOrchestrator {
    store: Arc<dyn ConversationStore>,
    completion: Arc<dyn CompletionClient>,
    classifier: Arc<dyn IntentClassifier>,
    params: GenerationParams,
    completion_timeout: Duration,
    last_prompt: Arc<RwLock<String>>,
}

impl DialogueOrchestrator {
    pub fn new(store: Arc<dyn ConversationStore>, completion: Arc<dyn CompletionClient>) -> Self {
        Self {
            store,
            completion,
            classifier: Arc::new(KeywordIntentClassifier),
            params: GenerationParams::DIALOGUE,
            completion_timeout: DEFAULT_COMPLETION_TIMEOUT,
            last_prompt: Arc::new(RwLock::new(String::new())),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn IntentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Sampling settings for dialogue turns; one-shot operations keep their own.
    pub fn with_generation_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Answer one clinical question and fold the answer into the conversation.
    pub async fn ask(&self, request: &DialogueRequest) -> Result<DialogueTurn> {
        let label = request
            .conversation_id
            .clone()
            .unwrap_or_else(|| format!("ephemeral-{}", Uuid::new_v4()));
        let mut turn = TurnTracker::new(label);

        match self.run_turn(request, &mut turn).await {
            Ok(result) => {
                turn.advance(TurnState::Done);
                Ok(result)
            }
            Err(e) => {
                turn.fail(&e);
                Err(e)
            }
        }
    }

    async fn run_turn(
        &self,
        request: &DialogueRequest,
        turn: &mut TurnTracker,
    ) -> Result<DialogueTurn> {
        let conversation = self
            .store
            .get_or_create(request.conversation_id.as_deref())
            .await;

        let intent = self.classifier.classify(&request.question);
        info!(
            conversation_id = %turn.conversation,
            intent = ?intent,
            "Processing clinical question"
        );

        let snapshot = {
            let state = conversation.lock().await;
            PromptContext::capture(
                &state,
                &request.clinical_findings,
                request.doctor_notes.as_ref(),
            )
        };

        let input = PromptInput {
            patient: &request.patient_data,
            symptoms: &request.symptoms,
            recent_messages: &snapshot.recent_messages,
            clinical_findings: &snapshot.clinical_findings,
            doctor_notes: request.doctor_notes.as_ref(),
            current_diagnosis: snapshot.current_diagnosis.as_deref(),
            question: &request.question,
        };
        let mut rendered = prompt::render(intent, &input);
        turn.advance(TurnState::PromptReady);

        if !quality::validate(&rendered) {
            debug!(
                conversation_id = %turn.conversation,
                missing = ?quality::missing_sections(&rendered),
                "Prompt missing required sections, enhancing"
            );
            rendered = quality::enhance(&rendered);
        }
        *self.last_prompt.write().await = rendered.clone();

        turn.advance(TurnState::Completing);
        let answer = self.complete(&rendered, self.params).await?;

        let parsed = parser::parse(&answer);
        turn.advance(TurnState::Parsed);

        {
            let mut state = conversation.lock().await;
            for diagnosis in &parsed.diagnoses {
                state.record_finding(diagnosis.clone());
                if intent == Intent::Diagnosis {
                    state.record_differential(diagnosis.clone());
                }
            }
            for flag in &parsed.red_flags {
                state.record_red_flag(flag.clone());
            }
            if intent == Intent::Treatment {
                if let Some(diagnosis) = request
                    .doctor_notes
                    .as_ref()
                    .and_then(DoctorNotes::potential_diagnosis)
                {
                    state.set_current_diagnosis(diagnosis);
                }
            }
            state.append_message(request.question.clone(), Role::User);
            state.append_message(answer.clone(), Role::Assistant);
        }

        info!(
            conversation_id = %turn.conversation,
            diagnoses = parsed.diagnoses.len(),
            red_flags = parsed.red_flags.len(),
            "Clinical question answered"
        );

        Ok(DialogueTurn {
            answer,
            intent,
            diagnoses: parsed.diagnoses,
            red_flags: parsed.red_flags,
        })
    }

    /// Brief clinical summary of a patient. Does not touch conversation state.
    pub async fn summarize_patient(&self, patient: &PatientSnapshot) -> Result<String> {
        let prompt = prompt::patient_summary(patient);
        self.complete(&prompt, GenerationParams::SUMMARY).await
    }

    /// Potential diseases and recommended investigations for a presentation.
    pub async fn predict_diseases(
        &self,
        patient: &PatientSnapshot,
        symptoms: &[String],
    ) -> Result<String> {
        let prompt = prompt::disease_prediction(patient, symptoms);
        self.complete(&prompt, GenerationParams::ANALYSIS).await
    }

    /// Why `diagnosis` is being considered for this patient.
    pub async fn analyze_diagnosis(
        &self,
        diagnosis: &str,
        symptoms: &[String],
        patient: &PatientSnapshot,
    ) -> Result<String> {
        let diagnosis = diagnosis.trim();
        if diagnosis.is_empty() {
            return Err(DialogueError::InvalidArgument(
                "Diagnosis cannot be empty".to_string(),
            ));
        }

        let prompt = prompt::diagnosis_analysis(diagnosis, symptoms, patient);
        self.complete(&prompt, GenerationParams::ANALYSIS).await
    }

    /// Research-assistant reply. Stateless: the history travels with the call.
    pub async fn research_chat(&self, message: &str, history: &[ChatTurn]) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(DialogueError::InvalidArgument(
                "Message cannot be empty".to_string(),
            ));
        }

        let prompt = prompt::research_chat(message, history);
        self.complete(&prompt, GenerationParams::RESEARCH).await
    }

    /// The most recent dialogue prompt sent to the model.
    pub async fn last_prompt(&self) -> String {
        self.last_prompt.read().await.clone()
    }

    /// Copy of a stored conversation, if it exists.
    pub async fn conversation(&self, id: &str) -> Option<ConversationState> {
        let handle = self.store.get(id).await?;
        let state = handle.lock().await;
        Some(state.clone())
    }

    async fn complete(&self, prompt: &str, params: GenerationParams) -> Result<String> {
        let outcome = tokio::time::timeout(
            self.completion_timeout,
            self.completion.complete(prompt, params),
        )
        .await
        .map_err(|_| DialogueError::CompletionTimeout(self.completion_timeout))?;

        let text = outcome.map_err(|e| DialogueError::UpstreamFailure(e.to_string()))?;
        if text.trim().is_empty() {
            return Err(DialogueError::NoResponseGenerated);
        }
        Ok(text)
    }
}
