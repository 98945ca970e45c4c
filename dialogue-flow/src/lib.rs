pub mod completion;
pub mod context;
pub mod error;
pub mod intent;
pub mod orchestrator;
pub mod parser;
pub mod patient;
pub mod prompt;
pub mod quality;
pub mod storage;

// Re-export commonly used types
pub use completion::{CompletionClient, GenerationParams};
pub use context::{
    ChatTurn, ClinicalFinding, ConversationState, DEFAULT_MAX_MESSAGES, Message, Role,
};
pub use error::{DialogueError, Result};
pub use intent::{Intent, IntentClassifier, KeywordIntentClassifier};
pub use orchestrator::{
    DEFAULT_COMPLETION_TIMEOUT, DialogueOrchestrator, DialogueRequest, DialogueTurn, TurnState,
};
pub use parser::ParsedResponse;
pub use patient::{DoctorNotes, PATIENT_FIELDS, PatientSnapshot};
pub use storage::{ConversationHandle, ConversationStore, InMemoryConversationStore};
