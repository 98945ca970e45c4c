use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::Json,
    routing::{get, post},
};
use dialogue_flow::{ConversationState, DialogueError, DialogueOrchestrator, DialogueRequest};
use serde_json::{Value, json};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{Instrument, error, info};
use uuid::Uuid;

use crate::{
    config::Settings,
    models::{
        AnalysisResponse, AskResponse, DiagnosisAnalysisRequest, LastPromptResponse,
        PredictDiseasesRequest, PredictionResponse, ResearchChatRequest, ResearchChatResponse,
        SummaryResponse,
    },
    patients::{PatientDirectory, PatientRecord},
    workflow::{build_dialogue_orchestrator, create_patient_store, spawn_conversation_reaper},
};

const SERVICE_UNAVAILABLE_MESSAGE: &str = "Service temporarily unavailable. Please try again.";

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "id": id
        })),
    )
}

fn internal_error(message: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
}

fn service_unavailable_error() -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": SERVICE_UNAVAILABLE_MESSAGE })),
    )
}

/// Client errors keep their message; everything else is replaced by `message`.
fn dialogue_error(e: &DialogueError, message: &str) -> ApiError {
    if e.is_client_error() {
        bad_request_error(&e.to_string())
    } else {
        internal_error(message)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: DialogueOrchestrator,
    pub patients: PatientDirectory,
}

pub async fn create_app(settings: &Settings) -> Router {
    let app_state = create_app_state(settings).await;
    build_router(app_state, cors_layer(&settings.allowed_origins))
}

async fn create_app_state(settings: &Settings) -> AppState {
    let orchestrator = build_dialogue_orchestrator(settings);
    if let Some(ttl) = settings.conversation_ttl {
        info!(ttl_secs = ttl.as_secs(), "Idle conversations will be evicted");
        spawn_conversation_reaper(orchestrator.store().clone(), ttl);
    }

    let patients = PatientDirectory::new(create_patient_store(settings).await);

    AppState {
        orchestrator,
        patients,
    }
}

pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn build_router(app_state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/ask", post(ask))
        .route("/analyze-diagnosis", post(analyze_diagnosis))
        .route("/predict-diseases", post(predict_diseases))
        .route("/research-chat", post(research_chat))
        .route("/patients", get(list_patients))
        .route("/patients/{patient_id}", get(get_patient))
        .route("/patient-summary/{patient_id}", get(patient_summary))
        .route("/conversations/{conversation_id}", get(get_conversation))
        .route("/last-prompt", get(last_prompt))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(correlation_id_middleware))
        .with_state(app_state)
}

/// Middleware to add correlation ID to all requests
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Clinical Assistant Service",
        "version": "1.0.0",
        "description": "Conversational clinical decision support with per-conversation context",
        "endpoints": {
            "POST /ask": "Ask a clinical question within a conversation",
            "POST /analyze-diagnosis": "Explain why a diagnosis is being considered",
            "POST /predict-diseases": "Suggest potential diseases and investigations",
            "POST /research-chat": "Discuss medical research with the assistant",
            "GET /patients": "List patients",
            "GET /patients/{patient_id}": "Get a patient record",
            "GET /patient-summary/{patient_id}": "Brief clinical summary of a patient",
            "GET /conversations/{conversation_id}": "Inspect accumulated conversation state",
            "GET /last-prompt": "The most recent dialogue prompt",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn ask(
    State(state): State<AppState>,
    Json(request): Json<DialogueRequest>,
) -> ApiResult<AskResponse> {
    info!(
        conversation_id = ?request.conversation_id,
        question_length = request.question.len(),
        symptoms = request.symptoms.len(),
        "Received clinical question"
    );

    match state.orchestrator.ask(&request).await {
        Ok(turn) => Ok(Json(AskResponse {
            answer: turn.answer,
        })),
        Err(e) => {
            error!(
                conversation_id = ?request.conversation_id,
                error = %e,
                "Failed to answer clinical question"
            );
            Err(service_unavailable_error())
        }
    }
}

async fn analyze_diagnosis(
    State(state): State<AppState>,
    Json(request): Json<DiagnosisAnalysisRequest>,
) -> ApiResult<AnalysisResponse> {
    info!(diagnosis = %request.diagnosis, "Analyzing diagnosis");

    state
        .orchestrator
        .analyze_diagnosis(&request.diagnosis, &request.symptoms, &request.patient_data)
        .await
        .map(|analysis| Json(AnalysisResponse { analysis }))
        .map_err(|e| {
            error!(error = %e, "Diagnosis analysis failed");
            dialogue_error(&e, "Error generating analysis from AI model")
        })
}

async fn predict_diseases(
    State(state): State<AppState>,
    Json(request): Json<PredictDiseasesRequest>,
) -> ApiResult<PredictionResponse> {
    info!(symptoms = request.symptoms.len(), "Predicting potential diseases");

    state
        .orchestrator
        .predict_diseases(&request.patient, &request.symptoms)
        .await
        .map(|prediction| Json(PredictionResponse { prediction }))
        .map_err(|e| {
            error!(error = %e, "Disease prediction failed");
            dialogue_error(&e, "Error generating disease prediction")
        })
}

async fn research_chat(
    State(state): State<AppState>,
    Json(request): Json<ResearchChatRequest>,
) -> ApiResult<ResearchChatResponse> {
    info!(history = request.history.len(), "Research chat message");

    state
        .orchestrator
        .research_chat(&request.message, &request.history)
        .await
        .map(|response| Json(ResearchChatResponse { response }))
        .map_err(|e| {
            error!(error = %e, "Research chat failed");
            dialogue_error(&e, "Error generating research response")
        })
}

async fn list_patients(State(state): State<AppState>) -> Json<Vec<PatientRecord>> {
    Json(state.patients.list().await)
}

async fn get_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> ApiResult<PatientRecord> {
    state
        .patients
        .get(&patient_id)
        .await
        .map(Json)
        .ok_or_else(|| not_found_error("Patient not found", &patient_id))
}

async fn patient_summary(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> ApiResult<SummaryResponse> {
    info!(patient_id = %patient_id, "Generating patient summary");

    let patient = state
        .patients
        .get(&patient_id)
        .await
        .ok_or_else(|| not_found_error("Patient not found", &patient_id))?;

    state
        .orchestrator
        .summarize_patient(&patient.snapshot)
        .await
        .map(|summary| Json(SummaryResponse { summary }))
        .map_err(|e| {
            error!(patient_id = %patient_id, error = %e, "Patient summary failed");
            dialogue_error(&e, "Error generating summary")
        })
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> ApiResult<ConversationState> {
    state
        .orchestrator
        .conversation(&conversation_id)
        .await
        .map(Json)
        .ok_or_else(|| not_found_error("Conversation not found", &conversation_id))
}

async fn last_prompt(State(state): State<AppState>) -> Json<LastPromptResponse> {
    Json(LastPromptResponse {
        prompt: state.orchestrator.last_prompt().await,
    })
}
