use crate::completion::OpenRouterCompletionClient;
use crate::config::Settings;
use crate::patients::{InMemoryPatientStore, PatientStore, PostgresPatientStore, sample_patient};
use dialogue_flow::{ConversationStore, DialogueOrchestrator, InMemoryConversationStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub fn build_dialogue_orchestrator(settings: &Settings) -> DialogueOrchestrator {
    let store = Arc::new(InMemoryConversationStore::with_max_messages(
        settings.max_conversation_history,
    ));
    let completion = Arc::new(OpenRouterCompletionClient::new(
        &settings.openrouter_api_key,
        settings.model.clone(),
    ));

    DialogueOrchestrator::new(store, completion)
        .with_generation_params(settings.generation)
        .with_completion_timeout(settings.completion_timeout)
}

/// Postgres when `DATABASE_URL` is set and reachable, otherwise an in-memory
/// store holding the sample record.
pub async fn create_patient_store(settings: &Settings) -> Arc<dyn PatientStore> {
    if let Some(database_url) = &settings.database_url {
        info!("Using PostgreSQL patient store");
        match PostgresPatientStore::connect(database_url).await {
            Ok(store) => return Arc::new(store),
            Err(e) => {
                error!(
                    "Failed to connect to PostgreSQL: {}. Falling back to in-memory patient store.",
                    e
                );
            }
        }
    } else {
        info!("Using in-memory patient store (set DATABASE_URL to use PostgreSQL)");
    }

    Arc::new(InMemoryPatientStore::with_records([sample_patient("1")]))
}

/// Periodically drop conversations idle for longer than `ttl`.
pub fn spawn_conversation_reaper(
    store: Arc<dyn ConversationStore>,
    ttl: Duration,
) -> JoinHandle<()> {
    let period = (ttl / 2).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            store.evict_idle(ttl).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogue_flow::Role;

    #[tokio::test]
    async fn test_reaper_evicts_idle_conversations() {
        let store: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());
        store
            .get_or_create(Some("stale"))
            .await
            .lock()
            .await
            .append_message("hello", Role::User);

        tokio::time::sleep(Duration::from_millis(30)).await;

        // The first tick fires immediately.
        let reaper = spawn_conversation_reaper(store.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        reaper.abort();

        assert!(store.get("stale").await.is_none());
    }
}
