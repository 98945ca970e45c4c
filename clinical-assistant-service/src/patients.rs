use async_trait::async_trait;
use dashmap::DashMap;
use dialogue_flow::{DialogueError, PatientSnapshot, Result};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, postgres::PgPoolOptions, types::Json};
use std::sync::Arc;
use tracing::{info, warn};

/// Upper bound on records returned by a listing.
const LIST_LIMIT: i64 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(flatten)]
    pub snapshot: PatientSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

/// Document store holding patient records
#[async_trait]
pub trait PatientStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<PatientRecord>>;
    async fn find_by_id(&self, id: &str) -> Result<Option<PatientRecord>>;
}

/// Record served whenever the patient store cannot be reached.
pub fn sample_patient(id: &str) -> PatientRecord {
    PatientRecord {
        id: id.to_string(),
        name: "John Doe".to_string(),
        status: "Active".to_string(),
        snapshot: PatientSnapshot {
            age: "45".to_string(),
            gender: "male".to_string(),
            chief_complaint: "chest pain".to_string(),
            vital_signs: "BP 120/80, HR 72".to_string(),
            medical_history: "Hypertension".to_string(),
            current_medications: "Lisinopril".to_string(),
            allergies: "None".to_string(),
            lab_results: "Normal CBC".to_string(),
        },
        photo: None,
    }
}

/// Patient lookups with a degraded mode: store failures are logged and
/// answered with [`sample_patient`] instead of being surfaced.
#[derive(Clone)]
pub struct PatientDirectory {
    store: Arc<dyn PatientStore>,
}

impl PatientDirectory {
    pub fn new(store: Arc<dyn PatientStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Vec<PatientRecord> {
        match self.store.find_all().await {
            Ok(patients) => patients,
            Err(e) => {
                warn!(error = %e, "Patient store unavailable, serving sample record");
                vec![sample_patient("1")]
            }
        }
    }

    /// `None` only when a healthy store has no such patient.
    pub async fn get(&self, id: &str) -> Option<PatientRecord> {
        match self.store.find_by_id(id).await {
            Ok(patient) => patient,
            Err(e) => {
                warn!(patient_id = %id, error = %e, "Patient store unavailable, serving sample record");
                Some(sample_patient(id))
            }
        }
    }
}

/// Postgres-backed store; each record is kept as a JSONB document keyed by id.
pub struct PostgresPatientStore {
    pool: PgPool,
}

impl PostgresPatientStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS patients (
                id TEXT PRIMARY KEY,
                data JSONB NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        info!("Connected to patient store");
        Ok(Self { pool })
    }

    /// Replace every stored patient with `records`, in one transaction.
    pub async fn replace_all(&self, records: &[PatientRecord]) -> anyhow::Result<usize> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM patients").execute(&mut *tx).await?;
        for record in records {
            sqlx::query("INSERT INTO patients (id, data) VALUES ($1, $2)")
                .bind(&record.id)
                .bind(Json(record.clone()))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(records.len())
    }
}

#[async_trait]
impl PatientStore for PostgresPatientStore {
    async fn find_all(&self) -> Result<Vec<PatientRecord>> {
        let rows: Vec<(Json<PatientRecord>,)> =
            sqlx::query_as("SELECT data FROM patients ORDER BY id LIMIT $1")
                .bind(LIST_LIMIT)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DialogueError::StoreFailure(e.to_string()))?;

        Ok(rows.into_iter().map(|(Json(record),)| record).collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<PatientRecord>> {
        let row: Option<(Json<PatientRecord>,)> =
            sqlx::query_as("SELECT data FROM patients WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DialogueError::StoreFailure(e.to_string()))?;

        Ok(row.map(|(Json(record),)| record))
    }
}

/// In-memory implementation of PatientStore
pub struct InMemoryPatientStore {
    patients: Arc<DashMap<String, PatientRecord>>,
}

impl InMemoryPatientStore {
    pub fn new() -> Self {
        Self {
            patients: Arc::new(DashMap::new()),
        }
    }

    pub fn with_records(records: impl IntoIterator<Item = PatientRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.patients.insert(record.id.clone(), record);
        }
        store
    }
}

impl Default for InMemoryPatientStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PatientStore for InMemoryPatientStore {
    async fn find_all(&self) -> Result<Vec<PatientRecord>> {
        let mut patients: Vec<_> = self
            .patients
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        patients.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(patients)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<PatientRecord>> {
        Ok(self.patients.get(id).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Store that fails every call, as an unreachable database would.
    pub(crate) struct UnreachableStore;

    #[async_trait]
    impl PatientStore for UnreachableStore {
        async fn find_all(&self) -> Result<Vec<PatientRecord>> {
            Err(DialogueError::StoreFailure("connection refused".to_string()))
        }

        async fn find_by_id(&self, _id: &str) -> Result<Option<PatientRecord>> {
            Err(DialogueError::StoreFailure("connection refused".to_string()))
        }
    }

    fn patient(id: &str, name: &str) -> PatientRecord {
        PatientRecord {
            id: id.to_string(),
            name: name.to_string(),
            ..sample_patient(id)
        }
    }

    #[tokio::test]
    async fn test_directory_reads_healthy_store() {
        let directory = PatientDirectory::new(Arc::new(InMemoryPatientStore::with_records([
            patient("b", "Jane Smith"),
            patient("a", "Maria Garcia"),
        ])));

        let names: Vec<_> = directory.list().await.into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Maria Garcia", "Jane Smith"]);
        assert_eq!(directory.get("b").await.unwrap().name, "Jane Smith");
        assert!(directory.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_directory_falls_back_to_sample() {
        let directory = PatientDirectory::new(Arc::new(UnreachableStore));

        let patients = directory.list().await;
        assert_eq!(patients, vec![sample_patient("1")]);

        let patient = directory.get("42").await.unwrap();
        assert_eq!(patient.id, "42");
        assert_eq!(patient.name, "John Doe");
    }

    #[test]
    fn test_record_flattens_snapshot_fields() {
        let record: PatientRecord = serde_json::from_str(
            r#"{"id": "7", "name": "Emma Davis", "age": "33", "allergies": "Latex", "status": "Active"}"#,
        )
        .unwrap();
        assert_eq!(record.snapshot.age, "33");
        assert_eq!(record.snapshot.allergies, "Latex");
        assert!(record.photo.is_none());

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["age"], "33");
        assert!(value.get("snapshot").is_none());
        assert!(value.get("photo").is_none());
    }
}
