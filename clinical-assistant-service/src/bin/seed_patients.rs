//! Replace the patient table with synthetic records.
//!
//! ```text
//! DATABASE_URL=postgres://... cargo run --bin seed_patients -- --count 20
//! ```

use clap::Parser;
use clinical_assistant_service::{PatientRecord, PostgresPatientStore};
use dialogue_flow::PatientSnapshot;
use rand::{Rng, seq::IndexedRandom};
use uuid::Uuid;

const FIRST_NAMES: &[&str] = &[
    "John", "Jane", "Michael", "Sarah", "David", "Emma", "James", "Emily", "Robert", "Maria",
];
const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez",
];
const GENDERS: &[&str] = &["male", "female"];
const CONDITIONS: &[&str] = &[
    "Hypertension", "Diabetes", "Asthma", "Arthritis", "GERD", "Anxiety", "Depression", "Migraine",
];
const MEDICATIONS: &[&str] = &[
    "Lisinopril", "Metformin", "Albuterol", "Omeprazole", "Sertraline", "Ibuprofen",
    "Acetaminophen",
];
const ALLERGIES: &[&str] = &["Penicillin", "Sulfa", "Latex", "Peanuts", "None", "Aspirin"];
const COMPLAINTS: &[&str] = &[
    "chest pain",
    "headache",
    "abdominal pain",
    "shortness of breath",
    "back pain",
    "fever",
    "dizziness",
];
const STATUSES: &[&str] = &["Active", "Inactive"];

#[derive(Parser, Debug)]
#[command(about = "Seed the patient store with synthetic records")]
struct Args {
    /// Number of patients to generate
    #[arg(long, default_value_t = 20)]
    count: usize,
}

fn pick(rng: &mut impl Rng, values: &[&str]) -> String {
    values.choose(rng).copied().unwrap_or_default().to_string()
}

fn pick_several(rng: &mut impl Rng, values: &[&str]) -> String {
    let amount = rng.random_range(0..=3);
    values
        .choose_multiple(rng, amount)
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}

fn vital_signs(rng: &mut impl Rng) -> String {
    let temperature: f64 = rng.random_range(36.5..=37.5);
    format!(
        "BP {}/{}, HR {}, RR {}, Temp {:.1}°C",
        rng.random_range(110..=140),
        rng.random_range(60..=90),
        rng.random_range(60..=100),
        rng.random_range(12..=20),
        temperature
    )
}

fn lab_results(rng: &mut impl Rng) -> String {
    let wbc: f64 = rng.random_range(4.5..=11.0);
    let hgb: f64 = rng.random_range(12.0..=17.0);
    format!(
        "WBC {:.1}, HGB {:.1}, PLT {}",
        wbc,
        hgb,
        rng.random_range(150..=450)
    )
}

fn synthetic_patient(rng: &mut impl Rng) -> PatientRecord {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);

    PatientRecord {
        id,
        name: format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES)),
        status: pick(rng, STATUSES),
        snapshot: PatientSnapshot {
            age: rng.random_range(18..=85).to_string(),
            gender: pick(rng, GENDERS),
            chief_complaint: pick(rng, COMPLAINTS),
            vital_signs: vital_signs(rng),
            medical_history: pick_several(rng, CONDITIONS),
            current_medications: pick_several(rng, MEDICATIONS),
            allergies: pick(rng, ALLERGIES),
            lab_results: lab_results(rng),
        },
        photo: None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seed_patients=info,clinical_assistant_service=info".into()),
        )
        .init();

    let args = Args::parse();
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set to seed patients"))?;

    let mut rng = rand::rng();
    let patients: Vec<PatientRecord> = (0..args.count)
        .map(|_| synthetic_patient(&mut rng))
        .collect();

    let store = PostgresPatientStore::connect(&database_url).await?;
    let inserted = store.replace_all(&patients).await?;
    tracing::info!(inserted, "Seeded patient store");

    if let Some(sample) = patients.first() {
        println!("Sample patient:\n{}", serde_json::to_string_pretty(sample)?);
    }

    Ok(())
}
