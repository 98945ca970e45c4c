pub mod completion;
pub mod config;
pub mod models;
pub mod patients;
pub mod service;
pub mod workflow;

pub use config::{ConfigError, Settings};
pub use patients::{
    InMemoryPatientStore, PatientDirectory, PatientRecord, PatientStore, PostgresPatientStore,
};
pub use service::{AppState, build_router, create_app};
