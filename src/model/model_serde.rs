use crate::prelude::*;

pub mod prelude {
    pub use super::{
        ModelError,
        parse_model,
    };
}

#[derive(Debug)]
pub enum ModelError {
    IOError(std::io::Error),
    JSONError(serde_json::Error),
    NoProcessors,
    EmptyGroup { name: String },
    GroupIndexMismatch { name: String, expected: u32, found: u32 },
    UnknownGroup { owner: String, group: u32 },
    NonPositivePeriod { task: String },
    NegativeInterval { job: String },
    HyperperiodOverflow,
    DuplicateJobId(JobId),
}

/// Read and deserialize a JSON system model file.
///
/// Structural validation happens later, in [`SystemModel::expand`].
pub fn parse_model(path: &str) -> Result<SystemModel, ModelError> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

// =============================================================================

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "System model error, ")?;
        match self {
            ModelError::IOError(error) => write!(f, "IO: {error}")?,
            ModelError::JSONError(error) => write!(f, "JSON: {error}")?,
            ModelError::NoProcessors =>
                write!(f, "the model declares no processor groups")?,
            ModelError::EmptyGroup { name } =>
                write!(f, "processor group \"{name}\" has no cores")?,
            ModelError::GroupIndexMismatch { name, expected, found } =>
                write!(f, "processor group \"{name}\" has index {found}, expected {expected}")?,
            ModelError::UnknownGroup { owner, group } =>
                write!(f, "\"{owner}\" is pinned to unknown processor group {group}")?,
            ModelError::NonPositivePeriod { task } =>
                write!(f, "task \"{task}\" must have a positive period")?,
            ModelError::NegativeInterval { job } =>
                write!(f, "job \"{job}\" has a negative arrival or cost bound")?,
            ModelError::HyperperiodOverflow =>
                write!(f, "the task periods have no representable hyperperiod")?,
            ModelError::DuplicateJobId(id) =>
                write!(f, "duplicate job id {id}")?,
        };

        Ok(())
    }
}

impl std::error::Error for ModelError {}

impl From<std::io::Error> for ModelError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(value: serde_json::Error) -> Self {
        Self::JSONError(value)
    }
}

// =============================================================================

#[test]
fn parses_a_complete_model_file() {
    use std::io::Write as _;

    let data = r#"{
        "processors": [
            { "name": "P0", "id": 0, "cores": 2 }
        ],
        "tasks": [
            { "name": "T1", "id": 1, "jitter": 1, "period": 10,
              "cost": [1, 2], "deadline": 10 }
        ],
        "jobs": [
            { "name": "J9", "task_id": 9, "arrival": [0, 3],
              "cost": [2, 2], "deadline": 8, "processor": 0 }
        ],
        "events": { "arrival": true, "completion": true, "times": [5] }
    }"#;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(data.as_bytes()).unwrap();

    let model = parse_model(file.path().to_str().unwrap()).unwrap();
    assert_eq!(model.processors.len(), 1);
    assert_eq!(model.processors[0].cores, 2);
    assert_eq!(model.tasks[0].jitter, Time::ticks(1));
    assert_eq!(model.jobs[0].task, 9);
    assert!(model.events.completion);
    assert_eq!(model.events.times, vec![Time::ticks(5)]);

    let workload = model.expand().unwrap();
    assert_eq!(workload.jobs.len(), 2);
}

#[test]
fn missing_file_reports_an_io_error() {
    assert!(matches!(
        parse_model("/nonexistent/model.json"),
        Err(ModelError::IOError(_))
    ));
}

#[test]
fn malformed_json_reports_a_parse_error() {
    use std::io::Write as _;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"{ not json").unwrap();

    assert!(matches!(
        parse_model(file.path().to_str().unwrap()),
        Err(ModelError::JSONError(_))
    ));
}
