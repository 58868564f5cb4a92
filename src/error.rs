use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrgHoursError>;

#[derive(Error, Debug)]
pub enum OrgHoursError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Command `{command}` failed ({status}): {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("Estimator output for {repo} is malformed: {source}")]
    MalformedOutput {
        repo: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Estimator not found: {0}")]
    EstimatorMissing(String),
    #[error("Report error: {0}")]
    Report(String),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] Box<ignore::Error>),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

impl From<ignore::Error> for OrgHoursError {
    fn from(err: ignore::Error) -> Self {
        OrgHoursError::Walk(Box::new(err))
    }
}
