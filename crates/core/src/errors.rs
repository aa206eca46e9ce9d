use std::path::PathBuf;

use thiserror::Error;

/// Fatal at startup: the collaborative path cannot exist without the artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("trained artifact was not found at `{0}`")]
    NotFound(PathBuf),
    #[error("could not read trained artifact `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not decode trained artifact `{path}`: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("trained artifact is inconsistent: {0}")]
    Invalid(String),
}

/// Degrades the content-based path; never fatal.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("inventory file was not found at `{0}`")]
    NotFound(PathBuf),
    #[error("could not read inventory `{path}`: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("inventory is missing required column `{0}`")]
    MissingColumn(&'static str),
    #[error("inventory contains no usable rows")]
    Empty,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AttributeError {
    #[error("request body must be a JSON object")]
    NotAnObject,
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("invalid field values: {}", .0.join(", "))]
    InvalidFields(Vec<String>),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RecommendError {
    #[error("content-based engine is unavailable")]
    ContentEngineUnavailable,
    #[error("k must not exceed {max}, got {requested}")]
    InvalidK { requested: usize, max: usize },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest {
        message: String,
        missing_fields: Vec<String>,
        invalid_fields: Vec<String>,
        correlation_id: String,
    },
    #[error("unauthorized: {message}")]
    Unauthorized { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

const UNASSIGNED: &str = "unassigned";

impl InterfaceError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            missing_fields: Vec::new(),
            invalid_fields: Vec::new(),
            correlation_id: UNASSIGNED.to_owned(),
        }
    }

    pub fn item_not_found(item_id: &str) -> Self {
        Self::NotFound {
            message: format!("Item '{item_id}' not found in the dataset"),
            correlation_id: UNASSIGNED.to_owned(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::Unauthorized { message, .. }
            | Self::NotFound { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Unauthorized { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        let correlation_id = correlation_id.into();
        match &mut self {
            Self::BadRequest { correlation_id: id, .. }
            | Self::Unauthorized { correlation_id: id, .. }
            | Self::NotFound { correlation_id: id, .. }
            | Self::ServiceUnavailable { correlation_id: id, .. }
            | Self::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        self
    }
}

impl From<AttributeError> for InterfaceError {
    fn from(value: AttributeError) -> Self {
        match value {
            AttributeError::NotAnObject => {
                Self::bad_request("Request body must be a JSON object")
            }
            AttributeError::MissingFields(fields) => Self::BadRequest {
                message: "Missing required fields".to_owned(),
                missing_fields: fields,
                invalid_fields: Vec::new(),
                correlation_id: UNASSIGNED.to_owned(),
            },
            AttributeError::InvalidFields(fields) => Self::BadRequest {
                message: "Invalid field values".to_owned(),
                missing_fields: Vec::new(),
                invalid_fields: fields,
                correlation_id: UNASSIGNED.to_owned(),
            },
        }
    }
}

impl From<RecommendError> for InterfaceError {
    fn from(value: RecommendError) -> Self {
        match value {
            RecommendError::ContentEngineUnavailable => Self::ServiceUnavailable {
                message: "Content-based recommender is not available".to_owned(),
                correlation_id: UNASSIGNED.to_owned(),
            },
            RecommendError::InvalidK { .. } => Self::bad_request(value.to_string()),
        }
    }
}
