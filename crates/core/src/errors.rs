use thiserror::Error;

/// Caller-input failures. These are the only errors surfaced to the
/// request path; everything else degrades to a smaller result set.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid context: {0}")]
    InvalidContext(String),
    #[error("block `{0}` does not exist or is inactive")]
    BlockNotFound(String),
    #[error("config `{0}` does not resolve to an active config")]
    ConfigNotFound(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Failures crossing the engine boundary. Collaborator outages carry the
/// degradation class so callers can log them distinctly.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),
    #[error("cache backend unavailable: {0}")]
    CacheUnavailable(String),
    #[error("analytics sink unavailable: {0}")]
    AnalyticsUnavailable(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "Recommendations are temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl EngineError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<EngineError> for InterfaceError {
    fn from(value: EngineError) -> Self {
        match value {
            EngineError::Domain(_) => Self::BadRequest {
                message: "request validation failed".to_owned(),
                correlation_id: "unassigned".to_owned(),
            },
            EngineError::CatalogUnavailable(message)
            | EngineError::CacheUnavailable(message)
            | EngineError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            EngineError::AnalyticsUnavailable(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
