use thiserror::Error;

/// Why a decoded value does not have the shape its store promises.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    #[error("expected an object, found {0}")]
    NotAnObject(&'static str),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' should be {expected}, found {found}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

impl ProjectionError {
    /// Short category name used when counting skipped records.
    pub fn kind(&self) -> &'static str {
        match self {
            ProjectionError::NotAnObject(_) => "not_an_object",
            ProjectionError::MissingField(_) => "missing_field",
            ProjectionError::WrongType { .. } => "wrong_type",
        }
    }
}

pub type Result<T> = std::result::Result<T, ProjectionError>;
