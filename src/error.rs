use thiserror::Error;

/// Structural errors raised when the API is misused.
///
/// Anything that is merely missing (an optional decoration, an attachment
/// that cannot be resolved, a query without a hit) is modelled as `None`
/// instead.
#[derive(Debug, Error)]
pub enum MindError {
    #[error("the parameter \"{name}\" is invalid")]
    InvalidParameter { name: String },

    #[error("\"{what}\" is an illegal instance of ({expected})")]
    IllegalInstance { what: String, expected: String },

    #[error("invalid mind-map data: {0}")]
    Json(#[from] serde_json::Error),
}

impl MindError {
    pub fn invalid_param(name: impl Into<String>) -> Self {
        Self::InvalidParameter { name: name.into() }
    }

    pub fn illegal_instance(what: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::IllegalInstance {
            what: what.into(),
            expected: expected.into(),
        }
    }
}

pub type MindResult<T> = Result<T, MindError>;
