//! Definitions for error types used throughout the engine core.

use crate::{
    DbError,
    utils::validation::{FieldError, ValidationErrors},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, Error)]
pub enum EngineError {
    /// caller could not be authenticated by the gateway
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// caller is authenticated but may not perform this operation
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// referenced entity does not exist within the caller's tenant
    #[error("{0} not found")]
    NotFound(String),

    /// input was syntactically valid but the current state disallows it
    #[error("conflict: {0}")]
    Conflict(String),

    /// validation error of one field of an operation input
    #[error("field validation error: {0}")]
    Field(#[from] FieldError),

    /// collected validation errors holding stringified field names
    #[error("validation error: {0:?}")]
    Validation(#[from] ValidationErrors),

    /// database error
    #[error("database error: {0}")]
    Db(#[from] DbError),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Stable error kind the gateway exposes to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Unauthorized(_) => "unauthorized",
            EngineError::Forbidden(_) => "forbidden",
            EngineError::NotFound(_) => "not_found",
            EngineError::Conflict(_) => "conflict",
            EngineError::Field(_) | EngineError::Validation(_) => "validation",
            EngineError::Db(_) => "internal",
        }
    }

    /// HTTP status the gateway maps this error to.
    pub fn http_status(&self) -> u16 {
        match self {
            EngineError::Unauthorized(_) => 401,
            EngineError::Forbidden(_) => 403,
            EngineError::NotFound(_) => 404,
            EngineError::Conflict(_) => 409,
            EngineError::Field(_) | EngineError::Validation(_) => 400,
            EngineError::Db(_) => 500,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Conflict(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Field(_) | EngineError::Validation(_))
    }

    pub fn get_field_error(&self) -> Option<&FieldError> {
        if let EngineError::Field(field_error) = self {
            Some(field_error)
        } else {
            None
        }
    }
}
