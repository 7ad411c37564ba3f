use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InternalServerErrorWithContext(String),
    #[error(transparent)]
    ValidationError(#[from] validator::ValidationErrors),
    #[error(transparent)]
    AxumJsonRejection(#[from] JsonRejection),
    #[error(transparent)]
    MongoError(#[from] mongodb::error::Error),
    #[error(transparent)]
    AnyhowError(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::ValidationError(_) | AppError::AxumJsonRejection(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InternalServerErrorWithContext(_) | AppError::MongoError(_) | AppError::AnyhowError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn messages(&self) -> Vec<String> {
        match self {
            AppError::ValidationError(errors) => errors
                .field_errors()
                .into_iter()
                .map(|(field, errs)| {
                    let detail = errs
                        .iter()
                        .map(|e| e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string()))
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("{}: {}", field, detail)
                })
                .collect(),
            // 内部错误不向调用方暴露细节
            AppError::MongoError(_) | AppError::AnyhowError(_) | AppError::InternalServerErrorWithContext(_) => {
                vec![String::from("Something went wrong on our side, please try again later.")]
            }
            other => vec![other.to_string()],
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("❌ {:?}", self);
        }

        let body = Json(json!({
            "errors": {
                "message": self.messages(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::AnyhowError(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let messages = AppError::InternalServerErrorWithContext("mongo is down".into()).messages();
        assert_eq!(messages.len(), 1);
        assert!(!messages[0].contains("mongo"));

        let messages = AppError::Conflict("Deposit 0xabc already exists.".into()).messages();
        assert_eq!(messages, vec!["Deposit 0xabc already exists.".to_string()]);
    }
}
