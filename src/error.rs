use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("movie already exists")]
    MovieAlreadyExists,
    #[error("email already registered")]
    EmailAlreadyRegistered,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("invalid file content: {0}")]
    InvalidFileContent(String),
    #[error("movie record is missing required fields: {0}")]
    MissingRequiredFields(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("wrong email or password")]
    InvalidCredentials,
    #[error("authentication required")]
    Unauthorized,
    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::MovieAlreadyExists | AppError::EmailAlreadyRegistered => {
                StatusCode::CONFLICT
            },
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidFileContent(_)
            | AppError::MissingRequiredFields(_)
            | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Db(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::MovieAlreadyExists => "MOVIE_ALREADY_EXISTS",
            AppError::EmailAlreadyRegistered => "EMAIL_ALREADY_REGISTERED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidFileContent(_) => "INVALID_FILE_CONTENT",
            AppError::MissingRequiredFields(_) => "MISSING_REQUIRED_FIELDS",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::InvalidCredentials | AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Db(_) | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
