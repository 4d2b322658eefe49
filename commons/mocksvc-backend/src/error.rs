use axum::response::IntoResponse;
use http::StatusCode;

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("No resource '{key}' in region '{region}'")]
    NotFound { region: String, key: String },
    #[error("Invalid region name '{0}'")]
    InvalidRegion(String),
}

impl IntoResponse for BackendError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            BackendError::NotFound { .. } => StatusCode::NOT_FOUND,
            BackendError::InvalidRegion(_) => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}
