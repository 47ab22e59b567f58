use ab_core::AppError;
use reqwest::StatusCode;

/// Maps a non-success response onto the shared error type.
pub(crate) fn from_status(status: StatusCode, what: &str, body: String) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthenticated,
        StatusCode::CONFLICT => AppError::Conflict(format!("{what}: {body}")),
        StatusCode::NOT_FOUND => AppError::NotFound(what.to_string(), body),
        s if s.is_server_error() => AppError::unavailable(format!("{what} returned {s}: {body}")),
        s => AppError::Internal(format!("{what} returned {s}: {body}")),
    }
}

/// The token endpoint answers bad credentials with 400; every other status
/// keeps its usual meaning.
pub(crate) fn from_sign_in_status(status: StatusCode, body: String) -> AppError {
    match status {
        StatusCode::BAD_REQUEST => AppError::Unauthenticated,
        s => from_status(s, "sign-in", body),
    }
}

pub(crate) fn transport(what: &str, err: reqwest::Error) -> AppError {
    AppError::unavailable(format!("{what}: {err}"))
}

pub(crate) fn decode(what: &str, err: reqwest::Error) -> AppError {
    AppError::Internal(format!("unreadable {what} response: {err}"))
}
