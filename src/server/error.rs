use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::warn;
use serde_json::json;

use crate::error::Error;

/// API错误类型
///
/// 库内部的 [`Error`] 会按错误类别映射到对应的状态码，其他错误一律视为 500。
pub struct AppError(pub anyhow::Error);

pub type Result<T, E = AppError> = std::result::Result<T, E>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        self.0
            .downcast_ref::<Error>()
            .and_then(|e| StatusCode::from_u16(e.status()).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!("请求失败 ({}): {}", status.as_u16(), self.0);
        (status, Json(json!({ "ok": false, "error": self.0.to_string() }))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// 构造一个 400 错误
pub fn bad_request(msg: impl Into<String>) -> AppError {
    Error::validation(msg).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status() {
        assert_eq!(AppError::from(Error::NotFound("x".into())).status(), StatusCode::NOT_FOUND);
        assert_eq!(bad_request("id not provided").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::from(Error::IdExhausted).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AppError(anyhow::anyhow!("boom")).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
