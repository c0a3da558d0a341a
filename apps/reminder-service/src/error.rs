//! # Reminder Service エラー定義
//!
//! Reminder Service 固有のエラーと、HTTP レスポンスへの変換を定義する。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// エラーレスポンス（RFC 7807 Problem Details）
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub title:      String,
    pub status:     u16,
    pub detail:     String,
}

/// Reminder Service で発生するエラー
#[derive(Debug, Error)]
pub enum ServiceError {
    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// 競合（スイープが実行中）
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// データベースエラー
    #[error("データベースエラー: {0}")]
    Database(#[from] tenderwatch_infra::InfraError),
}

/// エラー種別 URI の接頭辞
const ERROR_TYPE_BASE: &str = "https://tenderwatch.example.com/errors";

impl ServiceError {
    fn status(&self) -> StatusCode {
        match self {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (slug, detail) = match self {
            ServiceError::BadRequest(msg) => ("bad-request", msg),
            ServiceError::Conflict(msg) => ("conflict", msg),
            ServiceError::Database(e) => {
                tracing::error!(span_trace = %e.span_trace(), "データベースエラー: {}", e);
                ("internal-error", "内部エラーが発生しました".to_string())
            }
        };

        let body = ErrorResponse {
            error_type: format!("{ERROR_TYPE_BASE}/{slug}"),
            title: status.canonical_reason().unwrap_or_default().to_string(),
            status: status.as_u16(),
            detail,
        };

        (status, Json(body)).into_response()
    }
}
