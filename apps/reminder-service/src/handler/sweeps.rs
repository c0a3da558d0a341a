//! # 期日スイープ API ハンドラ
//!
//! 日次トリガーを待たずに期日スイープを起動する。

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tenderwatch_shared::event_log::error as log_error;

use super::ReminderState;
use crate::error::ServiceError;

/// 期日スイープを即時に起動する
///
/// 実行許可はハンドラ内で取得するため、応答時点で起動の成否が確定している。
///
/// ## エンドポイント
/// POST /internal/sweeps
///
/// ## レスポンス
///
/// - `202 Accepted`: スイープを起動した
/// - `409 Conflict`: 別のスイープが実行中
#[tracing::instrument(skip_all)]
pub async fn request_sweep(
    State(state): State<Arc<ReminderState>>,
) -> Result<Response, ServiceError> {
    let Some(permit) = state.service.begin_sweep() else {
        return Err(ServiceError::Conflict(
            "期日スイープは既に実行中です".to_string(),
        ));
    };

    let service = Arc::clone(&state.service);
    tokio::spawn(async move {
        if let Err(e) = service.sweep(permit).await {
            tracing::error!(
                error.category = log_error::category::INFRASTRUCTURE,
                error.kind = log_error::kind::DATABASE,
                error = %e,
                "手動起動の期日スイープに失敗"
            );
        }
    });

    Ok(StatusCode::ACCEPTED.into_response())
}
