//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! - 各ハンドラはサブモジュールに配置し、ここで re-export する
//! - トリガー系のハンドラは受け付けだけを行い、処理はバックグラウンドタスクに委ねる

pub mod health;
pub mod sweeps;
pub mod tenders;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
pub use health::health_check;
pub use sweeps::request_sweep;
pub use tenders::{TenderCreatedRequest, tender_created};
use tower_http::trace::TraceLayer;

use crate::usecase::NotificationService;

/// トリガー系ハンドラの State
pub struct ReminderState {
    pub service: Arc<NotificationService>,
}

/// Reminder Service のルーターを構築する
pub fn router(state: Arc<ReminderState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/internal/tenders/created", post(tender_created))
        .route("/internal/sweeps", post(request_sweep))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
