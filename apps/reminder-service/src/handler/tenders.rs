//! # 入札案件イベント API ハンドラ
//!
//! 周辺アプリケーションから入札案件の新規作成を受け取り、照合を起動する。
//! 照合と配信の失敗はリクエストの応答には影響しない。

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tenderwatch_domain::{
    catalog::{CategoryId, RegionId, SubcategoryId},
    tender::{Tender, TenderId},
};
use tenderwatch_shared::event_log::error as log_error;

use super::ReminderState;
use crate::error::ServiceError;

/// 入札案件作成イベントのリクエスト
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenderCreatedRequest {
    pub id:               i64,
    pub title:            String,
    pub description:      Option<String>,
    pub category_id:      Option<i64>,
    pub subcategory_id:   Option<i64>,
    pub region_id:        Option<i64>,
    pub deadline:         Option<DateTime<Utc>>,
    pub reference_number: Option<String>,
}

impl From<TenderCreatedRequest> for Tender {
    fn from(req: TenderCreatedRequest) -> Self {
        Self {
            id:               TenderId::new(req.id),
            title:            req.title,
            description:      req.description,
            category_id:      req.category_id.map(CategoryId::new),
            subcategory_id:   req.subcategory_id.map(SubcategoryId::new),
            region_id:        req.region_id.map(RegionId::new),
            deadline:         req.deadline,
            reference_number: req.reference_number,
        }
    }
}

/// 入札案件の新規作成を受け付ける
///
/// ## エンドポイント
/// POST /internal/tenders/created
///
/// 照合タスクを起動した時点で `202 Accepted` を返す。
#[tracing::instrument(skip_all, fields(tender_id = req.id))]
pub async fn tender_created(
    State(state): State<Arc<ReminderState>>,
    Json(req): Json<TenderCreatedRequest>,
) -> Result<Response, ServiceError> {
    let tender = Tender::from(req);
    tender
        .validate()
        .map_err(|e| ServiceError::BadRequest(e.to_string()))?;

    let service = Arc::clone(&state.service);
    tokio::spawn(async move {
        let tender_id = tender.id;
        if let Err(e) = service.on_tender_created(tender).await {
            tracing::error!(
                error.category = log_error::category::INFRASTRUCTURE,
                error.kind = log_error::kind::DATABASE,
                %tender_id,
                error = %e,
                "入札案件作成トリガーの処理に失敗"
            );
        }
    });

    Ok(StatusCode::ACCEPTED.into_response())
}
