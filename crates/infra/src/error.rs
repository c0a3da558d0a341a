//! # インフラ層エラー定義
//!
//! データストアとの通信で発生するエラーを表現する。
//!
//! ## 設計方針
//!
//! - **エラーの変換**: `sqlx::Error` をラップする
//! - **不正データの明示**: 行は取得できたがドメイン型に変換できない場合を
//!   [`InfraErrorKind::InvalidData`] として区別する
//! - **SpanTrace 自動捕捉**: `From` 実装や convenience constructor で
//!   エラー生成時の呼び出し経路を自動記録する
//!
//! ## 構造
//!
//! `std::io::Error` と同じ struct + enum パターンを採用:
//! - [`InfraError`]: エラー種別（[`InfraErrorKind`]）と [`SpanTrace`] を保持するラッパー
//! - [`InfraErrorKind`]: エラーの具体的な種別

use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層で発生するエラー
///
/// 照合処理はこのエラーを受け取った時点でトリガー 1 回分の実行全体を中止する。
#[derive(Debug, Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

/// インフラ層エラーの種別
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// 接続失敗、プールのタイムアウト、クエリの実行失敗など
    #[error("データベースエラー: {0}")]
    Database(#[source] sqlx::Error),

    /// 行は取得できたがドメイン型に変換できない（未知の通知種別など）
    #[error("不正なデータ: {entity}(id={id}): {reason}")]
    InvalidData {
        entity: &'static str,
        id:     String,
        reason: String,
    },
}

impl InfraError {
    /// 生成時点の呼び出し経路を記録する
    fn new(kind: InfraErrorKind) -> Self {
        Self {
            kind,
            span_trace: SpanTrace::capture(),
        }
    }

    pub fn invalid_data(entity: &'static str, id: impl ToString, reason: impl Into<String>) -> Self {
        Self::new(InfraErrorKind::InvalidData {
            entity,
            id: id.to_string(),
            reason: reason.into(),
        })
    }

    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// データストアに到達できなかったか
    ///
    /// 接続・プール・TLS の失敗は真、クエリや変換の失敗は偽。
    pub fn is_unavailable(&self) -> bool {
        matches!(
            &self.kind,
            InfraErrorKind::Database(
                sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
            )
        )
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

impl From<sqlx::Error> for InfraError {
    fn from(source: sqlx::Error) -> Self {
        Self::new(InfraErrorKind::Database(source))
    }
}
