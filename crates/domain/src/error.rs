//! # ドメイン層エラー定義
//!
//! ドメインモデルの構築や照合で発生するエラー型。
//!
//! ## エラーの種類と HTTP ステータスの対応
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `Validation` | 400 Bad Request | 入力値の検証失敗 |
//! | `NotFound` | 404 Not Found | エンティティが存在しない |
//!
//! ## 使用例
//!
//! ```rust
//! use tenderwatch_domain::DomainError;
//!
//! fn validate_title(title: &str) -> Result<(), DomainError> {
//!     if title.trim().is_empty() {
//!         return Err(DomainError::Validation("件名は必須です".to_string()));
//!     }
//!     Ok(())
//! }
//!
//! assert!(validate_title("").is_err());
//! ```

use thiserror::Error;

/// ドメイン層で発生するエラー
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// 入力値やデータストアから読み込んだ値がドメインの制約に違反している場合に使用する。
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// エンティティが見つからない
    ///
    /// `entity_type` にはエンティティの種類（"Tender", "Category" など）を指定する。
    #[error("{entity_type} が見つかりません: {id}")]
    NotFound {
        /// エンティティの種類
        entity_type: &'static str,
        /// 検索に使用した識別子
        id:          String,
    },
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_validationのメッセージ() {
        let err = DomainError::Validation("件名は必須です".to_string());
        assert_eq!(err.to_string(), "バリデーションエラー: 件名は必須です");
    }

    #[test]
    fn test_not_foundのメッセージにエンティティ種別とidを含む() {
        let err = DomainError::NotFound {
            entity_type: "Tender",
            id:          "42".to_string(),
        };
        assert_eq!(err.to_string(), "Tender が見つかりません: 42");
    }
}
