//! # Observability 基盤
//!
//! `tracing` の購読者を組み立てる。
//!
//! - `RUST_LOG` でフィルタ（未設定なら [`DEFAULT_FILTER`]）
//! - `LOG_FORMAT=json|pretty` で出力形式を切り替え
//! - `tracing_error::ErrorLayer` を登録し、`InfraError` の `SpanTrace` を有効にする
//!
//! JSON 形式ではイベントのフィールドをトップレベルに展開するため、
//! `jq 'select(.["event.kind"] == "business_event")'` のように直接絞り込める。

/// `RUST_LOG` 未設定時のフィルタ
pub const DEFAULT_FILTER: &str = "info,tenderwatch=debug";

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    /// 1 行 1 JSON（本番環境向け）
    Json,
    /// 人間向けの整形出力（開発環境向け）
    #[default]
    Pretty,
}

impl LogFormat {
    /// `LOG_FORMAT` を読み取る
    ///
    /// 未設定なら `Pretty`。解釈できない値も `Pretty` に倒し、購読者の初期化前なので
    /// 警告は stderr に出す。
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT") {
            Ok(value) => value.trim().parse().unwrap_or_else(|_| {
                eprintln!("WARNING: LOG_FORMAT={value:?} は解釈できないため pretty で出力します");
                Self::Pretty
            }),
            Err(_) => Self::default(),
        }
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    /// 起動ログに出すサービス名
    pub service_name: &'static str,
    pub log_format:   LogFormat,
}

impl TracingConfig {
    pub fn new(service_name: &'static str, log_format: LogFormat) -> Self {
        Self {
            service_name,
            log_format,
        }
    }

    /// `LOG_FORMAT` から出力形式を決める
    pub fn from_env(service_name: &'static str) -> Self {
        Self::new(service_name, LogFormat::from_env())
    }
}

/// グローバルな購読者を登録する
///
/// プロセス起動時に一度だけ呼ぶ。
#[cfg(feature = "observability")]
pub fn init_tracing(config: TracingConfig) {
    use tracing_subscriber::{Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(tracing_error::ErrorLayer::default())
        .init();

    tracing::info!(
        service = config.service_name,
        log_format = %config.log_format,
        "トレーシングを初期化しました"
    );
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("json", LogFormat::Json)]
    #[case("JSON", LogFormat::Json)]
    #[case("pretty", LogFormat::Pretty)]
    #[case("Pretty", LogFormat::Pretty)]
    fn test_log_formatは大文字小文字を区別せず解釈する(
        #[case] input: &str,
        #[case] expected: LogFormat,
    ) {
        assert_eq!(input.parse::<LogFormat>().unwrap(), expected);
    }

    #[rstest]
    #[case("yaml")]
    #[case("")]
    fn test_未知の形式は解釈できない(#[case] input: &str) {
        assert!(input.parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_既定の形式はpretty() {
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
        assert_eq!(LogFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_default_filterはクレート名前空間をdebugにする() {
        assert!(DEFAULT_FILTER.contains("tenderwatch=debug"));
    }
}
