//! # Reminder Service 設定
//!
//! 環境変数から Reminder Service の設定を読み込む。
//!
//! 読み込みは起動時に一度だけ行い、不正な値は [`ConfigError`] として報告する。
//! テストでは [`ReminderConfig::from_lookup`] に任意の参照関数を渡す。

use std::{env, str::FromStr, time::Duration};

use chrono::NaiveTime;
use chrono_tz::Tz;
use tenderwatch_infra::notification::{SmtpSettings, SmtpTlsMode};
use thiserror::Error;

use crate::usecase::{dispatcher::DispatchSettings, scheduler::SweepSettings};

/// 設定の読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    #[error("{key} の値が不正です（{value}）: {reason}")]
    Invalid {
        key:    &'static str,
        value:  String,
        reason: String,
    },

    #[error("SMTP_USERNAME と SMTP_PASSWORD は両方設定するか、両方未設定にしてください")]
    IncompleteCredentials,
}

/// Reminder Service の設定
#[derive(Debug, Clone)]
pub struct ReminderConfig {
    /// バインドアドレス
    pub host:         String,
    /// ポート番号
    pub port:         u16,
    /// データベース接続 URL
    pub database_url: String,
    /// 通知設定
    pub notification: NotificationBackend,
    /// ディスパッチャ設定
    pub dispatch:     DispatchSettings,
    /// 期日スイープ設定
    pub sweep:        SweepSettings,
}

/// 送信バックエンド
///
/// `NOTIFICATION_BACKEND` 環境変数で切り替える:
/// - `smtp`: SMTP サーバー経由で送信
/// - `noop`: 送信しない（ログ出力のみ）
#[derive(Debug, Clone)]
pub enum NotificationBackend {
    Noop,
    Smtp(SmtpSettings),
}

impl ReminderConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 参照関数から設定を読み込む
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&lookup);

        Ok(Self {
            host:         vars.or("REMINDER_HOST", "0.0.0.0"),
            port:         vars.parsed("REMINDER_PORT", 3100)?,
            database_url: vars.required("DATABASE_URL")?,
            notification: notification_backend(&vars)?,
            dispatch:     dispatch_settings(&vars)?,
            sweep:        sweep_settings(&vars)?,
        })
    }
}

fn notification_backend(vars: &Vars<'_>) -> Result<NotificationBackend, ConfigError> {
    let backend = vars.or("NOTIFICATION_BACKEND", "noop");
    match backend.as_str() {
        "noop" => Ok(NotificationBackend::Noop),
        "smtp" => {
            let credentials = match (vars.get("SMTP_USERNAME"), vars.get("SMTP_PASSWORD")) {
                (Some(username), Some(password)) => Some((username, password)),
                (None, None) => None,
                _ => return Err(ConfigError::IncompleteCredentials),
            };

            Ok(NotificationBackend::Smtp(SmtpSettings {
                host: vars.or("SMTP_HOST", "localhost"),
                port: vars.parsed("SMTP_PORT", 587)?,
                credentials,
                tls: vars.parsed("SMTP_TLS", SmtpTlsMode::Starttls)?,
                from_address: vars.or(
                    "NOTIFICATION_FROM_ADDRESS",
                    "noreply@tenderwatch.example.com",
                ),
            }))
        }
        _ => Err(ConfigError::Invalid {
            key:    "NOTIFICATION_BACKEND",
            value:  backend,
            reason: "smtp または noop を指定してください".to_string(),
        }),
    }
}

fn dispatch_settings(vars: &Vars<'_>) -> Result<DispatchSettings, ConfigError> {
    let defaults = DispatchSettings::default();

    Ok(DispatchSettings {
        max_concurrency: vars.positive("DISPATCH_MAX_CONCURRENCY", defaults.max_concurrency)?,
        min_interval:    Duration::from_millis(
            vars.parsed("DISPATCH_MIN_INTERVAL_MS", millis(defaults.min_interval))?,
        ),
        max_attempts:    vars.positive("DISPATCH_MAX_ATTEMPTS", defaults.max_attempts)?,
        retry_delay:     Duration::from_millis(
            vars.parsed("DISPATCH_RETRY_DELAY_MS", millis(defaults.retry_delay))?,
        ),
    })
}

fn sweep_settings(vars: &Vars<'_>) -> Result<SweepSettings, ConfigError> {
    let defaults = SweepSettings::default();

    let time_of_day = match vars.get("SWEEP_TIME") {
        Some(value) => NaiveTime::parse_from_str(&value, "%H:%M").map_err(|e| {
            ConfigError::Invalid {
                key: "SWEEP_TIME",
                value,
                reason: e.to_string(),
            }
        })?,
        None => defaults.time_of_day,
    };

    Ok(SweepSettings {
        time_of_day,
        timezone: vars.parsed::<Tz>("SWEEP_TIMEZONE", defaults.timezone)?,
        horizon_days: vars.parsed("SWEEP_HORIZON_DAYS", defaults.horizon_days)?,
    })
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// 参照関数のラッパー
struct Vars<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Vars<'_> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }

    fn parsed<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
            None => Ok(default),
        }
    }

    /// 1 以上の整数
    fn positive<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr + PartialOrd + From<u8> + std::fmt::Display,
        T::Err: std::fmt::Display,
    {
        let value = self.parsed(key, default)?;
        if value < T::from(1) {
            return Err(ConfigError::Invalid {
                key,
                value: value.to_string(),
                reason: "1 以上を指定してください".to_string(),
            });
        }
        Ok(value)
    }
}
