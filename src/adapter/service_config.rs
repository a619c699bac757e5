use crate::adapter::database_config::{parse_var, string_var, ConfigError};
use std::env;
use std::time::Duration;

/// 座席在庫の配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryMode {
    /// 予約と同じデータベースで座席在庫を管理する
    Local,
    /// 別サービスの座席在庫にHTTPで接続する
    Remote { base_url: String },
}

/// サービス全体の設定
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub server_port: u16,
    /// 出発何時間前までキャンセルを受け付けるか
    pub cancellation_window_hours: i64,
    pub inventory_mode: InventoryMode,
    pub inventory_timeout: Duration,
}

impl ServiceConfig {
    /// 環境変数から設定を読み取る
    ///
    /// - `SERVER_PORT`（既定 3000）
    /// - `CANCELLATION_WINDOW_HOURS`（既定 24、0以上）
    /// - `INVENTORY_MODE`: `local` | `remote`（既定 local）
    /// - `INVENTORY_SERVICE_URL`: remote の場合は必須
    /// - `INVENTORY_TIMEOUT_MS`（既定 5000）
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_port = parse_var("SERVER_PORT", 3000u16)?;

        let cancellation_window_hours = parse_var("CANCELLATION_WINDOW_HOURS", 24i64)?;
        if cancellation_window_hours < 0 {
            return Err(ConfigError::InvalidValue(format!(
                "CANCELLATION_WINDOW_HOURS must not be negative: {}",
                cancellation_window_hours
            )));
        }

        let mode = string_var("INVENTORY_MODE", "local");
        let inventory_mode = match mode.trim().to_ascii_lowercase().as_str() {
            "local" => InventoryMode::Local,
            "remote" => {
                let base_url = env::var("INVENTORY_SERVICE_URL")
                    .ok()
                    .filter(|url| !url.trim().is_empty())
                    .ok_or_else(|| ConfigError::Missing("INVENTORY_SERVICE_URL".to_string()))?;
                InventoryMode::Remote { base_url }
            }
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid INVENTORY_MODE: {}",
                    other
                )))
            }
        };

        let timeout_ms = parse_var("INVENTORY_TIMEOUT_MS", 5000u64)?;

        Ok(Self {
            server_port,
            cancellation_window_hours,
            inventory_mode,
            inventory_timeout: Duration::from_millis(timeout_ms),
        })
    }
}
