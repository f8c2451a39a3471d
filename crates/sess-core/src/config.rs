//! Configuration management
//!
//! 設定は以下の優先順位で読み込まれます:
//! 1. 環境変数
//! 2. sess-store.toml 設定ファイル
//! 3. デフォルト値
//!
//! 設定ファイル内では `${VAR_NAME}` 形式で環境変数を展開できます。

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Error;
use crate::session::expiry::DEFAULT_MAX_AGE_SECS;
use crate::session::cleanup::DEFAULT_CLEANUP_INTERVAL_SECS;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "sess-store.toml";

/// Main configuration for the session store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Expired-row cleanup configuration
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Session table name
    #[serde(default = "default_table_name")]
    pub table_name: String,

    /// Max-age applied when a session carries no `cookie.maxAge` (seconds)
    #[serde(default = "default_max_age_secs")]
    pub default_max_age_secs: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            table_name: default_table_name(),
            default_max_age_secs: default_max_age_secs(),
        }
    }
}

/// 期限切れ行の定期削除設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// 定期削除が有効かどうか
    #[serde(default)]
    pub enabled: bool,

    /// 実行間隔（秒）
    #[serde(default = "default_cleanup_interval_secs")]
    pub interval_secs: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_cleanup_interval_secs(),
        }
    }
}

fn default_db_path() -> String {
    "data/sessions.db".to_string()
}

fn default_table_name() -> String {
    "sessions".to_string()
}

fn default_max_age_secs() -> i64 {
    DEFAULT_MAX_AGE_SECS
}

fn default_cleanup_interval_secs() -> u64 {
    DEFAULT_CLEANUP_INTERVAL_SECS
}

impl Config {
    /// 設定ファイルから環境変数を展開する
    ///
    /// `${VAR_NAME}` 形式の文字列を環境変数の値に置換します。
    /// 環境変数が存在しない場合は空文字列になります。
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // '{' を消費

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// TOML 設定ファイルから設定を読み込む
    ///
    /// # 引数
    /// * `path` - TOML ファイルのパス
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)?;
        let mut cfg = Self::from_toml_str(&toml_content)?;

        // 既存の環境変数で上書き（環境変数が優先）
        cfg.apply_env_overrides();

        Ok(cfg)
    }

    /// TOML 文字列から設定を構築する（環境変数による上書きは行わない）
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded_content = Self::expand_env_vars(content);

        let toml: TomlConfig = toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        Ok(Self::from_toml_config(toml))
    }

    /// デフォルトパスから設定を読み込む
    ///
    /// `./sess-store.toml` があればそれを使い、なければ環境変数のみを使います。
    pub fn load() -> crate::Result<Self> {
        if Path::new(CONFIG_FILE_NAME).exists() {
            return Self::from_toml_file(CONFIG_FILE_NAME);
        }

        Ok(Self::from_env())
    }

    /// Load configuration from environment variables over the defaults
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }

    /// TOML 構造から Config を構築
    fn from_toml_config(toml: TomlConfig) -> Self {
        let store = toml.store.unwrap_or_default();
        let cleanup = toml.cleanup.unwrap_or_default();

        Config {
            store: StoreConfig {
                db_path: store.db_path.unwrap_or_else(default_db_path),
                table_name: store.table_name.unwrap_or_else(default_table_name),
                default_max_age_secs: store
                    .default_max_age_secs
                    .unwrap_or_else(default_max_age_secs),
            },
            cleanup: CleanupConfig {
                enabled: cleanup.enabled.unwrap_or(false),
                interval_secs: cleanup
                    .interval_secs
                    .unwrap_or_else(default_cleanup_interval_secs),
            },
        }
    }

    /// 環境変数で設定を上書きする
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("SESSION_DB_PATH") {
            if !path.is_empty() {
                self.store.db_path = path;
            }
        }
        if let Ok(table) = std::env::var("SESSION_TABLE") {
            if !table.is_empty() {
                self.store.table_name = table;
            }
        }
        if let Ok(age) = std::env::var("SESSION_DEFAULT_MAX_AGE") {
            if let Ok(secs) = age.parse() {
                self.store.default_max_age_secs = secs;
            }
        }

        if let Ok(enabled) = std::env::var("SESSION_CLEANUP_ENABLED") {
            self.cleanup.enabled = enabled.to_lowercase() == "true";
        }
        if let Ok(interval) = std::env::var("SESSION_CLEANUP_INTERVAL") {
            if let Ok(secs) = interval.parse() {
                self.cleanup.interval_secs = secs;
            }
        }
    }
}

// ============================================================================
// TOML 構造体定義（ファイル解析用）
// ============================================================================

/// TOML ファイル用のトップレベル構造
#[derive(Debug, Deserialize, Default)]
struct TomlConfig {
    store: Option<TomlStoreConfig>,
    cleanup: Option<TomlCleanupConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlStoreConfig {
    db_path: Option<String>,
    table_name: Option<String>,
    default_max_age_secs: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlCleanupConfig {
    enabled: Option<bool>,
    interval_secs: Option<u64>,
}
