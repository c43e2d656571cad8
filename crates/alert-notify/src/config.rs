//! Configuration shared by the built-in handlers.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 3;

const ENV_TIMEOUT_SECS: &str = "NOTIFY_TIMEOUT_SECS";
const ENV_CONNECT_TIMEOUT_SECS: &str = "NOTIFY_CONNECT_TIMEOUT_SECS";
const ENV_TITLE: &str = "NOTIFY_TITLE";
const ENV_DINGTALK_WEBHOOK_URL: &str = "NOTIFY_DINGTALK_WEBHOOK_URL";
const ENV_WEWORK_WEBHOOK_URL: &str = "NOTIFY_WEWORK_WEBHOOK_URL";
const ENV_FEISHU_WEBHOOK_URL: &str = "NOTIFY_FEISHU_WEBHOOK_URL";
const ENV_TELEGRAM_API_URL: &str = "NOTIFY_TELEGRAM_API_URL";
const ENV_DISCORD_API_URL: &str = "NOTIFY_DISCORD_API_URL";

/// Notification settings handed to every handler at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    /// TCP/TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Title used by platforms whose payload has a title field.
    pub title: String,
    /// DingTalk robot URL prefix; the access token is appended.
    pub dingtalk_webhook_url: String,
    /// WeCom robot URL prefix; the robot key is appended.
    pub wework_webhook_url: String,
    /// Feishu robot URL prefix; the hook token is appended.
    pub feishu_webhook_url: String,
    /// Telegram Bot API root.
    pub telegram_api_url: String,
    /// Discord REST API root.
    pub discord_api_url: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            title: "Alert Notify".to_string(),
            dingtalk_webhook_url: "https://oapi.dingtalk.com/robot/send?access_token=".to_string(),
            wework_webhook_url: "https://qyapi.weixin.qq.com/cgi-bin/webhook/send?key=".to_string(),
            feishu_webhook_url: "https://open.feishu.cn/open-apis/bot/v2/hook/".to_string(),
            telegram_api_url: "https://api.telegram.org".to_string(),
            discord_api_url: "https://discord.com/api/v9".to_string(),
        }
    }
}

impl NotifyConfig {
    /// Defaults overlaid with `NOTIFY_*` environment variables.
    ///
    /// Unset, empty or unparseable variables keep their default. A timeout of
    /// zero counts as unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            timeout_secs: env_secs(ENV_TIMEOUT_SECS).unwrap_or(defaults.timeout_secs),
            connect_timeout_secs: env_secs(ENV_CONNECT_TIMEOUT_SECS)
                .unwrap_or(defaults.connect_timeout_secs),
            title: env_string(ENV_TITLE).unwrap_or(defaults.title),
            dingtalk_webhook_url: env_string(ENV_DINGTALK_WEBHOOK_URL)
                .unwrap_or(defaults.dingtalk_webhook_url),
            wework_webhook_url: env_string(ENV_WEWORK_WEBHOOK_URL)
                .unwrap_or(defaults.wework_webhook_url),
            feishu_webhook_url: env_string(ENV_FEISHU_WEBHOOK_URL)
                .unwrap_or(defaults.feishu_webhook_url),
            telegram_api_url: env_string(ENV_TELEGRAM_API_URL)
                .unwrap_or(defaults.telegram_api_url),
            discord_api_url: env_string(ENV_DISCORD_API_URL).unwrap_or(defaults.discord_api_url),
        }
    }

    /// Whole-request timeout; zero falls back to the default.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(nonzero_or(self.timeout_secs, DEFAULT_TIMEOUT_SECS))
    }

    /// Connect timeout; zero falls back to the default.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(nonzero_or(
            self.connect_timeout_secs,
            DEFAULT_CONNECT_TIMEOUT_SECS,
        ))
    }
}

const fn nonzero_or(secs: u64, default: u64) -> u64 {
    if secs == 0 {
        default
    } else {
        secs
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_secs(key: &str) -> Option<u64> {
    env_string(key)
        .and_then(|v| v.trim().parse().ok())
        .filter(|secs| *secs > 0)
}
