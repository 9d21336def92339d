//! Telegram Bot API alerts (`sendMessage`, HTML parse mode).

use std::time::Duration;
use tracing::info;

use crate::domain::error::SigtraderError;
use crate::ports::alert_port::AlertPort;

const API_BASE: &str = "https://api.telegram.org";

pub struct TelegramAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
    chat_id: String,
}

fn sink_error(reason: impl ToString) -> SigtraderError {
    SigtraderError::Sink {
        sink: "telegram",
        reason: reason.to_string(),
    }
}

impl TelegramAdapter {
    pub fn new(bot_token: &str, chat_id: &str) -> Result<Self, SigtraderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(sink_error)?;

        Ok(Self {
            client,
            base_url: format!("{API_BASE}/bot{bot_token}"),
            chat_id: chat_id.to_string(),
        })
    }

    /// Calls `getMe` and returns the bot's username.
    pub fn test_connection(&self) -> Result<String, SigtraderError> {
        #[derive(serde::Deserialize)]
        struct Bot {
            username: String,
        }
        #[derive(serde::Deserialize)]
        struct GetMe {
            result: Bot,
        }

        let response = self
            .client
            .get(format!("{}/getMe", self.base_url))
            .send()
            .map_err(sink_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(sink_error(format!("HTTP {status} from getMe")));
        }
        let me: GetMe = response.json().map_err(sink_error)?;
        Ok(me.result.username)
    }
}

impl AlertPort for TelegramAdapter {
    fn send(&self, message: &str) -> Result<(), SigtraderError> {
        let params = [
            ("chat_id", self.chat_id.as_str()),
            ("text", message),
            ("parse_mode", "HTML"),
        ];
        let response = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .form(&params)
            .send()
            .map_err(sink_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(sink_error(format!("HTTP {status}: {body}")));
        }
        info!("alert sent via telegram");
        Ok(())
    }
}
