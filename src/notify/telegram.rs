use log::{debug, warn};
use reqwest::{Client, StatusCode};

use super::{NotificationSink, OutflowAlert};

/// Sends outflow alerts to a Telegram chat through the bot API.
///
/// Delivery is fire-and-forget: `dispatch` spawns the send and returns
/// immediately, so the monitor loop never waits on Telegram availability.
pub struct TelegramNotifier {
    client: Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            client: Client::new(),
            bot_token,
            chat_id,
        }
    }

    fn format_message(alert: &OutflowAlert) -> String {
        let receiver = if alert.receiver.is_empty() {
            "unknown"
        } else {
            alert.receiver.as_str()
        };
        format!(
            "\u{1F6A8} {} outflow\nAmount: {} SOL\nReceiver: {}\nSlot: {}\n{}",
            alert.label,
            alert.amount_sol,
            receiver,
            alert.slot,
            alert.explorer_link()
        )
    }

    async fn send(client: Client, bot_token: String, chat_id: String, text: String) {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", bot_token);

        let result = client
            .get(&url)
            .query(&[
                ("chat_id", chat_id.as_str()),
                ("text", text.as_str()),
                ("disable_web_page_preview", "true"),
            ])
            .send()
            .await;

        match result {
            Ok(response) if response.status() == StatusCode::OK => {
                debug!("sent telegram alert");
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!("telegram alert rejected, status {}: {}", status, body);
            }
            Err(e) => {
                warn!("failed to send telegram alert: {}", e);
            }
        }
    }
}

impl NotificationSink for TelegramNotifier {
    fn dispatch(&self, alert: OutflowAlert) {
        let text = Self::format_message(&alert);
        let client = self.client.clone();
        let bot_token = self.bot_token.clone();
        let chat_id = self.chat_id.clone();
        tokio::spawn(Self::send(client, bot_token, chat_id, text));
    }
}
