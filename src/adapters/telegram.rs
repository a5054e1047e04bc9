use crate::domain::model::NotificationPayload;
use crate::domain::ports::DealNotifier;
use crate::utils::error::{DealError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// `1234.56` -> `"R$ 1.234,56"`.
pub fn format_brl(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (int_part, dec_part) = formatted.split_once('.').unwrap_or((&formatted, "00"));

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let int_grouped: String = grouped.chars().rev().collect();

    let sign = if value < 0.0 { "-" } else { "" };
    format!("R$ {}{},{}", sign, int_grouped, dec_part)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Channel notifier over the Telegram Bot API. The core hands over numeric
/// facts; all rendering lives here.
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self::with_api_base("https://api.telegram.org", token, chat_id)
    }

    /// Custom API base for tests.
    pub fn with_api_base(
        api_base: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_base.trim_end_matches('/'),
            self.token,
            method
        )
    }

    fn render_message(payload: &NotificationPayload) -> String {
        format!(
            "🔥 <b>{name}</b>\n\n\
             💰 De: <s>{reference}</s>\n\
             ✅ Por: <b>{current}</b> (impostos inclusos)\n\
             📉 Desconto: <b>{discount:.1}%</b>\n\n\
             🔗 <a href=\"{link}\">Ver oferta</a>",
            name = escape_html(&payload.product_name),
            reference = format_brl(payload.reference_price),
            current = format_brl(payload.landed_price),
            discount = payload.discount_percent,
            link = payload.link,
        )
    }

    async fn call(&self, method: &str, body: serde_json::Value, context: &str) -> Result<()> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| DealError::UpstreamDispatch {
                product_id: context.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let api: ApiResponse =
            response
                .json()
                .await
                .map_err(|e| DealError::UpstreamDispatch {
                    product_id: context.to_string(),
                    message: format!("malformed API response: {}", e),
                })?;

        if !status.is_success() || !api.ok {
            return Err(DealError::UpstreamDispatch {
                product_id: context.to_string(),
                message: api
                    .description
                    .unwrap_or_else(|| format!("status {}", status)),
            });
        }
        Ok(())
    }

    /// Probe used by the CLI's connectivity check.
    pub async fn test_connection(&self) -> bool {
        match self.client.get(self.method_url("getMe")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!("Telegram connection check failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl DealNotifier for TelegramNotifier {
    async fn send_deal(&self, payload: &NotificationPayload) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": Self::render_message(payload),
            "parse_mode": "HTML",
            "disable_web_page_preview": false,
        });
        self.call("sendMessage", body, &payload.link).await?;
        tracing::info!(
            "Announced {} ({:.1}% off)",
            payload.product_name,
            payload.discount_percent
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn payload() -> NotificationPayload {
        NotificationPayload {
            product_name: "Moondrop Chu II".into(),
            reference_price: 300.0,
            landed_price: 216.0,
            discount_percent: 28.0,
            link: "https://www.aliexpress.com/item/1005001234567890.html".into(),
        }
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(1234.56), "R$ 1.234,56");
        assert_eq!(format_brl(59.9), "R$ 59,90");
        assert_eq!(format_brl(0.0), "R$ 0,00");
        assert_eq!(format_brl(1_000_000.0), "R$ 1.000.000,00");
    }

    #[test]
    fn test_render_message_escapes_html() {
        let mut p = payload();
        p.product_name = "KZ <ZSN> Pro & Co".into();
        let text = TelegramNotifier::render_message(&p);
        assert!(text.contains("KZ &lt;ZSN&gt; Pro &amp; Co"));
        assert!(text.contains("R$ 216,00"));
        assert!(text.contains("28.0%"));
    }

    #[tokio::test]
    async fn test_send_deal_success() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/bottest-token/sendMessage")
                .json_body_partial(r#"{"chat_id": "@deals", "parse_mode": "HTML"}"#);
            then.status(200).json_body(serde_json::json!({"ok": true}));
        });

        let notifier = TelegramNotifier::with_api_base(server.base_url(), "test-token", "@deals");
        notifier.send_deal(&payload()).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_send_deal_api_rejection() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bottest-token/sendMessage");
            then.status(400)
                .json_body(serde_json::json!({"ok": false, "description": "Bad Request: chat not found"}));
        });

        let notifier = TelegramNotifier::with_api_base(server.base_url(), "test-token", "@nope");
        let result = notifier.send_deal(&payload()).await;
        assert!(matches!(result, Err(DealError::UpstreamDispatch { .. })));
    }

    #[tokio::test]
    async fn test_connection_probe() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bottest-token/getMe");
            then.status(200).json_body(serde_json::json!({"ok": true}));
        });

        let notifier = TelegramNotifier::with_api_base(server.base_url(), "test-token", "@deals");
        assert!(notifier.test_connection().await);
    }
}
