use crate::{config::EmailConfig, errors::ServiceError};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Transactional email client.
///
/// Delivery is best-effort by contract: settlement spawns sends as detached
/// tasks and only ever logs failures. When no API key is configured the
/// client becomes a no-op, which keeps development and test environments
/// offline.
#[derive(Clone)]
pub struct EmailClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    from: String,
    /// Operational address copied on every order confirmation
    pub order_notify_address: String,
}

impl EmailClient {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .expect("reqwest client construction cannot fail with static options"),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
            order_notify_address: config.order_notify_address.clone(),
        }
    }

    /// Sends a single HTML email through the provider API.
    #[instrument(skip(self, html), fields(to = %to, subject = %subject))]
    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), ServiceError> {
        let Some(api_key) = &self.api_key else {
            debug!("Email delivery disabled; dropping message");
            return Ok(());
        };

        let url = format!("{}/v3/mail/send", self.base_url);
        let body = json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.from },
            "subject": subject,
            "content": [{ "type": "text/html", "value": html }],
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("email send failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "email provider returned {}",
                status
            )));
        }

        info!("Email accepted by provider");
        Ok(())
    }
}

/// Confirmation content rendered for a settled order.
pub struct OrderConfirmation {
    pub buyer_name: String,
    pub buyer_email: String,
    pub order_id: String,
    pub total_amount: String,
    pub item_lines: Vec<String>,
}

impl OrderConfirmation {
    pub fn subject(&self) -> String {
        format!("Order confirmed: {}", self.order_id)
    }

    pub fn buyer_html(&self) -> String {
        format!(
            "<h2>Thanks for your order, {}!</h2>\
             <p>Order <strong>{}</strong> is confirmed and paid.</p>\
             <ul>{}</ul>\
             <p>Total: {}</p>",
            self.buyer_name,
            self.order_id,
            self.item_lines
                .iter()
                .map(|line| format!("<li>{}</li>", line))
                .collect::<String>(),
            self.total_amount,
        )
    }

    pub fn operations_html(&self) -> String {
        format!(
            "<h2>New paid order {}</h2>\
             <p>Buyer: {} &lt;{}&gt;</p>\
             <ul>{}</ul>\
             <p>Total: {}</p>",
            self.order_id,
            self.buyer_name,
            self.buyer_email,
            self.item_lines
                .iter()
                .map(|line| format!("<li>{}</li>", line))
                .collect::<String>(),
            self.total_amount,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmailConfig;

    fn confirmation() -> OrderConfirmation {
        OrderConfirmation {
            buyer_name: "Asha".to_string(),
            buyer_email: "asha@example.com".to_string(),
            order_id: "order_abc".to_string(),
            total_amount: "1000 INR".to_string(),
            item_lines: vec!["Brass Diya x2".to_string(), "Clay Pot x1".to_string()],
        }
    }

    #[test]
    fn buyer_html_names_order_and_items() {
        let html = confirmation().buyer_html();
        assert!(html.contains("order_abc"));
        assert!(html.contains("Brass Diya x2"));
        assert!(html.contains("1000 INR"));
    }

    #[test]
    fn operations_html_includes_buyer_contact() {
        let html = confirmation().operations_html();
        assert!(html.contains("asha@example.com"));
        assert!(html.contains("Clay Pot x1"));
    }

    #[tokio::test]
    async fn send_is_noop_without_api_key() {
        let client = EmailClient::new(&EmailConfig::default());
        client
            .send("someone@example.com", "hi", "<p>hello</p>")
            .await
            .expect("disabled client must succeed without network access");
    }
}
