use std::time::Duration;

use serde::Deserialize;

use crate::models::enums::DeliveryStatus;

use super::adapter::SendOutcome;

/// Real SMS delivery through the Twilio REST API.
///
/// Constructed only when account credentials are configured and sending is
/// explicitly enabled; otherwise the simulation adapter stands in.
pub struct TwilioSms {
    account_sid: String,
    auth_token: String,
    from_number: String,
    base_url: String,
    client: reqwest::Client,
}

impl TwilioSms {
    pub fn new(
        account_sid: &str,
        auth_token: &str,
        from_number: &str,
        timeout: Duration,
    ) -> Option<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build().ok()?;
        Some(Self {
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from_number: from_number.to_string(),
            base_url: "https://api.twilio.com".to_string(),
            client,
        })
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub async fn send(&self, phone: &str, message: &str) -> SendOutcome {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );
        let params = [
            ("To", phone),
            ("From", self.from_number.as_str()),
            ("Body", message),
        ];

        let response = match self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return SendOutcome::failed("twilio", &e.to_string()),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return SendOutcome::failed("twilio", &format!("status {status}: {body}"));
        }

        #[derive(Deserialize)]
        struct MessageResponse {
            sid: String,
        }

        match response.json::<MessageResponse>().await {
            Ok(parsed) => SendOutcome {
                status: DeliveryStatus::Sent,
                message_id: parsed.sid,
                provider: "twilio".to_string(),
            },
            Err(e) => SendOutcome::failed("twilio", &format!("unparseable response: {e}")),
        }
    }
}
