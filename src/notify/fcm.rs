use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::models::enums::DeliveryStatus;

use super::adapter::SendOutcome;

/// Real push delivery through the FCM HTTP API (server key auth).
pub struct FcmPush {
    server_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl FcmPush {
    pub fn new(server_key: &str, timeout: Duration) -> Option<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build().ok()?;
        Some(Self {
            server_key: server_key.to_string(),
            base_url: "https://fcm.googleapis.com".to_string(),
            client,
        })
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub async fn send(
        &self,
        device_token: &str,
        title: &str,
        body: &str,
        data: &serde_json::Value,
    ) -> SendOutcome {
        let url = format!("{}/fcm/send", self.base_url);
        let payload = json!({
            "to": device_token,
            "notification": { "title": title, "body": body },
            "data": data,
            "android": { "priority": "high" },
            "apns": {
                "payload": {
                    "aps": { "sound": "default", "badge": 1, "content-available": 1 }
                }
            }
        });

        let response = match self
            .client
            .post(&url)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&payload)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return SendOutcome::failed("fcm", &e.to_string()),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return SendOutcome::failed("fcm", &format!("status {status}: {body}"));
        }

        #[derive(Deserialize)]
        struct FcmResponse {
            #[serde(default)]
            success: i64,
            #[serde(default)]
            results: Vec<FcmResult>,
        }

        #[derive(Deserialize)]
        struct FcmResult {
            #[serde(default)]
            message_id: Option<String>,
            #[serde(default)]
            error: Option<String>,
        }

        match response.json::<FcmResponse>().await {
            Ok(parsed) => {
                let result = parsed.results.into_iter().next();
                match result {
                    Some(r) if parsed.success > 0 => SendOutcome {
                        status: DeliveryStatus::Sent,
                        message_id: r
                            .message_id
                            .unwrap_or_else(|| format!("fcm_{}", uuid::Uuid::new_v4().simple())),
                        provider: "fcm".to_string(),
                    },
                    Some(r) => SendOutcome::failed(
                        "fcm",
                        r.error.as_deref().unwrap_or("delivery rejected"),
                    ),
                    None => SendOutcome::failed("fcm", "empty results"),
                }
            }
            Err(e) => SendOutcome::failed("fcm", &format!("unparseable response: {e}")),
        }
    }
}
