use std::collections::VecDeque;
use std::sync::Mutex;

use crate::models::enums::DeliveryStatus;

use super::fcm::FcmPush;
use super::simulation;
use super::twilio::TwilioSms;

/// Result of one send attempt. Failure is data, not an error — a failed
/// send still produces a notification record and stays visible to retry.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub status: DeliveryStatus,
    pub message_id: String,
    pub provider: String,
}

impl SendOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, DeliveryStatus::Sent | DeliveryStatus::Delivered)
    }

    pub fn failed(provider: &str, reason: &str) -> Self {
        tracing::warn!(provider, reason, "Notification send failed");
        Self {
            status: DeliveryStatus::Failed,
            message_id: format!("failed_{}", uuid::Uuid::new_v4().simple()),
            provider: provider.to_string(),
        }
    }
}

/// Scripted sender for tests — replays queued outcomes in order.
pub struct ScriptedSender {
    outcomes: Mutex<VecDeque<SendOutcome>>,
}

impl ScriptedSender {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, outcome: SendOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn push_delivered(&self) {
        self.push(SendOutcome {
            status: DeliveryStatus::Delivered,
            message_id: format!("scripted_{}", uuid::Uuid::new_v4().simple()),
            provider: "simulation".into(),
        });
    }

    pub fn push_failed(&self) {
        self.push(SendOutcome::failed("simulation", "scripted failure"));
    }

    fn next(&self) -> SendOutcome {
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| SendOutcome::failed("simulation", "script exhausted"))
    }
}

impl Default for ScriptedSender {
    fn default() -> Self {
        Self::new()
    }
}

/// SMS backend, fixed at construction time. The simulation variant is for
/// local development only — when real credentials are configured and
/// enabled, the Twilio variant is constructed instead.
pub enum SmsSender {
    Twilio(TwilioSms),
    Simulation,
    Scripted(ScriptedSender),
}

impl SmsSender {
    pub async fn send(&self, phone: &str, message: &str) -> SendOutcome {
        match self {
            Self::Twilio(client) => client.send(phone, message).await,
            Self::Simulation => simulation::sms_outcome(phone, message),
            Self::Scripted(script) => script.next(),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::Twilio(_) => "twilio",
            Self::Simulation | Self::Scripted(_) => "simulation",
        }
    }
}

/// Push backend, fixed at construction time.
pub enum PushSender {
    Fcm(FcmPush),
    Simulation,
    Scripted(ScriptedSender),
}

impl PushSender {
    pub async fn send(
        &self,
        device_token: &str,
        title: &str,
        body: &str,
        data: &serde_json::Value,
    ) -> SendOutcome {
        match self {
            Self::Fcm(client) => client.send(device_token, title, body, data).await,
            Self::Simulation => simulation::push_outcome(device_token, title),
            Self::Scripted(script) => script.next(),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::Fcm(_) => "fcm",
            Self::Simulation | Self::Scripted(_) => "simulation",
        }
    }
}

/// Both channels, injected into dispatch and retry as one unit.
pub struct NotificationChannels {
    pub sms: SmsSender,
    pub push: PushSender,
}

impl NotificationChannels {
    /// Simulation on both channels (local development default).
    pub fn simulation() -> Self {
        Self {
            sms: SmsSender::Simulation,
            push: PushSender::Simulation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_sender_replays_in_order() {
        let script = ScriptedSender::new();
        script.push_delivered();
        script.push_failed();
        let sms = SmsSender::Scripted(script);

        let first = sms.send("+15550100", "hello").await;
        assert!(first.succeeded());
        let second = sms.send("+15550100", "hello").await;
        assert!(!second.succeeded());
        assert_eq!(second.status, DeliveryStatus::Failed);
    }

    #[tokio::test]
    async fn exhausted_script_fails_closed() {
        let sms = SmsSender::Scripted(ScriptedSender::new());
        let outcome = sms.send("+15550100", "hello").await;
        assert_eq!(outcome.status, DeliveryStatus::Failed);
        assert!(outcome.message_id.starts_with("failed_"));
    }

    #[test]
    fn provider_names() {
        assert_eq!(SmsSender::Simulation.provider_name(), "simulation");
        assert_eq!(PushSender::Simulation.provider_name(), "simulation");
    }

    #[test]
    fn outcome_success_covers_sent_and_delivered() {
        for status in [DeliveryStatus::Sent, DeliveryStatus::Delivered] {
            let outcome = SendOutcome {
                status,
                message_id: "m".into(),
                provider: "simulation".into(),
            };
            assert!(outcome.succeeded());
        }
        let outcome = SendOutcome::failed("simulation", "boom");
        assert!(!outcome.succeeded());
    }
}
