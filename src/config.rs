use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::notify::adapter::{NotificationChannels, PushSender, SmsSender};
use crate::notify::fcm::FcmPush;
use crate::notify::twilio::TwilioSms;
use crate::pipeline::provider::{GenerativeClient, MockModelClient, ModelClient};

/// Application-level constants
pub const APP_NAME: &str = "Aegis";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the application data directory (~/Aegis/ on all platforms)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join("Aegis")
}

/// Runtime configuration, read once from the environment at startup and
/// injected from there — components never read env vars themselves.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub gemini_api_key: Option<String>,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_from_number: Option<String>,
    pub sms_enabled: bool,
    pub fcm_server_key: Option<String>,
    pub push_enabled: bool,
    /// Per-provider-call timeout for classification/guidance.
    pub provider_timeout: Duration,
    /// Per-send timeout for SMS/push adapters.
    pub send_timeout: Duration,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(name: &str) -> bool {
    env_var(name).map(|v| v == "true" || v == "1").unwrap_or(false)
}

impl Config {
    pub fn from_env() -> Self {
        let port = env_var("PORT")
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8080);
        let database_path = env_var("AEGIS_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| app_data_dir().join("aegis.db"));

        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
            database_path,
            gemini_api_key: env_var("GEMINI_API_KEY"),
            twilio_account_sid: env_var("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: env_var("TWILIO_AUTH_TOKEN"),
            twilio_from_number: env_var("TWILIO_PHONE_NUMBER"),
            sms_enabled: env_flag("SMS_ENABLED"),
            fcm_server_key: env_var("FCM_SERVER_KEY"),
            push_enabled: env_flag("PUSH_ENABLED"),
            provider_timeout: Duration::from_secs(12),
            send_timeout: Duration::from_secs(8),
        }
    }

    /// Build the classification/guidance model client. Without an API key
    /// the mock stands in: every call fails upstream and the intake
    /// pipeline degrades to its safe default.
    pub fn build_model_client(&self) -> ModelClient {
        match &self.gemini_api_key {
            Some(key) => {
                match GenerativeClient::new(
                    crate::pipeline::provider::DEFAULT_BASE_URL,
                    key,
                    crate::pipeline::provider::DEFAULT_MODEL,
                    self.provider_timeout,
                ) {
                    Ok(client) => ModelClient::Hosted(client),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to build provider client, intake will use safe defaults");
                        ModelClient::Mock(MockModelClient::new())
                    }
                }
            }
            None => {
                tracing::warn!("GEMINI_API_KEY not set, intake will use safe defaults");
                ModelClient::Mock(MockModelClient::new())
            }
        }
    }

    /// Build the notification channels. Real providers require both
    /// credentials and an explicit enable flag; anything less falls back to
    /// simulation.
    pub fn build_channels(&self) -> NotificationChannels {
        let sms = match (
            self.sms_enabled,
            &self.twilio_account_sid,
            &self.twilio_auth_token,
            &self.twilio_from_number,
        ) {
            (true, Some(sid), Some(token), Some(from)) => {
                match TwilioSms::new(sid, token, from, self.send_timeout) {
                    Some(client) => {
                        tracing::info!("Twilio SMS adapter enabled");
                        SmsSender::Twilio(client)
                    }
                    None => {
                        tracing::warn!("Twilio client construction failed, using simulation");
                        SmsSender::Simulation
                    }
                }
            }
            _ => {
                tracing::info!("Twilio not configured, using SMS simulation");
                SmsSender::Simulation
            }
        };

        let push = match (self.push_enabled, &self.fcm_server_key) {
            (true, Some(key)) => match FcmPush::new(key, self.send_timeout) {
                Some(client) => {
                    tracing::info!("FCM push adapter enabled");
                    PushSender::Fcm(client)
                }
                None => {
                    tracing::warn!("FCM client construction failed, using simulation");
                    PushSender::Simulation
                }
            },
            _ => {
                tracing::info!("FCM not configured, using push simulation");
                PushSender::Simulation
            }
        };

        NotificationChannels { sms, push }
    }
}
