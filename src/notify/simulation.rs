//! Simulated delivery for local development and tests.
//!
//! Mimics the real providers' failure shape (roughly 1 in 10 SMS sends and
//! 3 in 20 push sends fail) but derives the outcome from a hash of the
//! destination, so a given destination always behaves the same way.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::enums::DeliveryStatus;

use super::adapter::SendOutcome;

fn destination_byte(destination: &str) -> u8 {
    let digest = Sha256::digest(destination.as_bytes());
    digest[0]
}

pub fn sms_outcome(phone: &str, message: &str) -> SendOutcome {
    tracing::info!(phone, message, "SMS simulation send");
    let delivered = destination_byte(phone) % 10 != 0;
    simulated("sms", delivered)
}

pub fn push_outcome(device_token: &str, title: &str) -> SendOutcome {
    tracing::info!(device_token, title, "Push simulation send");
    let delivered = destination_byte(device_token) % 20 >= 3;
    simulated("push", delivered)
}

fn simulated(kind: &str, delivered: bool) -> SendOutcome {
    if delivered {
        SendOutcome {
            status: DeliveryStatus::Delivered,
            message_id: format!("{kind}_sim_{}", Uuid::new_v4().simple()),
            provider: "simulation".to_string(),
        }
    } else {
        SendOutcome::failed("simulation", "simulated delivery failure")
    }
}
