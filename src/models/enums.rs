use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(EmergencyCategory {
    Medical => "medical",
    Fire => "fire",
    Police => "police",
    NaturalDisaster => "natural_disaster",
    Accident => "accident",
    Other => "other",
});

str_enum!(EmergencyStatus {
    Active => "active",
    Resolved => "resolved",
    Cancelled => "cancelled",
    Escalated => "escalated",
});

str_enum!(RiskLevel {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

str_enum!(StepPriority {
    Critical => "critical",
    High => "high",
    Medium => "medium",
    Low => "low",
});

str_enum!(NotificationMethod {
    Sms => "sms",
    Push => "push",
    Email => "email",
});

str_enum!(DeliveryStatus {
    Sent => "sent",
    Delivered => "delivered",
    Failed => "failed",
    Pending => "pending",
});

str_enum!(Relationship {
    Family => "family",
    Friend => "friend",
    Doctor => "doctor",
    Colleague => "colleague",
    Neighbor => "neighbor",
    Other => "other",
});

impl EmergencyStatus {
    /// Terminal statuses accept no further lifecycle transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl DeliveryStatus {
    /// Whether a notification in this status is eligible for retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed | Self::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn emergency_category_round_trip() {
        for (variant, s) in [
            (EmergencyCategory::Medical, "medical"),
            (EmergencyCategory::Fire, "fire"),
            (EmergencyCategory::Police, "police"),
            (EmergencyCategory::NaturalDisaster, "natural_disaster"),
            (EmergencyCategory::Accident, "accident"),
            (EmergencyCategory::Other, "other"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(EmergencyCategory::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn emergency_status_round_trip() {
        for (variant, s) in [
            (EmergencyStatus::Active, "active"),
            (EmergencyStatus::Resolved, "resolved"),
            (EmergencyStatus::Cancelled, "cancelled"),
            (EmergencyStatus::Escalated, "escalated"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(EmergencyStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn delivery_status_round_trip() {
        for (variant, s) in [
            (DeliveryStatus::Sent, "sent"),
            (DeliveryStatus::Delivered, "delivered"),
            (DeliveryStatus::Failed, "failed"),
            (DeliveryStatus::Pending, "pending"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(DeliveryStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn only_active_is_non_terminal() {
        assert!(!EmergencyStatus::Active.is_terminal());
        assert!(EmergencyStatus::Resolved.is_terminal());
        assert!(EmergencyStatus::Cancelled.is_terminal());
        assert!(EmergencyStatus::Escalated.is_terminal());
    }

    #[test]
    fn retryable_statuses() {
        assert!(DeliveryStatus::Failed.is_retryable());
        assert!(DeliveryStatus::Pending.is_retryable());
        assert!(!DeliveryStatus::Sent.is_retryable());
        assert!(!DeliveryStatus::Delivered.is_retryable());
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(EmergencyCategory::from_str("invalid").is_err());
        assert!(EmergencyStatus::from_str("unknown").is_err());
        assert!(DeliveryStatus::from_str("").is_err());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&EmergencyCategory::NaturalDisaster).unwrap();
        assert_eq!(json, "\"natural_disaster\"");
        let json = serde_json::to_string(&StepPriority::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }
}
