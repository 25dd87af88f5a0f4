use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Capabilities a tenant can have switched on. Each one gates a group of routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureFlag {
    Auth,
    Payments,
    Scheduling,
    Marketplace,
    Videoconference,
}

impl FeatureFlag {
    pub const ALL: [FeatureFlag; 5] = [
        FeatureFlag::Auth,
        FeatureFlag::Payments,
        FeatureFlag::Scheduling,
        FeatureFlag::Marketplace,
        FeatureFlag::Videoconference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureFlag::Auth => "auth",
            FeatureFlag::Payments => "payments",
            FeatureFlag::Scheduling => "scheduling",
            FeatureFlag::Marketplace => "marketplace",
            FeatureFlag::Videoconference => "videoconference",
        }
    }
}

impl fmt::Display for FeatureFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown feature flag '{0}'")]
pub struct UnknownFeature(pub String);

impl FromStr for FeatureFlag {
    type Err = UnknownFeature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        FeatureFlag::ALL
            .into_iter()
            .find(|flag| flag.as_str() == normalized)
            .ok_or_else(|| UnknownFeature(s.to_string()))
    }
}
