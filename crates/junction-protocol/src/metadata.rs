use serde::{Deserialize, Serialize};

/// Declares whether the host UI should prompt for a URL and/or an access
/// token before a collector can be configured, with optional labels,
/// placeholders, and validation patterns for each field.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRequirement {
    #[serde(default)]
    pub requires_url: bool,
    #[serde(default)]
    pub requires_access_token: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_validation_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_validation_pattern: Option<String>,
}

/// One step of the setup-instructions list shown to the user configuring
/// a collector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetupStep {
    pub title: String,
    pub body: String,
}

/// The response shape of `getMetadata`: identity, field requirements,
/// defaults, setup instructions, and optional capability flags.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorMetadata {
    pub collector_name: String,
    pub display_name: String,
    pub description: String,
    pub category: String,
    pub emoji: String,
    #[serde(default)]
    pub field_requirements: FieldRequirement,
    pub default_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_url: Option<String>,
    pub default_poll_rate_ms: u64,
    pub default_send_rate_ms: u64,
    #[serde(default)]
    pub setup_instructions: Vec<SetupStep>,
    /// Whether this collector keeps a long-lived session open across
    /// `fetchSensors` calls rather than connecting fresh each time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_persistent_session: Option<bool>,
    /// Name of an external service this collector depends on being
    /// reachable (e.g. a local hub), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_service_type: Option<String>,
}
