//! Notification payloads handed to a delivery sink

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::report::{Report, ReportMode};
use super::result::{Error, Result};

/// SMS provider the gateway should route through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmsProvider {
    Twilio,
    AwsSns,
    Clickatell,
    Messagebird,
    Nexmo,
}

impl SmsProvider {
    pub const ALL: [SmsProvider; 5] = [
        SmsProvider::Twilio,
        SmsProvider::AwsSns,
        SmsProvider::Clickatell,
        SmsProvider::Messagebird,
        SmsProvider::Nexmo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SmsProvider::Twilio => "twilio",
            SmsProvider::AwsSns => "aws_sns",
            SmsProvider::Clickatell => "clickatell",
            SmsProvider::Messagebird => "messagebird",
            SmsProvider::Nexmo => "nexmo",
        }
    }
}

impl fmt::Display for SmsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SmsProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        SmsProvider::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| Error::validation(format!("Unknown SMS provider '{}'", s)))
    }
}

/// Delivery settings for one notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationConfig {
    pub provider: SmsProvider,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub from_number: String,
    #[serde(default)]
    pub recipients: Vec<String>,
}

impl NotificationConfig {
    /// Reject configs that could never be delivered
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::validation("Notification API key is missing"));
        }
        let recipients = self.recipients.iter().filter(|r| !r.trim().is_empty()).count();
        if recipients == 0 {
            return Err(Error::validation("Notification has no recipients"));
        }
        Ok(())
    }

    /// The config with the API key blanked, safe to log or echo back
    pub fn redacted(&self) -> Self {
        Self {
            api_key: if self.api_key.is_empty() {
                String::new()
            } else {
                "***".to_string()
            },
            ..self.clone()
        }
    }
}

/// Provider-agnostic payload for a [`crate::ports::NotificationSink`]
#[derive(Debug, Clone, Serialize)]
pub struct NotificationEnvelope {
    pub report: Report,
    pub notification_config: NotificationConfig,
    pub mode: ReportMode,
    /// Plain-text rendering of `report`
    pub text: String,
}

impl NotificationEnvelope {
    pub fn new(report: Report, notification_config: NotificationConfig) -> Self {
        let mode = report.mode();
        let text = report.to_sms_text();
        Self {
            report,
            notification_config,
            mode,
            text,
        }
    }
}

/// Outcome of a delivery attempt, reported next to the report it carried
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStatus {
    pub sent: bool,
    pub provider: Option<SmsProvider>,
    pub recipients: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NotificationStatus {
    pub fn sent(config: &NotificationConfig) -> Self {
        Self {
            sent: true,
            provider: Some(config.provider),
            recipients: config.recipients.len(),
            error: None,
        }
    }

    pub fn failed(config: Option<&NotificationConfig>, error: impl Into<String>) -> Self {
        Self {
            sent: false,
            provider: config.map(|c| c.provider),
            recipients: config.map(|c| c.recipients.len()).unwrap_or(0),
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NotificationConfig {
        NotificationConfig {
            provider: SmsProvider::Twilio,
            api_key: "key".to_string(),
            from_number: "+27000000000".to_string(),
            recipients: vec!["+27111111111".to_string()],
        }
    }

    #[test]
    fn test_camel_case_config() {
        let json = r#"{"provider":"aws_sns","apiKey":"k","fromNumber":"+1","recipients":["+2"]}"#;
        let parsed: NotificationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.provider, SmsProvider::AwsSns);
        assert_eq!(parsed.api_key, "k");
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut c = config();
        c.recipients = vec!["  ".to_string()];
        assert!(c.validate().is_err());

        let mut c = config();
        c.api_key.clear();
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_redacted_hides_key() {
        assert_eq!(config().redacted().api_key, "***");
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("MessageBird".parse::<SmsProvider>().unwrap(), SmsProvider::Messagebird);
        assert!("pigeon".parse::<SmsProvider>().is_err());
    }
}
