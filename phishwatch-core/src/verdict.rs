use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLabel {
    Safe,
    Suspicious,
    Dangerous,
}

impl RiskLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::Safe => "Safe",
            RiskLabel::Suspicious => "Suspicious",
            RiskLabel::Dangerous => "Dangerous",
        }
    }

    /// Case-insensitive match against the three known labels
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "safe" => Some(RiskLabel::Safe),
            "suspicious" => Some(RiskLabel::Suspicious),
            "dangerous" => Some(RiskLabel::Dangerous),
            _ => None,
        }
    }
}

/// The risk assessment returned to the caller.
///
/// Fields the model left out stay `None` and are omitted from the JSON body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Verdict {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_label: Option<RiskLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(rename = "screenshot", skip_serializing_if = "Option::is_none")]
    pub screenshot_notes: Option<String>,
}

pub const FALLBACK_ANALYSIS: &str = "Model did not return valid JSON. Fallback.";

impl Verdict {
    /// Fail-closed verdict used when the model output cannot be parsed
    pub fn fallback() -> Self {
        Self {
            risk_score: Some(50),
            risk_label: Some(RiskLabel::Suspicious),
            analysis: Some(FALLBACK_ANALYSIS.to_string()),
            screenshot_notes: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        *self == Self::fallback()
    }
}
