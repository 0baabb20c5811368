use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A classified, policy-relevant interpretation of one or more raw signals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AnomalyKind {
    TabSwitch,
    PointerSuspicious,
    KeystrokeIrregular,
    VisionSuspicious,
}

impl AnomalyKind {
    /// Stable event-type string used for the audit log sink.
    pub fn wire_name(&self) -> &'static str {
        match self {
            AnomalyKind::TabSwitch => "tab_switch",
            AnomalyKind::PointerSuspicious => "mouse_leave",
            AnomalyKind::KeystrokeIrregular => "irregular_keystrokes",
            AnomalyKind::VisionSuspicious => "suspicious_behavior",
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            AnomalyKind::TabSwitch => "Tab switch detected",
            AnomalyKind::PointerSuspicious => "Suspicious mouse movement detected",
            AnomalyKind::KeystrokeIrregular => "Irregular keystroke pattern detected",
            AnomalyKind::VisionSuspicious => "Suspicious behavior detected",
        }
    }
}

/// An entry in the session's append-only violation log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyEvent {
    pub kind: AnomalyKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl AnomalyEvent {
    pub fn now(kind: AnomalyKind) -> Self {
        Self {
            kind,
            message: kind.default_message().to_string(),
            timestamp: Utc::now(),
        }
    }
}
