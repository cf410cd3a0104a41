// Core types for operator-defined check-in buttons

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stable identity of a check-in button, generated once on creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ButtonId(Uuid);

impl ButtonId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ButtonId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// What kind of arrival a button represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonType {
    VisitEmployee,
    Delivery,
    Event,
    Other,
}

impl ButtonType {
    /// The visit type a button fixes up front, if any.
    ///
    /// Buttons that imply a type skip the `TypeSelect` step.
    pub fn implied_visit_type(self) -> Option<VisitType> {
        match self {
            ButtonType::VisitEmployee => Some(VisitType::Meeting),
            ButtonType::Event => Some(VisitType::Event),
            ButtonType::Delivery | ButtonType::Other => None,
        }
    }

    pub fn default_icon(self) -> ButtonIcon {
        match self {
            ButtonType::VisitEmployee => ButtonIcon::UserCheck,
            ButtonType::Delivery => ButtonIcon::Package,
            ButtonType::Event => ButtonIcon::Calendar,
            ButtonType::Other => ButtonIcon::HelpCircle,
        }
    }
}

/// Closed set of icons the kiosk knows how to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonIcon {
    UserCheck,
    Users,
    Package,
    Truck,
    Coffee,
    Calendar,
    Briefcase,
    HelpCircle,
}

/// Reason for a visit, chosen on `TypeSelect` or implied by the button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitType {
    Meeting,
    Interview,
    Contractor,
    Event,
    Other,
}

impl VisitType {
    pub const ALL: [VisitType; 5] = [
        VisitType::Meeting,
        VisitType::Interview,
        VisitType::Contractor,
        VisitType::Event,
        VisitType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VisitType::Meeting => "meeting",
            VisitType::Interview => "interview",
            VisitType::Contractor => "contractor",
            VisitType::Event => "event",
            VisitType::Other => "other",
        }
    }
}

impl fmt::Display for VisitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        VisitType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown visit type '{s}'"))
    }
}

/// A configured kiosk entry point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonConfig {
    pub id: ButtonId,
    pub label: String,
    pub icon: ButtonIcon,
    #[serde(rename = "type")]
    pub button_type: ButtonType,
    pub is_enabled: bool,
}

/// Admin input for creating a button; the store assigns the id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewButton {
    pub label: String,
    pub icon: Option<ButtonIcon>,
    pub button_type: ButtonType,
    pub is_enabled: bool,
}

impl NewButton {
    pub fn new(label: impl Into<String>, button_type: ButtonType) -> Self {
        Self {
            label: label.into(),
            icon: None,
            button_type,
            is_enabled: true,
        }
    }

    pub fn with_icon(mut self, icon: ButtonIcon) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.is_enabled = false;
        self
    }
}

/// Partial update; `None` leaves the attribute untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonPatch {
    pub label: Option<String>,
    pub icon: Option<ButtonIcon>,
    pub button_type: Option<ButtonType>,
    pub is_enabled: Option<bool>,
}

impl ButtonPatch {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implied_visit_types() {
        assert_eq!(
            ButtonType::VisitEmployee.implied_visit_type(),
            Some(VisitType::Meeting)
        );
        assert_eq!(ButtonType::Event.implied_visit_type(), Some(VisitType::Event));
        assert_eq!(ButtonType::Other.implied_visit_type(), None);
        assert_eq!(ButtonType::Delivery.implied_visit_type(), None);
    }

    #[test]
    fn test_visit_type_parsing() {
        assert_eq!("Interview".parse::<VisitType>(), Ok(VisitType::Interview));
        assert_eq!(" contractor ".parse::<VisitType>(), Ok(VisitType::Contractor));
        assert!("tourist".parse::<VisitType>().is_err());
    }

    #[test]
    fn test_button_config_serializes_type_key() {
        let config = ButtonConfig {
            id: ButtonId::generate(),
            label: "Food Delivery".to_string(),
            icon: ButtonIcon::Package,
            button_type: ButtonType::Delivery,
            is_enabled: true,
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["type"], "Delivery");
        assert_eq!(json["isEnabled"], true);

        let back: ButtonConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
