// Workflow definitions - what a button collects and what happens afterwards

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::buttons::ButtonId;

/// Fixed set of standard visitor fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StandardField {
    FullName,
    Email,
    Company,
    Phone,
    Host,
}

impl StandardField {
    pub const ALL: [StandardField; 5] = [
        StandardField::FullName,
        StandardField::Email,
        StandardField::Company,
        StandardField::Phone,
        StandardField::Host,
    ];

    /// Display order on the contact screen. `Host` has its own step.
    pub const CONTACT_ORDER: [StandardField; 4] = [
        StandardField::FullName,
        StandardField::Company,
        StandardField::Email,
        StandardField::Phone,
    ];

    pub fn key(self) -> &'static str {
        match self {
            StandardField::FullName => "fullName",
            StandardField::Email => "email",
            StandardField::Company => "company",
            StandardField::Phone => "phone",
            StandardField::Host => "host",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StandardField::FullName => "Full name",
            StandardField::Email => "Email",
            StandardField::Company => "Company",
            StandardField::Phone => "Phone",
            StandardField::Host => "Who are you visiting?",
        }
    }

    pub fn input_kind(self) -> InputKind {
        match self {
            StandardField::Email => InputKind::Email,
            StandardField::Phone => InputKind::Phone,
            StandardField::Host => InputKind::Search,
            StandardField::FullName | StandardField::Company => InputKind::Text,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        StandardField::ALL.into_iter().find(|f| f.key() == key)
    }
}

/// Collection flags for one field.
///
/// `required` implies `collect`; every constructor normalizes to keep that true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldFlags {
    pub collect: bool,
    pub required: bool,
}

impl FieldFlags {
    pub const OFF: FieldFlags = FieldFlags {
        collect: false,
        required: false,
    };
    pub const OPTIONAL: FieldFlags = FieldFlags {
        collect: true,
        required: false,
    };
    pub const REQUIRED: FieldFlags = FieldFlags {
        collect: true,
        required: true,
    };

    pub fn new(collect: bool, required: bool) -> Self {
        Self { collect, required }.normalized()
    }

    pub fn normalized(self) -> Self {
        Self {
            collect: self.collect,
            required: self.required && self.collect,
        }
    }
}

/// Flags for every standard field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardFields {
    pub full_name: FieldFlags,
    pub email: FieldFlags,
    pub company: FieldFlags,
    pub phone: FieldFlags,
    pub host: FieldFlags,
}

impl Default for StandardFields {
    fn default() -> Self {
        Self {
            full_name: FieldFlags::REQUIRED,
            email: FieldFlags::OPTIONAL,
            company: FieldFlags::OPTIONAL,
            phone: FieldFlags::OFF,
            host: FieldFlags::OPTIONAL,
        }
    }
}

impl StandardFields {
    pub fn get(&self, field: StandardField) -> FieldFlags {
        match field {
            StandardField::FullName => self.full_name,
            StandardField::Email => self.email,
            StandardField::Company => self.company,
            StandardField::Phone => self.phone,
            StandardField::Host => self.host,
        }
    }

    /// Stores normalized flags and returns what was stored
    pub fn set(&mut self, field: StandardField, flags: FieldFlags) -> FieldFlags {
        let flags = flags.normalized();
        let slot = match field {
            StandardField::FullName => &mut self.full_name,
            StandardField::Email => &mut self.email,
            StandardField::Company => &mut self.company,
            StandardField::Phone => &mut self.phone,
            StandardField::Host => &mut self.host,
        };
        *slot = flags;
        flags
    }
}

/// Identifier of a custom field, unique within one workflow
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomFieldId(String);

impl CustomFieldId {
    pub(crate) fn from_seq(seq: u32) -> Self {
        Self(format!("cf-{seq}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomFieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub id: CustomFieldId,
    pub label: String,
    #[serde(flatten)]
    pub flags: FieldFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowOptions {
    pub capture_photo: bool,
    pub print_badge: bool,
    pub require_nda: bool,
}

/// Who is told about an arrival
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "notifyType", rename_all = "snake_case")]
pub enum NotifyPolicy {
    /// Notify whoever the visitor picked on the host or recipient search
    #[default]
    EmployeeSearch,
    /// Always notify one fixed contact
    SpecificContact { contact: String },
}

/// Full workflow definition bound to one button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowConfig {
    pub button_id: ButtonId,
    pub fields: StandardFields,
    pub custom_fields: Vec<CustomField>,
    pub options: WorkflowOptions,
    #[serde(flatten)]
    pub notify: NotifyPolicy,
    #[serde(default)]
    pub(crate) next_custom_seq: u32,
}

impl WorkflowConfig {
    pub fn with_defaults(button_id: ButtonId) -> Self {
        Self {
            button_id,
            fields: StandardFields::default(),
            custom_fields: Vec::new(),
            options: WorkflowOptions::default(),
            notify: NotifyPolicy::default(),
            next_custom_seq: 0,
        }
    }

    pub fn custom_field(&self, id: &CustomFieldId) -> Option<&CustomField> {
        self.custom_fields.iter().find(|f| &f.id == id)
    }

    pub(crate) fn custom_field_mut(&mut self, id: &CustomFieldId) -> Option<&mut CustomField> {
        self.custom_fields.iter_mut().find(|f| &f.id == id)
    }

    /// Next custom field id; never reuses an id, even after removals
    pub(crate) fn allocate_custom_id(&mut self) -> CustomFieldId {
        let highest = self
            .custom_fields
            .iter()
            .filter_map(|f| f.id.as_str().strip_prefix("cf-"))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        self.next_custom_seq = self.next_custom_seq.max(highest) + 1;
        CustomFieldId::from_seq(self.next_custom_seq)
    }
}

/// How a value is entered on the kiosk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Text,
    Email,
    Phone,
    Search,
    Choice,
    Signature,
}

/// Key of any value a session can collect.
///
/// Standard and custom fields share one key space with the fixed step inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    Standard(StandardField),
    Custom(CustomFieldId),
    VisitType,
    Courier,
    Recipient,
    NdaSignature,
}

impl FieldKey {
    pub fn custom(id: &CustomFieldId) -> Self {
        FieldKey::Custom(id.clone())
    }
}

impl From<StandardField> for FieldKey {
    fn from(field: StandardField) -> Self {
        FieldKey::Standard(field)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Standard(field) => f.write_str(field.key()),
            FieldKey::Custom(id) => f.write_str(id.as_str()),
            FieldKey::VisitType => f.write_str("visitType"),
            FieldKey::Courier => f.write_str("courier"),
            FieldKey::Recipient => f.write_str("recipient"),
            FieldKey::NdaSignature => f.write_str("ndaSignature"),
        }
    }
}

impl FromStr for FieldKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("field key must not be empty".to_string());
        }
        if let Some(field) = StandardField::from_key(s) {
            return Ok(FieldKey::Standard(field));
        }
        Ok(match s {
            "visitType" => FieldKey::VisitType,
            "courier" => FieldKey::Courier,
            "recipient" => FieldKey::Recipient,
            "ndaSignature" => FieldKey::NdaSignature,
            other => FieldKey::Custom(CustomFieldId(other.to_string())),
        })
    }
}

impl Serialize for FieldKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Whether a field came from the fixed standard set or the admin's custom list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOrigin {
    Standard,
    Custom,
    Step,
}

/// One input shown on a step, with its validation rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub key: FieldKey,
    pub label: String,
    pub origin: FieldOrigin,
    pub input: InputKind,
    pub required: bool,
}

impl FieldSpec {
    pub fn standard(field: StandardField, flags: FieldFlags) -> Self {
        Self {
            key: FieldKey::Standard(field),
            label: field.label().to_string(),
            origin: FieldOrigin::Standard,
            input: field.input_kind(),
            required: flags.required,
        }
    }

    pub fn custom(field: &CustomField) -> Self {
        Self {
            key: FieldKey::custom(&field.id),
            label: field.label.clone(),
            origin: FieldOrigin::Custom,
            input: InputKind::Text,
            required: field.flags.required,
        }
    }

    pub fn step_input(key: FieldKey, label: &str, input: InputKind, required: bool) -> Self {
        Self {
            key,
            label: label.to_string(),
            origin: FieldOrigin::Step,
            input,
            required,
        }
    }
}
