//! Maps a button and its workflow onto the ordered screens of one kiosk run.
//!
//! Resolution is pure: the same inputs always produce the same steps in the
//! same order. Sessions resolve exactly once, at start.

use serde::{Deserialize, Serialize};

use crate::buttons::{ButtonConfig, ButtonType, VisitType};
use crate::workflow::types::*;

/// How contact fields are spread over screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactLayout {
    /// Standard and custom fields share one `ContactInfo` screen
    #[default]
    SingleScreen,
    /// Each collected custom field gets its own `CustomField` screen
    OneFieldPerScreen,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum StepKind {
    TypeSelect,
    ContactInfo,
    HostSearch,
    CourierSelect,
    RecipientSearch,
    CustomField(CustomFieldId),
    PhotoCapture,
    NdaSign,
    Success,
}

/// One screen of a resolved run and the inputs it validates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub kind: StepKind,
    pub fields: Vec<FieldSpec>,
}

impl Step {
    fn bare(kind: StepKind) -> Self {
        Self {
            kind,
            fields: Vec::new(),
        }
    }

    fn with_input(kind: StepKind, field: FieldSpec) -> Self {
        Self {
            kind,
            fields: vec![field],
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == StepKind::Success
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowResolver {
    layout: ContactLayout,
}

impl WorkflowResolver {
    pub fn new(layout: ContactLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> ContactLayout {
        self.layout
    }

    pub fn resolve(&self, button: &ButtonConfig, workflow: &WorkflowConfig) -> Vec<Step> {
        let mut steps = match button.button_type {
            ButtonType::Delivery => delivery_steps(workflow),
            _ => self.visit_steps(button, workflow),
        };
        steps.push(Step::bare(StepKind::Success));
        steps
    }

    fn visit_steps(&self, button: &ButtonConfig, workflow: &WorkflowConfig) -> Vec<Step> {
        let mut steps = Vec::new();

        if button.button_type.implied_visit_type().is_none() {
            steps.push(Step::with_input(
                StepKind::TypeSelect,
                FieldSpec::step_input(
                    FieldKey::VisitType,
                    "What brings you in today?",
                    InputKind::Choice,
                    true,
                ),
            ));
        }

        let standard = StandardField::CONTACT_ORDER
            .into_iter()
            .filter_map(|field| {
                let flags = workflow.fields.get(field);
                flags.collect.then(|| FieldSpec::standard(field, flags))
            });
        let custom = workflow.custom_fields.iter().filter(|f| f.flags.collect);

        match self.layout {
            ContactLayout::SingleScreen => {
                let fields: Vec<_> = standard.chain(custom.map(FieldSpec::custom)).collect();
                push_unless_empty(&mut steps, StepKind::ContactInfo, fields);
            }
            ContactLayout::OneFieldPerScreen => {
                push_unless_empty(&mut steps, StepKind::ContactInfo, standard.collect());
                for field in custom {
                    steps.push(Step::with_input(
                        StepKind::CustomField(field.id.clone()),
                        FieldSpec::custom(field),
                    ));
                }
            }
        }

        let host = workflow.fields.host;
        if host.collect {
            steps.push(Step::with_input(
                StepKind::HostSearch,
                FieldSpec::standard(StandardField::Host, host),
            ));
        }
        if workflow.options.require_nda {
            steps.push(Step::with_input(
                StepKind::NdaSign,
                FieldSpec::step_input(
                    FieldKey::NdaSignature,
                    "Sign the non-disclosure agreement",
                    InputKind::Signature,
                    true,
                ),
            ));
        }
        if workflow.options.capture_photo {
            steps.push(Step::bare(StepKind::PhotoCapture));
        }
        steps
    }
}

/// Deliveries use fixed courier/recipient screens; contact fields are never asked
fn delivery_steps(workflow: &WorkflowConfig) -> Vec<Step> {
    let mut steps = vec![
        Step::with_input(
            StepKind::CourierSelect,
            FieldSpec::step_input(FieldKey::Courier, "Courier", InputKind::Choice, true),
        ),
        Step::with_input(
            StepKind::RecipientSearch,
            FieldSpec::step_input(
                FieldKey::Recipient,
                "Who is this delivery for?",
                InputKind::Search,
                true,
            ),
        ),
    ];
    if workflow.options.capture_photo {
        steps.push(Step::bare(StepKind::PhotoCapture));
    }
    steps
}

/// Screens with nothing to fill in are dropped
fn push_unless_empty(steps: &mut Vec<Step>, kind: StepKind, fields: Vec<FieldSpec>) {
    if !fields.is_empty() {
        steps.push(Step { kind, fields });
    }
}

/// Resolve with the default single-screen contact layout
pub fn resolve(button: &ButtonConfig, workflow: &WorkflowConfig) -> Vec<Step> {
    WorkflowResolver::default().resolve(button, workflow)
}

/// Visit type fixed by the button, or chosen on `TypeSelect`
pub fn effective_visit_type(button: &ButtonConfig, chosen: Option<VisitType>) -> Option<VisitType> {
    button.button_type.implied_visit_type().or(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buttons::{ButtonIcon, ButtonId};

    fn button(button_type: ButtonType) -> ButtonConfig {
        ButtonConfig {
            id: ButtonId::generate(),
            label: "Test".to_string(),
            icon: button_type.default_icon(),
            button_type,
            is_enabled: true,
        }
    }

    fn kinds(steps: &[Step]) -> Vec<StepKind> {
        steps.iter().map(|s| s.kind.clone()).collect()
    }

    fn field_keys(step: &Step) -> Vec<String> {
        step.fields.iter().map(|f| f.key.to_string()).collect()
    }

    #[test]
    fn test_visit_employee_with_badge() {
        let button = button(ButtonType::VisitEmployee);
        let mut workflow = WorkflowConfig::with_defaults(button.id);
        workflow.fields.full_name = FieldFlags::REQUIRED;
        workflow.fields.email = FieldFlags::REQUIRED;
        workflow.fields.company = FieldFlags::OPTIONAL;
        workflow.options.print_badge = true;

        let steps = resolve(&button, &workflow);
        assert_eq!(
            kinds(&steps),
            vec![StepKind::ContactInfo, StepKind::HostSearch, StepKind::Success]
        );
        assert_eq!(field_keys(&steps[0]), vec!["fullName", "company", "email"]);
    }

    #[test]
    fn test_delivery_with_photo() {
        let button = button(ButtonType::Delivery);
        let mut workflow = WorkflowConfig::with_defaults(button.id);
        workflow.options.capture_photo = true;
        workflow.options.require_nda = true;
        let id = workflow.allocate_custom_id();
        workflow.custom_fields.push(CustomField {
            id,
            label: "Tracking number".to_string(),
            flags: FieldFlags::REQUIRED,
        });

        let steps = resolve(&button, &workflow);
        assert_eq!(
            kinds(&steps),
            vec![
                StepKind::CourierSelect,
                StepKind::RecipientSearch,
                StepKind::PhotoCapture,
                StepKind::Success
            ]
        );
    }

    #[test]
    fn test_other_button_asks_for_type_and_orders_optional_steps() {
        let button = button(ButtonType::Other);
        let mut workflow = WorkflowConfig::with_defaults(button.id);
        workflow.options = WorkflowOptions {
            capture_photo: true,
            print_badge: false,
            require_nda: true,
        };

        let steps = resolve(&button, &workflow);
        assert_eq!(
            kinds(&steps),
            vec![
                StepKind::TypeSelect,
                StepKind::ContactInfo,
                StepKind::HostSearch,
                StepKind::NdaSign,
                StepKind::PhotoCapture,
                StepKind::Success
            ]
        );
    }

    #[test]
    fn test_contact_info_skipped_when_nothing_collected() {
        let button = button(ButtonType::Event);
        let mut workflow = WorkflowConfig::with_defaults(button.id);
        for field in StandardField::ALL {
            workflow.fields.set(field, FieldFlags::OFF);
        }
        let id = workflow.allocate_custom_id();
        workflow.custom_fields.push(CustomField {
            id,
            label: "Dietary needs".to_string(),
            flags: FieldFlags::OFF,
        });

        let steps = resolve(&button, &workflow);
        assert_eq!(kinds(&steps), vec![StepKind::Success]);
    }

    #[test]
    fn test_custom_fields_follow_standard_fields() {
        let button = button(ButtonType::VisitEmployee);
        let mut workflow = WorkflowConfig::with_defaults(button.id);
        workflow.fields.phone = FieldFlags::OPTIONAL;
        let first = workflow.allocate_custom_id();
        let second = workflow.allocate_custom_id();
        workflow.custom_fields.push(CustomField {
            id: second.clone(),
            label: "Vehicle".to_string(),
            flags: FieldFlags::OPTIONAL,
        });
        workflow.custom_fields.push(CustomField {
            id: first.clone(),
            label: "Citizenship".to_string(),
            flags: FieldFlags::REQUIRED,
        });

        let steps = resolve(&button, &workflow);
        assert_eq!(
            field_keys(&steps[0]),
            vec![
                "fullName".to_string(),
                "company".to_string(),
                "email".to_string(),
                "phone".to_string(),
                second.to_string(),
                first.to_string()
            ]
        );
        assert_eq!(steps[0].required_fields().count(), 2);
    }

    #[test]
    fn test_one_field_per_screen_layout() {
        let button = button(ButtonType::VisitEmployee);
        let mut workflow = WorkflowConfig::with_defaults(button.id);
        for field in StandardField::CONTACT_ORDER {
            workflow.fields.set(field, FieldFlags::OFF);
        }
        let id = workflow.allocate_custom_id();
        workflow.custom_fields.push(CustomField {
            id: id.clone(),
            label: "Parking spot".to_string(),
            flags: FieldFlags::OPTIONAL,
        });

        let steps = WorkflowResolver::new(ContactLayout::OneFieldPerScreen).resolve(&button, &workflow);
        assert_eq!(
            kinds(&steps),
            vec![StepKind::CustomField(id), StepKind::HostSearch, StepKind::Success]
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let button = ButtonConfig {
            icon: ButtonIcon::Briefcase,
            ..button(ButtonType::Other)
        };
        let mut workflow = WorkflowConfig::with_defaults(button.id);
        workflow.options.capture_photo = true;

        assert_eq!(resolve(&button, &workflow), resolve(&button, &workflow));
    }

    #[test]
    fn test_effective_visit_type() {
        let event = button(ButtonType::Event);
        assert_eq!(
            effective_visit_type(&event, Some(VisitType::Interview)),
            Some(VisitType::Event)
        );
        let other = button(ButtonType::Other);
        assert_eq!(
            effective_visit_type(&other, Some(VisitType::Interview)),
            Some(VisitType::Interview)
        );
        assert_eq!(effective_visit_type(&other, None), None);
    }
}
