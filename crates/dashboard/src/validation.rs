//! Declarative form validation.
//!
//! A [`FormSchema`] lists the rules of each field of a form. Validation is
//! synchronous and runs before any request is sent; rules that depend on
//! collection state (the CRM field position bound) are checked by the
//! managers on top of this layer.

use std::{collections::BTreeMap, fmt};

use api_types::{
    crm::{CrmField, CrmFieldAttrs, FieldType},
    users::{User, UserAttrs, UserRole},
};

/// Raw values of a form, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues(BTreeMap<String, String>);

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        self.0.insert(field.to_string(), value.into());
    }

    /// Trimmed value of `field`, empty when unset.
    pub fn get(&self, field: &str) -> &str {
        self.0.get(field).map(|value| value.trim()).unwrap_or("")
    }

    pub fn get_mut(&mut self, field: &str) -> &mut String {
        self.0.entry(field.to_string()).or_default()
    }
}

#[derive(Debug, Clone)]
pub enum Rule {
    Required(&'static str),
    Integer(&'static str),
    MinInteger(i64, &'static str),
    OneOf(Vec<&'static str>, &'static str),
}

impl Rule {
    /// Returns the message of a failing rule. Only `Required` looks at empty
    /// values; the other rules accept them.
    fn check(&self, value: &str) -> Option<&'static str> {
        match self {
            Self::Required(message) => value.is_empty().then_some(*message),
            _ if value.is_empty() => None,
            Self::Integer(message) => value.parse::<i64>().is_err().then_some(*message),
            Self::MinInteger(min, message) => value
                .parse::<i64>()
                .map(|parsed| parsed < *min)
                .unwrap_or(false)
                .then_some(*message),
            Self::OneOf(allowed, message) => (!allowed
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(value)))
            .then_some(*message),
        }
    }
}

/// Per-field messages plus an optional banner for errors that belong to
/// the form as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
    banner: Option<String>,
}

impl ValidationErrors {
    pub fn banner(message: impl Into<String>) -> Self {
        Self {
            fields: BTreeMap::new(),
            banner: Some(message.into()),
        }
    }

    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.fields.insert(field.to_string(), message.into());
    }

    pub fn field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn banner_message(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.banner.is_none()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(banner) = &self.banner {
            return f.write_str(banner);
        }
        let mut first = true;
        for message in self.fields.values() {
            if !first {
                f.write_str("; ")?;
            }
            f.write_str(message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Clone, Default)]
pub struct FormSchema {
    fields: Vec<(&'static str, Vec<Rule>)>,
}

impl FormSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &'static str, rules: impl Into<Vec<Rule>>) -> Self {
        self.fields.push((name, rules.into()));
        self
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }

    /// Checks every field; the first failing rule of a field wins.
    pub fn validate(&self, values: &FormValues) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        for (name, rules) in &self.fields {
            let value = values.get(name);
            if let Some(message) = rules.iter().find_map(|rule| rule.check(value)) {
                errors.insert(name, message);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

const YES_NO: [&str; 2] = ["Yes", "No"];

pub fn crm_field_schema() -> FormSchema {
    FormSchema::new()
        .field("caption", [Rule::Required("Please enter caption")])
        .field(
            "type",
            [
                Rule::Required("Please select type"),
                Rule::OneOf(
                    FieldType::ALL.iter().map(|kind| kind.as_str()).collect(),
                    "Please select a valid type",
                ),
            ],
        )
        .field(
            "required",
            [
                Rule::Required("Please select whether field is required"),
                Rule::OneOf(YES_NO.to_vec(), "Please answer Yes or No"),
            ],
        )
        .field(
            "readOnly",
            [
                Rule::Required("Please select whether field is read only"),
                Rule::OneOf(YES_NO.to_vec(), "Please answer Yes or No"),
            ],
        )
        .field(
            "position",
            [
                Rule::Required("Please enter position"),
                Rule::Integer("Position must be a number"),
                Rule::MinInteger(1, "Position must be at least 1"),
            ],
        )
}

pub fn user_schema() -> FormSchema {
    FormSchema::new()
        .field("userId", [Rule::Required("Please enter User Id")])
        .field("name", [Rule::Required("Please enter Name")])
        .field(
            "role",
            [
                Rule::Required("Please select user role"),
                Rule::OneOf(
                    UserRole::ALL.iter().map(|role| role.as_str()).collect(),
                    "Please select a valid role",
                ),
            ],
        )
        .field("crmEmail", [Rule::Required("Please enter CRM Email")])
        .field("crmPassword", [Rule::Required("Please enter CRM Password")])
        .field("agentMobile", [Rule::Required("Please enter Agent Mobile")])
}

pub fn campaign_selector_schema() -> FormSchema {
    FormSchema::new().field("campaignName", [Rule::Required("Please select a campaign")])
}

pub fn login_schema() -> FormSchema {
    FormSchema::new()
        .field("email", [Rule::Required("Please enter your email")])
        .field("password", [Rule::Required("Please enter your password")])
}

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

/// Conversions between the CRM field form and its typed attributes.
pub struct CrmFieldForm;

impl CrmFieldForm {
    pub fn parse(values: &FormValues) -> Result<CrmFieldAttrs, ValidationErrors> {
        crm_field_schema().validate(values)?;

        let mut errors = ValidationErrors::default();
        let field_type = FieldType::parse(values.get("type"));
        let position = values.get("position").parse::<u32>().ok();
        if position.is_none() {
            errors.insert("position", "Position must be a number");
        }

        match (field_type, position) {
            (Some(field_type), Some(position)) => Ok(CrmFieldAttrs {
                caption: values.get("caption").to_string(),
                field_type,
                required: values.get("required").eq_ignore_ascii_case("yes"),
                read_only: values.get("readOnly").eq_ignore_ascii_case("yes"),
                position,
            }),
            (None, _) => {
                errors.insert("type", "Please select a valid type");
                Err(errors)
            }
            _ => Err(errors),
        }
    }

    /// Prefills the form from an existing field.
    pub fn from_field(field: &CrmField) -> FormValues {
        FormValues::new()
            .with("caption", field.caption.as_str())
            .with("type", field.field_type.as_str())
            .with("required", yes_no(field.required))
            .with("readOnly", yes_no(field.read_only))
            .with("position", field.position.to_string())
    }

    pub fn from_attrs(attrs: &CrmFieldAttrs) -> FormValues {
        FormValues::new()
            .with("caption", attrs.caption.as_str())
            .with("type", attrs.field_type.as_str())
            .with("required", yes_no(attrs.required))
            .with("readOnly", yes_no(attrs.read_only))
            .with("position", attrs.position.to_string())
    }

    /// Runs the form schema over attributes built without the form.
    pub fn check(attrs: &CrmFieldAttrs) -> Result<(), ValidationErrors> {
        crm_field_schema().validate(&Self::from_attrs(attrs))
    }
}

/// Conversions between the user form and its typed attributes.
pub struct UserForm;

impl UserForm {
    pub fn parse(values: &FormValues) -> Result<UserAttrs, ValidationErrors> {
        user_schema().validate(values)?;

        let Some(role) = UserRole::parse(values.get("role")) else {
            let mut errors = ValidationErrors::default();
            errors.insert("role", "Please select a valid role");
            return Err(errors);
        };

        Ok(UserAttrs {
            user_id: values.get("userId").to_string(),
            name: values.get("name").to_string(),
            role,
            crm_email: values.get("crmEmail").to_string(),
            crm_password: values.get("crmPassword").to_string(),
            agent_mobile: values.get("agentMobile").to_string(),
        })
    }

    /// Runs the form schema over attributes built without the form.
    pub fn check(attrs: &UserAttrs) -> Result<(), ValidationErrors> {
        let values = FormValues::new()
            .with("userId", attrs.user_id.as_str())
            .with("name", attrs.name.as_str())
            .with("role", attrs.role.as_str())
            .with("crmEmail", attrs.crm_email.as_str())
            .with("crmPassword", attrs.crm_password.as_str())
            .with("agentMobile", attrs.agent_mobile.as_str());
        user_schema().validate(&values)
    }

    pub fn from_user(user: &User) -> FormValues {
        FormValues::new()
            .with("userId", user.id.as_str())
            .with("name", user.username.as_str())
            .with("role", user.role.as_str())
            .with("crmEmail", user.crm_email.as_str())
            .with("crmPassword", user.crm_password.as_str())
            .with("agentMobile", user.agent_mobile.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_form() -> FormValues {
        FormValues::new()
            .with("caption", "Customer name")
            .with("type", "text")
            .with("required", "Yes")
            .with("readOnly", "No")
            .with("position", "2")
    }

    #[test]
    fn empty_form_reports_every_required_field() {
        let errors = crm_field_schema().validate(&FormValues::new()).unwrap_err();
        assert_eq!(errors.field("caption"), Some("Please enter caption"));
        assert_eq!(errors.field("type"), Some("Please select type"));
        assert_eq!(errors.field("position"), Some("Please enter position"));
        assert_eq!(errors.fields().len(), 5);
    }

    #[test]
    fn whitespace_counts_as_missing() {
        let values = field_form().with("caption", "   ");
        let errors = crm_field_schema().validate(&values).unwrap_err();
        assert_eq!(errors.field("caption"), Some("Please enter caption"));
        assert_eq!(errors.fields().len(), 1);
    }

    #[test]
    fn position_must_be_a_positive_integer() {
        let errors = CrmFieldForm::parse(&field_form().with("position", "two")).unwrap_err();
        assert_eq!(errors.field("position"), Some("Position must be a number"));

        let errors = CrmFieldForm::parse(&field_form().with("position", "0")).unwrap_err();
        assert_eq!(errors.field("position"), Some("Position must be at least 1"));
    }

    #[test]
    fn crm_field_form_parses_yes_no_and_type() {
        let attrs = CrmFieldForm::parse(&field_form()).unwrap();
        assert_eq!(attrs.field_type, FieldType::Text);
        assert!(attrs.required);
        assert!(!attrs.read_only);
        assert_eq!(attrs.position, 2);
    }

    #[test]
    fn crm_field_form_round_trips_through_prefill() {
        let field = CrmField {
            id: "f1".to_string(),
            caption: "Phone".to_string(),
            field_type: FieldType::Phone,
            required: false,
            read_only: true,
            position: 3,
        };
        let values = CrmFieldForm::from_field(&field);
        assert_eq!(values.get("readOnly"), "Yes");
        let attrs = CrmFieldForm::parse(&values).unwrap();
        assert_eq!(attrs.position, 3);
        assert!(attrs.read_only);
    }

    #[test]
    fn user_form_rejects_unknown_role() {
        let values = FormValues::new()
            .with("userId", "u1")
            .with("name", "Ada")
            .with("role", "janitor")
            .with("crmEmail", "ada@example.com")
            .with("crmPassword", "secret")
            .with("agentMobile", "555");
        let errors = UserForm::parse(&values).unwrap_err();
        assert_eq!(errors.field("role"), Some("Please select a valid role"));
    }

    #[test]
    fn banner_is_displayed_before_field_messages() {
        let mut errors = ValidationErrors::banner("CRM Field position should not be more than 3");
        errors.insert("caption", "Please enter caption");
        assert_eq!(
            errors.to_string(),
            "CRM Field position should not be more than 3"
        );
    }
}
