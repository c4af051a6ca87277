//! Editable state of the add/edit modal.

use dashboard::{
    CrmFieldForm, FormValues, UserForm, ValidationErrors,
    types::{CrmField, FieldType, User, UserRole},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormKind {
    AddUser,
    EditUser { user_id: String },
    AddField,
    EditField { field_id: String },
}

impl FormKind {
    pub fn title(&self) -> &'static str {
        match self {
            Self::AddUser => " add user ",
            Self::EditUser { .. } => " edit user ",
            Self::AddField => " add crm field ",
            Self::EditField { .. } => " edit crm field ",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormInput {
    pub name: &'static str,
    pub label: &'static str,
    pub secret: bool,
    /// Allowed values; empty for free text.
    pub choices: Vec<&'static str>,
}

impl FormInput {
    fn text(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            secret: false,
            choices: Vec::new(),
        }
    }

    fn secret(name: &'static str, label: &'static str) -> Self {
        Self {
            secret: true,
            ..Self::text(name, label)
        }
    }

    fn choice(name: &'static str, label: &'static str, choices: Vec<&'static str>) -> Self {
        Self {
            choices,
            ..Self::text(name, label)
        }
    }
}

fn user_inputs() -> Vec<FormInput> {
    vec![
        FormInput::text("userId", "User Id"),
        FormInput::text("name", "Name"),
        FormInput::choice(
            "role",
            "Role",
            UserRole::ALL.iter().map(|role| role.as_str()).collect(),
        ),
        FormInput::text("crmEmail", "CRM Email"),
        FormInput::secret("crmPassword", "CRM Password"),
        FormInput::text("agentMobile", "Agent Mobile"),
    ]
}

fn field_inputs() -> Vec<FormInput> {
    vec![
        FormInput::text("caption", "Caption"),
        FormInput::choice(
            "type",
            "Type",
            FieldType::ALL.iter().map(|kind| kind.as_str()).collect(),
        ),
        FormInput::choice("required", "Required", vec!["Yes", "No"]),
        FormInput::choice("readOnly", "Read only", vec!["Yes", "No"]),
        FormInput::text("position", "Position"),
    ]
}

#[derive(Debug, Clone)]
pub struct FormState {
    pub kind: FormKind,
    pub inputs: Vec<FormInput>,
    pub values: FormValues,
    pub focus: usize,
    pub errors: ValidationErrors,
}

impl FormState {
    fn new(kind: FormKind, inputs: Vec<FormInput>, values: FormValues) -> Self {
        Self {
            kind,
            inputs,
            values,
            focus: 0,
            errors: ValidationErrors::default(),
        }
    }

    pub fn add_user() -> Self {
        let values = FormValues::new().with("role", UserRole::Agent.as_str());
        Self::new(FormKind::AddUser, user_inputs(), values)
    }

    pub fn edit_user(user: &User) -> Self {
        let kind = FormKind::EditUser {
            user_id: user.id.clone(),
        };
        Self::new(kind, user_inputs(), UserForm::from_user(user))
    }

    /// New field form, positioned after the last existing field.
    pub fn add_field(field_count: usize) -> Self {
        let values = FormValues::new()
            .with("type", FieldType::Text.as_str())
            .with("required", "No")
            .with("readOnly", "No")
            .with("position", (field_count + 1).to_string());
        Self::new(FormKind::AddField, field_inputs(), values)
    }

    pub fn edit_field(field: &CrmField) -> Self {
        let kind = FormKind::EditField {
            field_id: field.id.clone(),
        };
        Self::new(kind, field_inputs(), CrmFieldForm::from_field(field))
    }

    pub fn focused(&self) -> &FormInput {
        &self.inputs[self.focus]
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.inputs.len();
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.focus.checked_sub(1).unwrap_or(self.inputs.len() - 1);
    }

    pub fn push_char(&mut self, ch: char) {
        let name = self.focused().name;
        self.values.get_mut(name).push(ch);
    }

    pub fn backspace(&mut self) {
        let name = self.focused().name;
        self.values.get_mut(name).pop();
    }

    /// Steps a choice input through its allowed values. Free text inputs
    /// are left alone.
    pub fn cycle(&mut self, forward: bool) {
        let input = self.focused();
        if input.choices.is_empty() {
            return;
        }
        let (name, len) = (input.name, input.choices.len());
        let current = input
            .choices
            .iter()
            .position(|choice| choice.eq_ignore_ascii_case(self.values.get(name)));
        let next = match (current, forward) {
            (None, _) => 0,
            (Some(index), true) => (index + 1) % len,
            (Some(index), false) => index.checked_sub(1).unwrap_or(len - 1),
        };
        let value = self.inputs[self.focus].choices[next];
        self.values.set(name, value);
    }

    pub fn set_errors(&mut self, errors: ValidationErrors) {
        if let Some(index) = self
            .inputs
            .iter()
            .position(|input| errors.field(input.name).is_some())
        {
            self.focus = index;
        }
        self.errors = errors;
    }

    pub fn set_banner(&mut self, message: impl Into<String>) {
        self.errors = ValidationErrors::banner(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_field_defaults_to_appending() {
        let form = FormState::add_field(2);
        assert_eq!(form.values.get("position"), "3");
        assert_eq!(form.values.get("required"), "No");
    }

    #[test]
    fn focus_wraps_both_ways() {
        let mut form = FormState::add_user();
        form.focus_prev();
        assert_eq!(form.focused().name, "agentMobile");
        form.focus_next();
        assert_eq!(form.focused().name, "userId");
    }

    #[test]
    fn choices_cycle_and_text_is_untouched() {
        let mut form = FormState::add_field(0);
        form.cycle(true);
        assert_eq!(form.values.get("caption"), "");

        form.focus_next();
        form.cycle(true);
        assert_eq!(form.values.get("type"), "number");
        form.cycle(false);
        form.cycle(false);
        assert_eq!(form.values.get("type"), "checkbox");
    }

    #[test]
    fn typing_edits_focused_value() {
        let mut form = FormState::add_user();
        for ch in "u42".chars() {
            form.push_char(ch);
        }
        form.backspace();
        assert_eq!(form.values.get("userId"), "u4");
    }

    #[test]
    fn errors_move_focus_to_first_invalid_input() {
        let mut form = FormState::add_field(0);
        let mut errors = ValidationErrors::default();
        errors.insert("position", "Please enter position");
        form.set_errors(errors);
        assert_eq!(form.focused().name, "position");
    }
}
