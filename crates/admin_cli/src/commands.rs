use clap::{Args, Subcommand};
use dashboard::{
    Client, CrmFieldForm, CrmFieldManager, FormValues, ManagerError, MutationOutcome, UserForm,
    UserManager,
    types::{CrmField, User},
};

use crate::{CliError, prompt};

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    List,
    Add(UserFields),
    /// Change a user; only the given flags are updated.
    Edit {
        /// Id of the user to change.
        id: String,
        #[command(flatten)]
        changes: UserFields,
    },
    Delete {
        id: String,
    },
}

#[derive(Args, Debug, Default)]
pub struct UserFields {
    #[arg(long)]
    user_id: Option<String>,
    #[arg(long)]
    name: Option<String>,
    /// admin, supervisor or agent.
    #[arg(long)]
    role: Option<String>,
    #[arg(long)]
    crm_email: Option<String>,
    /// Prompted for when adding a user without it.
    #[arg(long)]
    crm_password: Option<String>,
    #[arg(long)]
    agent_mobile: Option<String>,
}

impl UserFields {
    fn apply(self, values: &mut FormValues) {
        let pairs = [
            ("userId", self.user_id),
            ("name", self.name),
            ("role", self.role),
            ("crmEmail", self.crm_email),
            ("crmPassword", self.crm_password),
            ("agentMobile", self.agent_mobile),
        ];
        for (field, value) in pairs {
            if let Some(value) = value {
                values.set(field, value);
            }
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum FieldCommand {
    List,
    Add(FieldFields),
    /// Change a field; only the given flags are updated.
    Edit {
        /// Id of the field to change.
        id: String,
        #[command(flatten)]
        changes: FieldFields,
    },
    Delete {
        id: String,
    },
}

#[derive(Args, Debug, Default)]
pub struct FieldFields {
    #[arg(long)]
    caption: Option<String>,
    /// text, number, email, phone, date, dropdown or checkbox.
    #[arg(long = "type")]
    field_type: Option<String>,
    /// Yes or No.
    #[arg(long)]
    required: Option<String>,
    /// Yes or No.
    #[arg(long)]
    read_only: Option<String>,
    /// Defaults to after the last field when adding.
    #[arg(long)]
    position: Option<String>,
}

impl FieldFields {
    fn apply(self, values: &mut FormValues) {
        let pairs = [
            ("caption", self.caption),
            ("type", self.field_type),
            ("required", self.required),
            ("readOnly", self.read_only),
            ("position", self.position),
        ];
        for (field, value) in pairs {
            if let Some(value) = value {
                values.set(field, value);
            }
        }
    }
}

fn new_field_values(field_count: usize) -> FormValues {
    FormValues::new()
        .with("type", "text")
        .with("required", "No")
        .with("readOnly", "No")
        .with("position", (field_count + 1).to_string())
}

fn report(outcome: MutationOutcome, success: &str) -> Result<(), CliError> {
    match outcome {
        MutationOutcome::Rejected(message) => Err(CliError::Rejected(message)),
        MutationOutcome::Stale => {
            println!("server answer was outdated; list again to see the current state");
            Ok(())
        }
        _ => {
            println!("{success}");
            Ok(())
        }
    }
}

pub async fn users(client: &Client, command: UserCommand) -> Result<(), CliError> {
    let mut manager = UserManager::new();
    manager.refresh(client).await?;

    match command {
        UserCommand::List => print_users(manager.users()),
        UserCommand::Add(mut fields) => {
            if fields.crm_password.is_none() {
                fields.crm_password = Some(prompt::secret("CRM password: ")?);
            }
            let mut values = FormValues::new().with("role", "agent");
            fields.apply(&mut values);
            let attrs = UserForm::parse(&values).map_err(ManagerError::from)?;
            report(manager.add_user(client, attrs).await?, "user added")?;
        }
        UserCommand::Edit { id, changes } => {
            let user = manager
                .find(&id)
                .ok_or_else(|| ManagerError::RecordNotFound(id.clone()))?;
            let mut values = UserForm::from_user(user);
            changes.apply(&mut values);
            let attrs = UserForm::parse(&values).map_err(ManagerError::from)?;
            report(manager.edit_user(client, &id, attrs).await?, "user updated")?;
        }
        UserCommand::Delete { id } => {
            report(manager.delete_user(client, &id).await?, "user removed")?;
        }
    }
    Ok(())
}

pub async fn fields(
    client: &Client,
    campaign: Option<&str>,
    command: FieldCommand,
) -> Result<(), CliError> {
    let campaign = campaign.ok_or(CliError::MissingCampaign)?;
    let mut manager = CrmFieldManager::new();
    manager.refresh(client).await?;
    manager.select_campaign(campaign)?;

    match command {
        FieldCommand::List => {
            print_fields(manager.fields());
            return Ok(());
        }
        FieldCommand::Add(changes) => {
            let mut values = new_field_values(manager.fields().len());
            changes.apply(&mut values);
            let attrs = CrmFieldForm::parse(&values).map_err(ManagerError::from)?;
            report(manager.add_field(client, attrs).await?, "field added")?;
        }
        FieldCommand::Edit { id, changes } => {
            let field = manager
                .fields()
                .iter()
                .find(|field| field.id == id)
                .ok_or_else(|| ManagerError::RecordNotFound(id.clone()))?;
            let mut values = CrmFieldForm::from_field(field);
            changes.apply(&mut values);
            let attrs = CrmFieldForm::parse(&values).map_err(ManagerError::from)?;
            report(manager.edit_field(client, &id, attrs).await?, "field updated")?;
        }
        FieldCommand::Delete { id } => {
            report(manager.delete_field(client, &id).await?, "field removed")?;
        }
    }

    print_fields(manager.fields());
    Ok(())
}

fn print_users(users: &[User]) {
    if users.is_empty() {
        println!("no users");
        return;
    }
    println!(
        "{:<12} {:<24} {:<11} {:<32} MOBILE",
        "ID", "NAME", "ROLE", "CRM EMAIL"
    );
    for user in users {
        println!(
            "{:<12} {:<24} {:<11} {:<32} {}",
            user.id,
            user.username,
            user.role.as_str(),
            user.crm_email,
            user.agent_mobile
        );
    }
}

fn print_fields(fields: &[CrmField]) {
    if fields.is_empty() {
        println!("no fields");
        return;
    }
    println!(
        "{:<4} {:<24} {:<28} {:<10} {:<9} READ ONLY",
        "POS", "ID", "CAPTION", "TYPE", "REQUIRED"
    );
    for field in fields {
        println!(
            "{:<4} {:<24} {:<28} {:<10} {:<9} {}",
            field.position,
            field.id,
            field.caption,
            field.field_type.as_str(),
            yes_no(field.required),
            yes_no(field.read_only)
        );
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_given_user_flags_override() {
        let mut values = FormValues::new()
            .with("name", "Ada")
            .with("role", "agent");
        UserFields {
            role: Some("supervisor".to_string()),
            ..UserFields::default()
        }
        .apply(&mut values);
        assert_eq!(values.get("name"), "Ada");
        assert_eq!(values.get("role"), "supervisor");
    }

    #[test]
    fn new_field_defaults_to_next_position() {
        let mut values = new_field_values(2);
        FieldFields {
            caption: Some("Email".to_string()),
            ..FieldFields::default()
        }
        .apply(&mut values);

        let attrs = CrmFieldForm::parse(&values).unwrap();
        assert_eq!(attrs.position, 3);
        assert!(!attrs.required);
    }

    #[test]
    fn rejected_outcome_is_an_error() {
        let err = report(MutationOutcome::Rejected("duplicate".to_string()), "ok").unwrap_err();
        assert_eq!(err.to_string(), "rejected by the server: duplicate");
    }
}
