//! User collection of the admin.
//!
//! Unlike CRM fields, user mutations answer with a single record, so the
//! list is reconciled record by record: the record the server sent back
//! replaces the local one as a whole.

use api_types::{
    envelope::Envelope,
    users::{User, UserAttrs, UsersSnapshot},
};

use crate::{
    client::{Client, ClientError},
    error::ManagerError,
    mutation::{InFlight, MutationOutcome, RecordKey, Ticket},
    validation::UserForm,
};

const USERS_SCOPE: &str = "users";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserChange {
    Rejected(String),
    Created(User),
    Updated(User),
    Removed,
}

impl UserChange {
    fn from_envelope(envelope: Envelope, build: fn(User) -> Self) -> Result<Self, ManagerError> {
        if envelope.is_rejection() {
            return Ok(Self::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "request refused by the server".to_string()),
            ));
        }
        let data = envelope
            .data
            .ok_or_else(|| ManagerError::UnexpectedResponse("missing data".to_string()))?;
        Ok(build(serde_json::from_value(data)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRequest {
    Register(UserAttrs),
    Edit { user_id: String, attrs: UserAttrs },
    Delete { user_id: String },
}

#[derive(Debug)]
pub struct PreparedUser {
    ticket: Ticket,
    admin_id: String,
    request: UserRequest,
}

impl PreparedUser {
    pub fn request(&self) -> &UserRequest {
        &self.request
    }

    pub async fn send(&self, client: &Client) -> Result<UserChange, ManagerError> {
        let admin = self.admin_id.as_str();
        let result = match &self.request {
            UserRequest::Register(attrs) => client
                .register_user(admin, attrs)
                .await
                .map(|envelope| UserChange::from_envelope(envelope, UserChange::Created)),
            UserRequest::Edit { user_id, attrs } => client
                .edit_user(admin, user_id, attrs)
                .await
                .map(|envelope| UserChange::from_envelope(envelope, UserChange::Updated)),
            UserRequest::Delete { user_id } => client
                .delete_user(admin, user_id)
                .await
                .map(|()| Ok(UserChange::Removed)),
        };

        match result {
            Ok(change) => change,
            Err(ClientError::Conflict(message)) => Ok(UserChange::Rejected(message)),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct UserManager {
    snapshot: Option<UsersSnapshot>,
    in_flight: InFlight,
}

impl UserManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, snapshot: UsersSnapshot) {
        tracing::debug!(users = snapshot.users.len(), "users loaded");
        self.snapshot = Some(snapshot);
        self.in_flight.mark_snapshot();
    }

    pub async fn refresh(&mut self, client: &Client) -> Result<(), ManagerError> {
        let snapshot = client.users().await?;
        self.load(snapshot);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn admin_id(&self) -> Option<&str> {
        self.snapshot.as_ref().map(|snapshot| snapshot.id.as_str())
    }

    pub fn users(&self) -> &[User] {
        self.snapshot
            .as_ref()
            .map(|snapshot| snapshot.users.as_slice())
            .unwrap_or(&[])
    }

    pub fn find(&self, user_id: &str) -> Option<&User> {
        self.users().iter().find(|user| user.id == user_id)
    }

    pub fn is_pending(&self, user_id: &str) -> bool {
        self.in_flight
            .is_pending(&RecordKey::Record(user_id.to_string()))
    }

    fn begin(&mut self, key: RecordKey, request: UserRequest) -> Result<PreparedUser, ManagerError> {
        let admin_id = self.admin_id().ok_or(ManagerError::NotLoaded)?.to_string();
        let ticket = self
            .in_flight
            .begin(key)
            .map_err(|key| ManagerError::Pending(key.to_string()))?;
        Ok(PreparedUser {
            ticket,
            admin_id,
            request,
        })
    }

    fn require(&self, user_id: &str) -> Result<(), ManagerError> {
        self.find(user_id)
            .map(|_| ())
            .ok_or_else(|| ManagerError::RecordNotFound(user_id.to_string()))
    }

    pub fn prepare_add(&mut self, attrs: UserAttrs) -> Result<PreparedUser, ManagerError> {
        UserForm::check(&attrs)?;
        self.begin(
            RecordKey::Create(USERS_SCOPE.to_string()),
            UserRequest::Register(attrs),
        )
    }

    pub fn prepare_edit(
        &mut self,
        user_id: &str,
        attrs: UserAttrs,
    ) -> Result<PreparedUser, ManagerError> {
        self.require(user_id)?;
        UserForm::check(&attrs)?;
        self.begin(
            RecordKey::Record(user_id.to_string()),
            UserRequest::Edit {
                user_id: user_id.to_string(),
                attrs,
            },
        )
    }

    pub fn prepare_delete(&mut self, user_id: &str) -> Result<PreparedUser, ManagerError> {
        self.require(user_id)?;
        self.begin(
            RecordKey::Record(user_id.to_string()),
            UserRequest::Delete {
                user_id: user_id.to_string(),
            },
        )
    }

    pub fn abandon(&mut self, prepared: PreparedUser) {
        self.in_flight.finish(&prepared.ticket);
    }

    pub fn apply(&mut self, prepared: PreparedUser, change: UserChange) -> MutationOutcome {
        self.in_flight.finish(&prepared.ticket);

        let Some(snapshot) = self.snapshot.as_mut() else {
            return MutationOutcome::Stale;
        };

        match (change, &prepared.request) {
            (UserChange::Rejected(message), _) => {
                tracing::info!(%message, "user mutation rejected");
                MutationOutcome::Rejected(message)
            }
            (UserChange::Created(user), _) => {
                tracing::info!(user = %user.id, "user registered");
                match snapshot.users.iter_mut().find(|u| u.id == user.id) {
                    Some(existing) => *existing = user,
                    None => snapshot.users.push(user),
                }
                MutationOutcome::Appended
            }
            (UserChange::Updated(user), UserRequest::Edit { user_id, .. }) => {
                // The edit may change the id itself, so match on the id the
                // request targeted.
                match snapshot.users.iter_mut().find(|u| &u.id == user_id) {
                    Some(existing) => {
                        tracing::info!(user = %user_id, "user updated");
                        *existing = user;
                        MutationOutcome::Updated
                    }
                    None => MutationOutcome::Stale,
                }
            }
            (UserChange::Removed, UserRequest::Delete { user_id }) => {
                tracing::info!(user = %user_id, "user removed");
                snapshot.users.retain(|u| &u.id != user_id);
                MutationOutcome::Removed
            }
            (change, request) => {
                tracing::warn!(?change, ?request, "response does not match request");
                MutationOutcome::Stale
            }
        }
    }

    async fn execute(
        &mut self,
        client: &Client,
        prepared: PreparedUser,
    ) -> Result<MutationOutcome, ManagerError> {
        match prepared.send(client).await {
            Ok(change) => Ok(self.apply(prepared, change)),
            Err(err) => {
                if err.is_retryable() {
                    tracing::warn!("user request failed: {err}");
                }
                self.abandon(prepared);
                Err(err)
            }
        }
    }

    pub async fn add_user(
        &mut self,
        client: &Client,
        attrs: UserAttrs,
    ) -> Result<MutationOutcome, ManagerError> {
        let prepared = self.prepare_add(attrs)?;
        self.execute(client, prepared).await
    }

    pub async fn edit_user(
        &mut self,
        client: &Client,
        user_id: &str,
        attrs: UserAttrs,
    ) -> Result<MutationOutcome, ManagerError> {
        let prepared = self.prepare_edit(user_id, attrs)?;
        self.execute(client, prepared).await
    }

    pub async fn delete_user(
        &mut self,
        client: &Client,
        user_id: &str,
    ) -> Result<MutationOutcome, ManagerError> {
        let prepared = self.prepare_delete(user_id)?;
        self.execute(client, prepared).await
    }
}

#[cfg(test)]
mod tests {
    use api_types::users::UserRole;

    use super::*;

    fn user(id: &str, name: &str) -> User {
        User {
            id: id.to_string(),
            username: name.to_string(),
            role: UserRole::Agent,
            crm_email: format!("{id}@crm.example"),
            crm_password: "secret".to_string(),
            agent_mobile: "5550100".to_string(),
        }
    }

    fn attrs(id: &str, name: &str) -> UserAttrs {
        UserAttrs {
            user_id: id.to_string(),
            name: name.to_string(),
            role: UserRole::Agent,
            crm_email: format!("{id}@crm.example"),
            crm_password: "secret".to_string(),
            agent_mobile: "5550100".to_string(),
        }
    }

    fn manager() -> UserManager {
        let mut manager = UserManager::new();
        manager.load(UsersSnapshot {
            id: "admin-1".to_string(),
            users: vec![user("u1", "Ada"), user("u2", "Grace")],
        });
        manager
    }

    #[test]
    fn mutations_need_a_loaded_snapshot() {
        let mut manager = UserManager::new();
        assert!(matches!(
            manager.prepare_add(attrs("u3", "Linus")),
            Err(ManagerError::NotLoaded)
        ));
    }

    #[test]
    fn duplicate_registration_leaves_list_untouched() {
        let mut manager = manager();
        let before = manager.users().to_vec();
        let prepared = manager.prepare_add(attrs("u1", "Ada")).unwrap();
        let outcome = manager.apply(
            prepared,
            UserChange::Rejected("user with this id is already registered".to_string()),
        );
        assert!(matches!(outcome, MutationOutcome::Rejected(_)));
        assert_eq!(manager.users(), before.as_slice());
    }

    #[test]
    fn registration_appends_returned_user() {
        let mut manager = manager();
        let prepared = manager.prepare_add(attrs("u3", "Linus")).unwrap();
        let outcome = manager.apply(prepared, UserChange::Created(user("u3", "Linus")));
        assert_eq!(outcome, MutationOutcome::Appended);
        assert_eq!(manager.users().len(), 3);
        assert_eq!(manager.users()[2].username, "Linus");
    }

    #[test]
    fn edit_replaces_record_in_place() {
        let mut manager = manager();
        let prepared = manager.prepare_edit("u1", attrs("u1", "Ada L.")).unwrap();
        let outcome = manager.apply(prepared, UserChange::Updated(user("u1", "Ada L.")));
        assert_eq!(outcome, MutationOutcome::Updated);
        assert_eq!(manager.users()[0].username, "Ada L.");
        assert_eq!(manager.users()[1].username, "Grace");
    }

    #[test]
    fn edit_that_renames_id_replaces_targeted_record() {
        let mut manager = manager();
        let prepared = manager.prepare_edit("u2", attrs("u9", "Grace")).unwrap();
        manager.apply(prepared, UserChange::Updated(user("u9", "Grace")));
        assert!(manager.find("u2").is_none());
        assert_eq!(manager.users()[1].id, "u9");
    }

    #[test]
    fn delete_removes_record() {
        let mut manager = manager();
        let prepared = manager.prepare_delete("u1").unwrap();
        assert!(manager.is_pending("u1"));
        let outcome = manager.apply(prepared, UserChange::Removed);
        assert_eq!(outcome, MutationOutcome::Removed);
        assert!(manager.find("u1").is_none());
        assert!(!manager.is_pending("u1"));
    }

    #[test]
    fn blank_attributes_are_refused_before_sending() {
        let mut manager = manager();
        let mut blank = attrs("u3", "Linus");
        blank.agent_mobile = String::new();
        let err = manager.prepare_add(blank).unwrap_err();
        let ManagerError::Invalid(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(errors.field("agentMobile"), Some("Please enter Agent Mobile"));
        assert!(manager.prepare_add(attrs("u3", "Linus")).is_ok());
    }

    #[test]
    fn unknown_user_cannot_be_edited() {
        let mut manager = manager();
        assert!(matches!(
            manager.prepare_edit("nope", attrs("nope", "X")),
            Err(ManagerError::RecordNotFound(_))
        ));
    }

    #[test]
    fn second_delete_while_first_in_flight_is_refused() {
        let mut manager = manager();
        let _first = manager.prepare_delete("u2").unwrap();
        assert!(matches!(
            manager.prepare_delete("u2"),
            Err(ManagerError::Pending(_))
        ));
    }
}
