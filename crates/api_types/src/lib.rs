use serde::{Deserialize, Serialize};

pub mod envelope {
    use super::*;

    /// Body-level status the backend attaches to mutation responses.
    ///
    /// The HTTP status of these responses is usually 200 even when the
    /// mutation was refused, so the body status is what tells the outcome.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub enum ResponseStatus {
        Success,
        Failure,
        Duplicate,
        PositionsUpdated,
        #[serde(other)]
        Unknown,
    }

    /// Generic `{ status, message, data }` response body.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct Envelope {
        #[serde(default)]
        pub status: Option<ResponseStatus>,
        #[serde(default)]
        pub message: Option<String>,
        #[serde(default)]
        pub data: Option<serde_json::Value>,
    }

    impl Envelope {
        /// `true` when the body reports a refused mutation.
        pub fn is_rejection(&self) -> bool {
            matches!(
                self.status,
                Some(ResponseStatus::Failure | ResponseStatus::Duplicate)
            )
        }
    }

    /// Error body returned with non-2xx statuses. Some endpoints use
    /// `error`, others `message`; a few send both.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ErrorBody {
        #[serde(default)]
        pub error: Option<String>,
        #[serde(default)]
        pub message: Option<String>,
    }

    impl ErrorBody {
        pub fn into_message(self) -> Option<String> {
            self.error.or(self.message)
        }
    }
}

pub mod auth {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct LoginRequest {
        pub email: String,
        pub password: String,
    }

    /// Body expected by the federated identity provider.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct FederatedLoginRequest {
        pub email: String,
        pub password: String,
        pub return_secure_token: bool,
    }

    /// Identity payload returned by a login backend.
    ///
    /// Only a few fields are interpreted; everything else the backend sends
    /// is kept in `extra` so the stored session is a faithful copy.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct Identity {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub email: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub username: Option<String>,
        #[serde(default, alias = "idToken", skip_serializing_if = "Option::is_none")]
        pub token: Option<String>,
        #[serde(flatten)]
        pub extra: serde_json::Map<String, serde_json::Value>,
    }

    impl Identity {
        /// Human readable label for the info bar and CLI output.
        pub fn display_name(&self) -> &str {
            self.username
                .as_deref()
                .or(self.email.as_deref())
                .unwrap_or("admin")
        }
    }
}

pub mod crm {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum FieldType {
        Text,
        Number,
        Email,
        Phone,
        Date,
        Dropdown,
        Checkbox,
    }

    impl FieldType {
        pub const ALL: [FieldType; 7] = [
            Self::Text,
            Self::Number,
            Self::Email,
            Self::Phone,
            Self::Date,
            Self::Dropdown,
            Self::Checkbox,
        ];

        /// Returns the canonical string used on the wire.
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Text => "text",
                Self::Number => "number",
                Self::Email => "email",
                Self::Phone => "phone",
                Self::Date => "date",
                Self::Dropdown => "dropdown",
                Self::Checkbox => "checkbox",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            let value = value.trim();
            Self::ALL
                .into_iter()
                .find(|kind| kind.as_str().eq_ignore_ascii_case(value))
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CrmField {
        #[serde(alias = "_id")]
        pub id: String,
        pub caption: String,
        #[serde(rename = "type")]
        pub field_type: FieldType,
        pub required: bool,
        pub read_only: bool,
        /// 1-based display ordinal within the campaign.
        pub position: u32,
    }

    /// The five mutable attributes of a CRM field, sent on create and edit.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CrmFieldAttrs {
        pub caption: String,
        #[serde(rename = "type")]
        pub field_type: FieldType,
        pub required: bool,
        pub read_only: bool,
        pub position: u32,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Campaign {
        #[serde(alias = "_id")]
        pub id: String,
        pub campaign_name: String,
        #[serde(default)]
        pub crm_fields: Vec<CrmField>,
    }

    /// Response of `GET /crm-configuration`.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CrmConfiguration {
        /// Admin id scoping every mutation route.
        #[serde(alias = "_id")]
        pub id: String,
        #[serde(default)]
        pub campaigns: Vec<Campaign>,
    }
}

pub mod users {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum UserRole {
        Admin,
        Supervisor,
        Agent,
    }

    impl UserRole {
        pub const ALL: [UserRole; 3] = [Self::Admin, Self::Supervisor, Self::Agent];

        pub fn as_str(self) -> &'static str {
            match self {
                Self::Admin => "admin",
                Self::Supervisor => "supervisor",
                Self::Agent => "agent",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            let value = value.trim();
            Self::ALL
                .into_iter()
                .find(|role| role.as_str().eq_ignore_ascii_case(value))
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct User {
        #[serde(alias = "_id")]
        pub id: String,
        pub username: String,
        pub role: UserRole,
        pub crm_email: String,
        pub crm_password: String,
        pub agent_mobile: String,
    }

    /// Request body for registering or editing a user.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UserAttrs {
        pub user_id: String,
        pub name: String,
        pub role: UserRole,
        pub crm_email: String,
        pub crm_password: String,
        pub agent_mobile: String,
    }

    /// Response of `GET /users`.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct UsersSnapshot {
        /// Admin id scoping every mutation route.
        #[serde(alias = "_id")]
        pub id: String,
        #[serde(default)]
        pub users: Vec<User>,
    }
}
