//! Client-side core of the CRM admin dashboard.
//!
//! The crate is UI agnostic: it owns the session, the login flow and the
//! user and CRM field collections, and talks to the backend over HTTP. The
//! terminal dashboard and the admin CLI are thin layers on top of it.

pub mod auth;
pub mod client;
pub mod crm_fields;
pub mod error;
pub mod mutation;
pub mod session;
pub mod settings;
pub mod users;
pub mod validation;

pub use auth::{AuthError, AuthFlow, AuthMode, AuthState, Credentials, Route};
pub use client::{Client, ClientError};
pub use crm_fields::{CrmFieldManager, FieldChange};
pub use error::ManagerError;
pub use mutation::MutationOutcome;
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionError, SessionStorage};
pub use settings::{Settings, SettingsError};
pub use users::{UserChange, UserManager};
pub use validation::{CrmFieldForm, FormValues, UserForm, ValidationErrors};

pub mod types {
    pub use api_types::{
        auth::Identity,
        crm::{Campaign, CrmConfiguration, CrmField, CrmFieldAttrs, FieldType},
        users::{User, UserAttrs, UserRole, UsersSnapshot},
    };
}
