mod form;

pub use form::{FormInput, FormKind, FormState};

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use dashboard::{
    AuthError, AuthFlow, Client, ClientError, CrmFieldForm, CrmFieldManager, Credentials,
    FileSessionStore, ManagerError, MutationOutcome, Route, Settings, UserForm, UserManager,
    ValidationErrors,
    types::{CrmField, User},
};

use crate::{
    error::{AppError, Result},
    ui::{
        self,
        keymap::{AppAction, map_key},
    },
};

const TOAST_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Shell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Users,
    Crm,
}

impl Section {
    pub const ALL: [Section; 2] = [Self::Users, Self::Crm];

    pub fn label(self) -> &'static str {
        match self {
            Self::Users => "Users",
            Self::Crm => "CRM Configuration",
        }
    }

    pub fn shortcut(self) -> char {
        match self {
            Self::Users => 'u',
            Self::Crm => 'c',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Email,
    Password,
}

#[derive(Debug)]
pub struct LoginState {
    pub email: String,
    pub password: String,
    pub focus: LoginField,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct ToastState {
    pub message: String,
    pub level: ToastLevel,
    pub expires_at: Instant,
}

#[derive(Debug, Clone, Copy)]
pub struct ConnectionState {
    pub ok: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    User { id: String, name: String },
    Field { id: String, caption: String },
}

impl DeleteTarget {
    pub fn prompt(&self) -> String {
        match self {
            Self::User { id, name } => format!("Delete user {name} ({id})?"),
            Self::Field { caption, .. } => format!("Delete CRM field \"{caption}\"?"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Modal {
    Form(FormState),
    ConfirmDelete(DeleteTarget),
}

/// Work that failed because the backend was unreachable and can be re-run
/// with `r`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RetryAction {
    Refresh,
    Delete(DeleteTarget),
}

#[derive(Debug)]
pub struct AppState {
    pub screen: Screen,
    pub login: LoginState,
    pub section: Section,
    pub users: UserManager,
    pub crm: CrmFieldManager,
    pub user_selected: usize,
    pub field_selected: usize,
    pub modal: Option<Modal>,
    pub toast: Option<ToastState>,
    pub connection: ConnectionState,
    pub last_refresh: Option<DateTime<Local>>,
    pub base_url: String,
    pub identity: Option<String>,
    retry: Option<RetryAction>,
}

impl AppState {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            screen: Screen::Login,
            login: LoginState {
                email: String::new(),
                password: String::new(),
                focus: LoginField::Email,
                message: None,
            },
            section: Section::Users,
            users: UserManager::new(),
            crm: CrmFieldManager::new(),
            user_selected: 0,
            field_selected: 0,
            modal: None,
            toast: None,
            connection: ConnectionState { ok: true },
            last_refresh: None,
            base_url: base_url.into(),
            identity: None,
            retry: None,
        }
    }

    pub fn notify(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toast = Some(ToastState {
            message: message.into(),
            level,
            expires_at: Instant::now() + TOAST_TTL,
        });
    }

    pub fn expire_toast(&mut self, now: Instant) {
        if self.toast.as_ref().is_some_and(|toast| toast.expires_at <= now) {
            self.toast = None;
        }
    }

    pub fn has_retry(&self) -> bool {
        self.retry.is_some()
    }

    pub fn selected_user(&self) -> Option<&User> {
        self.users.users().get(self.user_selected)
    }

    pub fn selected_field(&self) -> Option<&CrmField> {
        self.crm.fields().get(self.field_selected)
    }

    fn move_selection(&mut self, down: bool) {
        let (selected, len) = match self.section {
            Section::Users => (&mut self.user_selected, self.users.users().len()),
            Section::Crm => (&mut self.field_selected, self.crm.fields().len()),
        };
        if len == 0 {
            *selected = 0;
        } else if down {
            *selected = (*selected + 1).min(len - 1);
        } else {
            *selected = selected.saturating_sub(1);
        }
    }

    /// Keeps the cursors inside the lists after they shrank.
    fn clamp_selection(&mut self) {
        let users = self.users.users().len();
        let fields = self.crm.fields().len();
        self.user_selected = self.user_selected.min(users.saturating_sub(1));
        self.field_selected = self.field_selected.min(fields.saturating_sub(1));
    }

    /// Selects the first campaign when nothing (or a vanished campaign) is
    /// selected.
    fn ensure_campaign(&mut self) {
        if self.crm.selected_campaign().is_some() {
            return;
        }
        let Some(first) = self.crm.campaign_names().first().map(|name| name.to_string()) else {
            return;
        };
        if let Err(err) = self.crm.select_campaign(&first) {
            self.notify(ToastLevel::Error, err.to_string());
        }
        self.field_selected = 0;
    }

    pub fn cycle_campaign(&mut self, forward: bool) {
        let names: Vec<String> = self
            .crm
            .campaign_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            self.notify(ToastLevel::Info, "No campaigns configured");
            return;
        }

        let current = self
            .crm
            .selected_campaign()
            .and_then(|campaign| names.iter().position(|name| *name == campaign.campaign_name));
        let len = names.len();
        let next = match current {
            None => 0,
            Some(index) if forward => (index + 1) % len,
            Some(index) => index.checked_sub(1).unwrap_or(len - 1),
        };

        match self.crm.select_campaign(&names[next]) {
            Ok(_) => self.field_selected = 0,
            Err(err) => self.notify(ToastLevel::Error, err.to_string()),
        }
    }

    fn open_add_form(&mut self) {
        let form = match self.section {
            Section::Users => {
                if !self.users.is_loaded() {
                    return self.notify(ToastLevel::Info, "Users are not loaded yet");
                }
                FormState::add_user()
            }
            Section::Crm => {
                if self.crm.selected_campaign().is_none() {
                    return self.notify(ToastLevel::Info, "Select a campaign first");
                }
                FormState::add_field(self.crm.fields().len())
            }
        };
        self.modal = Some(Modal::Form(form));
    }

    fn open_edit_form(&mut self) {
        let form = match self.section {
            Section::Users => self.selected_user().map(FormState::edit_user),
            Section::Crm => self.selected_field().map(FormState::edit_field),
        };
        match form {
            Some(form) => self.modal = Some(Modal::Form(form)),
            None => self.notify(ToastLevel::Info, "Nothing selected"),
        }
    }

    fn open_delete_confirm(&mut self) {
        let target = match self.section {
            Section::Users => self.selected_user().map(|user| DeleteTarget::User {
                id: user.id.clone(),
                name: user.username.clone(),
            }),
            Section::Crm => self.selected_field().map(|field| DeleteTarget::Field {
                id: field.id.clone(),
                caption: field.caption.clone(),
            }),
        };
        match target {
            Some(target) => self.modal = Some(Modal::ConfirmDelete(target)),
            None => self.notify(ToastLevel::Info, "Nothing selected"),
        }
    }

    fn clear_session(&mut self) {
        self.screen = Screen::Login;
        self.users = UserManager::new();
        self.crm = CrmFieldManager::new();
        self.user_selected = 0;
        self.field_selected = 0;
        self.modal = None;
        self.identity = None;
        self.retry = None;
        self.last_refresh = None;
        self.login.password.clear();
    }
}

pub struct App {
    auth: AuthFlow<FileSessionStore>,
    pub state: AppState,
    should_quit: bool,
}

impl App {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::new(&settings.base_url)?;
        let store = FileSessionStore::new(&settings.session_path);
        let auth = AuthFlow::new(client, settings.auth_mode()?, store);

        Ok(Self {
            auth,
            state: AppState::new(settings.base_url.clone()),
            should_quit: false,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        self.restore_session().await;

        let mut terminal = ui::setup_terminal()?;
        let result = self.event_loop(&mut terminal).await;
        ui::restore_terminal(&mut terminal)?;
        result
    }

    async fn event_loop(&mut self, terminal: &mut ui::Terminal) -> Result<()> {
        let tick_rate = Duration::from_millis(200);

        while !self.should_quit {
            self.state.expire_toast(Instant::now());
            terminal
                .draw(|frame| ui::render(frame, &self.state))
                .map_err(|err| AppError::Terminal(err.to_string()))?;

            if event::poll(tick_rate)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn restore_session(&mut self) {
        let name = match self.auth.bootstrap() {
            Ok(Some(session)) => session.identity.display_name().to_string(),
            Ok(None) => return,
            Err(err) => {
                tracing::warn!("could not restore session: {err}");
                return;
            }
        };
        self.state.identity = Some(name);
        self.state.screen = Screen::Shell;
        self.reload().await;
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        let editing = matches!(self.state.modal, Some(Modal::Form(_)));
        let confirming = matches!(self.state.modal, Some(Modal::ConfirmDelete(_)));
        let login = self.state.screen == Screen::Login;

        let action = map_key(key, login || editing);
        if action == AppAction::Quit {
            self.should_quit = true;
            return;
        }

        if login {
            self.handle_login_key(action).await;
        } else if editing {
            self.handle_form_key(action).await;
        } else if confirming {
            self.handle_confirm_key(action).await;
        } else {
            self.handle_shell_key(action).await;
        }
    }

    async fn handle_login_key(&mut self, action: AppAction) {
        let login = &mut self.state.login;
        match action {
            AppAction::NextField | AppAction::PrevField | AppAction::Up | AppAction::Down => {
                login.focus = match login.focus {
                    LoginField::Email => LoginField::Password,
                    LoginField::Password => LoginField::Email,
                };
            }
            AppAction::Input(ch) => match login.focus {
                LoginField::Email => login.email.push(ch),
                LoginField::Password => login.password.push(ch),
            },
            AppAction::Backspace => {
                match login.focus {
                    LoginField::Email => login.email.pop(),
                    LoginField::Password => login.password.pop(),
                };
            }
            AppAction::Cancel => {
                login.message = None;
                self.auth.reset_failure_flag();
            }
            AppAction::Submit => self.attempt_login().await,
            _ => {}
        }
    }

    async fn attempt_login(&mut self) {
        let credentials = Credentials::new(
            self.state.login.email.trim(),
            self.state.login.password.as_str(),
        );

        let mut route = None;
        let result = self
            .auth
            .submit_login(&credentials, |to| route = Some(to))
            .await;

        match result {
            Ok(session) => {
                self.state.identity = Some(session.identity.display_name().to_string());
                self.state.login.password.clear();
                self.state.login.message = None;
            }
            Err(err) => {
                self.state.login.message = Some(login_message_for_error(&err));
            }
        }

        if route == Some(Route::Landing) {
            self.state.screen = Screen::Shell;
            self.state.section = Section::Users;
            self.reload().await;
        }
    }

    async fn handle_shell_key(&mut self, action: AppAction) {
        match action {
            AppAction::Up => self.state.move_selection(false),
            AppAction::Down => self.state.move_selection(true),
            AppAction::Cancel => self.state.toast = None,
            AppAction::Input(ch) => match ch {
                'u' => self.state.section = Section::Users,
                'c' => self.state.section = Section::Crm,
                'j' => self.state.move_selection(true),
                'k' => self.state.move_selection(false),
                'a' => self.state.open_add_form(),
                'e' => self.state.open_edit_form(),
                'd' => self.state.open_delete_confirm(),
                '[' if self.state.section == Section::Crm => self.state.cycle_campaign(false),
                ']' if self.state.section == Section::Crm => self.state.cycle_campaign(true),
                'r' => self.retry_or_reload().await,
                'L' => self.logout().await,
                _ => {}
            },
            _ => {}
        }
    }

    async fn handle_form_key(&mut self, action: AppAction) {
        let Some(Modal::Form(form)) = self.state.modal.as_mut() else {
            return;
        };
        match action {
            AppAction::NextField | AppAction::Down => form.focus_next(),
            AppAction::PrevField | AppAction::Up => form.focus_prev(),
            AppAction::Left => form.cycle(false),
            AppAction::Right => form.cycle(true),
            AppAction::Input(ch) => form.push_char(ch),
            AppAction::Backspace => form.backspace(),
            AppAction::Cancel => self.state.modal = None,
            AppAction::Submit => self.submit_form().await,
            _ => {}
        }
    }

    async fn handle_confirm_key(&mut self, action: AppAction) {
        match action {
            AppAction::Submit | AppAction::Input('y') => {
                if let Some(Modal::ConfirmDelete(target)) = self.state.modal.take() {
                    self.delete(target).await;
                }
            }
            AppAction::Cancel | AppAction::Input('n') => self.state.modal = None,
            _ => {}
        }
    }

    async fn reload(&mut self) {
        let client = self.auth.client();
        let users = self.state.users.refresh(client).await;
        let crm = self.state.crm.refresh(client).await;

        match users.and(crm) {
            Ok(()) => {
                self.state.connection.ok = true;
                self.state.retry = None;
                self.state.last_refresh = Some(Local::now());
                self.state.ensure_campaign();
                self.state.clamp_selection();
            }
            Err(err) => self.report(err, Some(RetryAction::Refresh)).await,
        }
    }

    async fn retry_or_reload(&mut self) {
        match self.state.retry.take() {
            Some(RetryAction::Delete(target)) => self.delete(target).await,
            Some(RetryAction::Refresh) | None => self.reload().await,
        }
    }

    async fn send_form(&mut self, form: &FormState) -> std::result::Result<MutationOutcome, ManagerError> {
        let client = self.auth.client();
        match &form.kind {
            FormKind::AddUser => {
                let attrs = UserForm::parse(&form.values)?;
                self.state.users.add_user(client, attrs).await
            }
            FormKind::EditUser { user_id } => {
                let attrs = UserForm::parse(&form.values)?;
                self.state.users.edit_user(client, user_id, attrs).await
            }
            FormKind::AddField => {
                let attrs = CrmFieldForm::parse(&form.values)?;
                self.state.crm.add_field(client, attrs).await
            }
            FormKind::EditField { field_id } => {
                let attrs = CrmFieldForm::parse(&form.values)?;
                self.state.crm.edit_field(client, field_id, attrs).await
            }
        }
    }

    async fn submit_form(&mut self) {
        let Some(Modal::Form(mut form)) = self.state.modal.take() else {
            return;
        };

        match self.send_form(&form).await {
            Ok(MutationOutcome::Rejected(message)) => {
                form.set_banner(message);
                self.state.modal = Some(Modal::Form(form));
            }
            Ok(MutationOutcome::Stale) => {
                self.state
                    .notify(ToastLevel::Info, "Ignored an outdated server response");
            }
            Ok(_) => {
                self.state.connection.ok = true;
                self.state.clamp_selection();
                self.state
                    .notify(ToastLevel::Success, success_message(&form.kind));
            }
            Err(ManagerError::Invalid(errors)) => {
                form.set_errors(errors);
                self.state.modal = Some(Modal::Form(form));
            }
            Err(err @ ManagerError::PositionOutOfRange { .. }) => {
                let mut errors = ValidationErrors::default();
                errors.insert("position", err.to_string());
                form.set_errors(errors);
                self.state.modal = Some(Modal::Form(form));
            }
            Err(ManagerError::Client(ClientError::Unauthorized)) => self.session_expired().await,
            Err(err) => {
                if err.is_retryable() {
                    self.state.connection.ok = false;
                    form.set_banner(format!("{err}. Press Enter to retry"));
                } else {
                    form.set_banner(err.to_string());
                }
                self.state.modal = Some(Modal::Form(form));
            }
        }
    }

    async fn delete(&mut self, target: DeleteTarget) {
        let client = self.auth.client();
        let result = match &target {
            DeleteTarget::User { id, .. } => self.state.users.delete_user(client, id).await,
            DeleteTarget::Field { id, .. } => self.state.crm.delete_field(client, id).await,
        };

        match result {
            Ok(MutationOutcome::Rejected(message)) => self.state.notify(ToastLevel::Error, message),
            Ok(MutationOutcome::Stale) => {
                self.state
                    .notify(ToastLevel::Info, "Ignored an outdated server response");
            }
            Ok(_) => {
                self.state.connection.ok = true;
                self.state.clamp_selection();
                let message = match target {
                    DeleteTarget::User { .. } => "User removed",
                    DeleteTarget::Field { .. } => "Field removed",
                };
                self.state.notify(ToastLevel::Success, message);
            }
            Err(err) => self.report(err, Some(RetryAction::Delete(target))).await,
        }
    }

    async fn report(&mut self, err: ManagerError, retry: Option<RetryAction>) {
        if matches!(err, ManagerError::Client(ClientError::Unauthorized)) {
            return self.session_expired().await;
        }
        if err.is_retryable() {
            self.state.connection.ok = false;
            self.state.retry = retry;
            self.state
                .notify(ToastLevel::Error, format!("{err}. Press r to retry"));
            return;
        }
        self.state.notify(ToastLevel::Error, err.to_string());
    }

    async fn session_expired(&mut self) {
        tracing::info!("backend rejected the session");
        self.logout().await;
        self.state.login.message = Some("Session expired, please log in again".to_string());
    }

    async fn logout(&mut self) {
        let mut route = None;
        if let Err(err) = self.auth.logout(|to| route = Some(to)).await {
            tracing::warn!("failed to clear stored session: {err}");
        }
        self.state.clear_session();
        if route == Some(Route::Login) {
            self.state.screen = Screen::Login;
            self.state.login.focus = LoginField::Email;
        }
    }
}

fn success_message(kind: &FormKind) -> &'static str {
    match kind {
        FormKind::AddUser => "User added",
        FormKind::EditUser { .. } => "User updated",
        FormKind::AddField => "Field added",
        FormKind::EditField { .. } => "Field updated",
    }
}

fn login_message_for_error(err: &AuthError) -> String {
    match err {
        AuthError::Client(ClientError::Transport(err)) => format!("Server unreachable: {err}"),
        AuthError::Client(ClientError::Server(message)) => format!("Server error: {message}"),
        other => other.to_string(),
    }
}
