use std::{io, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use dashboard::{
    AuthError, AuthFlow, Client, ClientError, Credentials, FileSessionStore, ManagerError,
    Settings, SettingsError,
};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

mod commands;
mod prompt;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Manager(#[from] ManagerError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("not logged in, run `crmdesk_admin login --email <EMAIL>` first")]
    NotLoggedIn,
    #[error("missing --campaign <NAME>")]
    MissingCampaign,
    #[error("rejected by the server: {0}")]
    Rejected(String),
    #[error("interrupted")]
    Interrupted,
}

#[derive(Parser, Debug)]
#[command(name = "crmdesk_admin")]
#[command(about = "Manage users and CRM fields of the CRM admin backend")]
struct Cli {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    config: Option<String>,
    /// Override backend base URL.
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Override where the login session is stored.
    #[arg(long, global = true)]
    session_path: Option<String>,
    /// Override log level.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the session. The password is read from
    /// `CRMDESK_PASSWORD` or prompted for.
    Login(LoginArgs),
    /// Forget the stored session.
    Logout,
    /// Manage agent users.
    Users {
        #[command(subcommand)]
        command: commands::UserCommand,
    },
    /// Manage the CRM fields of a campaign.
    Fields(FieldsArgs),
}

#[derive(Args, Debug)]
struct LoginArgs {
    #[arg(long)]
    email: String,
}

#[derive(Args, Debug)]
struct FieldsArgs {
    /// Campaign name.
    #[arg(long, global = true)]
    campaign: Option<String>,
    #[command(subcommand)]
    command: commands::FieldCommand,
}

impl Cli {
    fn settings(&self) -> Result<Settings, CliError> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(base_url) = &self.base_url {
            settings.base_url = base_url.clone();
        }
        if let Some(session_path) = &self.session_path {
            settings.session_path = session_path.clone();
        }
        if let Some(log_level) = &self.log_level {
            settings.log_level = log_level.clone();
        }
        Ok(settings)
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("crmdesk_admin={level},dashboard={level}"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let settings = cli.settings()?;
    init_logging(&settings.log_level);

    let client = Client::new(&settings.base_url)?;
    let store = FileSessionStore::new(&settings.session_path);
    let mut auth = AuthFlow::new(client, settings.auth_mode()?, store);

    match cli.command {
        Command::Login(args) => {
            let password = match std::env::var("CRMDESK_PASSWORD") {
                Ok(password) => password,
                Err(_) => prompt::secret("Password: ")?,
            };
            let session = auth
                .submit_login(&Credentials::new(args.email, password), |_| {})
                .await?;
            println!("logged in as {}", session.identity.display_name());
        }
        Command::Logout => {
            auth.logout(|_| {}).await?;
            println!("logged out");
        }
        Command::Users { command } => {
            require_session(&mut auth)?;
            commands::users(auth.client(), command).await?;
        }
        Command::Fields(args) => {
            require_session(&mut auth)?;
            commands::fields(auth.client(), args.campaign.as_deref(), args.command).await?;
        }
    }

    Ok(())
}

fn require_session(auth: &mut AuthFlow<FileSessionStore>) -> Result<(), CliError> {
    match auth.bootstrap()? {
        Some(_) => Ok(()),
        None => Err(CliError::NotLoggedIn),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Client(ClientError::Unauthorized))
        | Err(CliError::Manager(ManagerError::Client(ClientError::Unauthorized))) => {
            eprintln!("session expired, log in again");
            ExitCode::from(3)
        }
        Err(err @ (CliError::Rejected(_) | CliError::Manager(ManagerError::Invalid(_)))) => {
            eprintln!("{err}");
            ExitCode::from(2)
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
