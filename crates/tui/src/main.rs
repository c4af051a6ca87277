mod app;
mod config;
mod error;
mod logging;
mod ui;

use crate::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = config::load()?;
    logging::init(&settings)?;
    tracing::info!(base_url = %settings.base_url, "starting crmdesk_tui");

    let mut app = app::App::new(&settings)?;
    app.run().await?;
    Ok(())
}
