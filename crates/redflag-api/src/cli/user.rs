//! Account administration commands.

use anyhow::Result;
use console::style;

use crate::state::AppState;

/// Create a regular account. The verification email goes through the
/// configured mailer.
pub async fn create_user(state: &AppState, email: &str, password: &str, json: bool) -> Result<()> {
    let grant = state.auth_service.register(email, password).await?;
    // The CLI has no use for the login session register opens.
    state.auth_service.logout(&grant.token).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&grant.user)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Created user {}",
        style("✓").green().bold(),
        style(&grant.user.email).cyan()
    );
    println!("  {}", style(format!("id: {}", grant.user.id)).dim());
    println!(
        "  {}",
        style("A verification link was sent to the address.").dim()
    );
    println!();
    Ok(())
}
