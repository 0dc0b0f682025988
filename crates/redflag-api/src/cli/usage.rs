//! Usage counter inspection.

use anyhow::{Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use crate::state::AppState;

pub async fn show_usage(state: &AppState, email: &str, json: bool) -> Result<()> {
    let Some(user) = state.auth_service.find_user(email).await? else {
        bail!("no user with email '{email}'");
    };
    let snapshot = state.usage_service.snapshot(&user).await?;

    if json {
        let out = serde_json::json!({
            "email": user.email,
            "user_type": user.user_type,
            "usage": snapshot,
            "remaining_today": snapshot.remaining_today(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Window").fg(Color::White),
        Cell::new("Used").fg(Color::White),
        Cell::new("Limit").fg(Color::White),
        Cell::new("Resets").fg(Color::White),
    ]);

    let used_color = |used: u32, limit: u32| if used >= limit { Color::Red } else { Color::Green };
    table.add_row(vec![
        Cell::new("Today"),
        Cell::new(snapshot.used_today).fg(used_color(snapshot.used_today, snapshot.daily_limit)),
        Cell::new(snapshot.daily_limit),
        Cell::new(snapshot.day_resets_at.format("%Y-%m-%d %H:%M UTC")),
    ]);
    table.add_row(vec![
        Cell::new("This month"),
        Cell::new(snapshot.used_this_month)
            .fg(used_color(snapshot.used_this_month, snapshot.monthly_limit)),
        Cell::new(snapshot.monthly_limit),
        Cell::new(snapshot.month_resets_at.format("%Y-%m-%d %H:%M UTC")),
    ]);

    println!();
    println!(
        "  Usage for {} ({})",
        style(&user.email).cyan(),
        user.user_type
    );
    println!("{table}");
    println!(
        "  {} analyses remaining today",
        style(snapshot.remaining_today()).bold()
    );
    println!();
    Ok(())
}
