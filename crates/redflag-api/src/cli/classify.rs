//! Local keyword classification of a file or stdin.

use std::path::Path;

use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use tokio::io::AsyncReadExt;

use redflag_core::analysis::classifier::classify;

async fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("failed to read stdin")?;
        return Ok(text);
    }
    tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("failed to read {}", input.display()))
}

pub async fn classify_input(input: &Path, json: bool) -> Result<()> {
    let text = read_input(input).await?;
    if text.trim().is_empty() {
        bail!("input is empty");
    }
    let classification = classify(&text);

    if json {
        println!("{}", serde_json::to_string_pretty(&classification)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Category").fg(Color::White),
        Cell::new("Score").fg(Color::White),
    ]);
    for (category, score) in &classification.scores {
        let cell = Cell::new(category.label());
        let cell = if *category == classification.category {
            cell.fg(Color::Cyan)
        } else {
            cell
        };
        table.add_row(vec![cell, Cell::new(score)]);
    }

    println!();
    println!(
        "  {} {} ({:.0}% confidence)",
        style("Category:").bold(),
        style(classification.category.label()).cyan(),
        classification.confidence * 100.0
    );
    println!("{table}");
    println!();
    Ok(())
}
