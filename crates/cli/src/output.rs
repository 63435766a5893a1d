//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use warden_lib::{EscalationTier, ResourceState};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print rows as a rounded table, or a placeholder when there are none
pub fn print_table<T: Tabled>(rows: Vec<T>, empty_message: &str) {
    if rows.is_empty() {
        print_warning(empty_message);
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn color_tier(tier: EscalationTier) -> String {
    let label = tier.as_str();
    match tier {
        EscalationTier::Critical => label.red().bold().to_string(),
        EscalationTier::Warning => label.yellow().to_string(),
        EscalationTier::Info => label.blue().to_string(),
        EscalationTier::None => label.dimmed().to_string(),
    }
}

pub fn color_state(state: ResourceState) -> String {
    let label = state.as_str();
    match state {
        ResourceState::Running => label.green().to_string(),
        ResourceState::Pending | ResourceState::Stopping => label.yellow().to_string(),
        ResourceState::Stopped | ResourceState::Terminated => label.dimmed().to_string(),
        ResourceState::Unknown => label.red().to_string(),
    }
}

pub fn color_outcome(success: bool) -> String {
    if success {
        "ok".green().to_string()
    } else {
        "failed".red().bold().to_string()
    }
}

pub fn check_mark(value: bool) -> String {
    if value {
        "✓".to_string()
    } else {
        String::new()
    }
}

pub fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}
