//! Reading resolved values

use colored::Colorize;
use scope_core::Registry;

use crate::error::{CliError, Result};

/// Run the get command
pub fn run_get(registry: &Registry, scope: &str, key: &str) -> Result<()> {
    let node = registry
        .get(scope)
        .ok_or_else(|| CliError::user(format!("Unknown scope: {scope}")))?;
    println!("{}", node.resolved_lookup(key)?);
    Ok(())
}

/// Run the show command
pub fn run_show(registry: &Registry, scope: &str, json: bool) -> Result<()> {
    let node = registry
        .get(scope)
        .ok_or_else(|| CliError::user(format!("Unknown scope: {scope}")))?;
    let snapshot = node.snapshot()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("{}", node.name().bold());
    for (key, value) in &snapshot {
        let origin = if node.contains_local(key) {
            "local".green()
        } else {
            "inherited".dimmed()
        };
        println!("  {key:<20} {value}  ({origin})");
    }
    Ok(())
}
