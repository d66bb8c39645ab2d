//! Listing generated flags

use colored::Colorize;
use scope_core::Registry;

use crate::binder::flag_specs;
use crate::error::Result;

/// Run the flags command
pub fn run_flags(registry: &Registry) -> Result<()> {
    let specs = flag_specs(registry)?;
    if specs.is_empty() {
        println!("No tracked keys. Declare scopes with {}.", "--defaults <FILE>".cyan());
        return Ok(());
    }

    for spec in &specs {
        let default = spec
            .default
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default();
        println!(
            "  --{:<30} {:<24} {}",
            spec.flag.green(),
            spec.kind.to_string(),
            default.dimmed()
        );
    }
    println!();
    println!("{} {} flags", "Total:".dimmed(), specs.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_runs_on_empty_registry() {
        assert!(run_flags(&Registry::new()).is_ok());
    }
}
