//! Shared pieces of the subcommands.

use anyhow::{Context, Result};
use serde::Serialize;
use std::future::Future;

use crate::service::Forge;

/// A subcommand that runs against a loaded [`Forge`].
pub trait ForgeCommand {
    /// Run the command.
    fn execute(self, forge: &Forge) -> impl Future<Output = Result<()>>;
}

/// Parse a `KEY=VALUE` argument. The value may be empty and may contain `=`.
pub fn parse_key_value(arg: &str) -> Result<(String, String), String> {
    let (key, value) =
        arg.split_once('=').ok_or_else(|| format!("expected KEY=VALUE, got '{arg}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{arg}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(parse_key_value("API_KEY=abc").unwrap(), ("API_KEY".to_string(), "abc".to_string()));
        assert_eq!(parse_key_value("K=a=b").unwrap().1, "a=b");
        assert_eq!(parse_key_value(" K =").unwrap(), ("K".to_string(), String::new()));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }
}
