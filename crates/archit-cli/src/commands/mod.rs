//! CLI command implementations.

pub mod plan;
pub mod provision;

use anyhow::{Context, Result};
use archit_config::{VariableContext, VariableContextBuilder, load_architecture};
use archit_core::config::ArchitectureConfig;

use crate::DocumentArgs;

/// Parse a `NAME=VALUE` pair given to `--var`.
pub fn parse_var(raw: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in '{}'", raw));
    }
    Ok((name.to_string(), value.to_string()))
}

fn variables(args: &DocumentArgs) -> VariableContext {
    args.vars
        .iter()
        .fold(VariableContextBuilder::new().with_process_env(), |builder, (name, value)| {
            builder.with_custom(name, value)
        })
        .build()
}

/// Load and decode the document named by `args`.
pub fn load(args: &DocumentArgs) -> Result<ArchitectureConfig> {
    load_architecture(&args.path, &variables(args))
        .with_context(|| format!("Failed to load {}", args.path.display()))
}

pub fn validate(args: &DocumentArgs) -> Result<()> {
    let config = load(args)?;
    println!(
        "Configuration is valid: {} service(s){}{}",
        config.services.services.len(),
        if config.site.is_some() { ", a site" } else { "" },
        match &config.pipeline {
            Some(pipeline) => format!(", architecture pipeline '{}'", pipeline.id),
            None => String::new(),
        }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var() {
        assert_eq!(
            parse_var("stage=prod").unwrap(),
            ("stage".to_string(), "prod".to_string())
        );
        assert_eq!(
            parse_var("url=a=b").unwrap(),
            ("url".to_string(), "a=b".to_string())
        );
        assert!(parse_var("novalue").is_err());
        assert!(parse_var("=x").is_err());
    }
}
