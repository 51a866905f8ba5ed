//! CLI command definitions

use clap::Args;

/// Run a pipe
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to the pipe definition (JSON or YAML)
    #[arg(short, long)]
    pub file: String,

    /// Directory holding sub-pipe definitions by id
    #[arg(long)]
    pub pipes_dir: Option<String>,

    /// Fixture file serving feeds and query results
    #[arg(long)]
    pub fixtures: Option<String>,

    /// Text input values (name=value)
    #[arg(long, value_parser = parse_key_value)]
    pub input: Vec<(String, String)>,

    /// Stop after this many items
    #[arg(long)]
    pub limit: Option<usize>,

    /// Test mode: text inputs use their defaults
    #[arg(long)]
    pub test: bool,

    /// Stop at the first item error
    #[arg(long)]
    pub fail_fast: bool,
}

/// Validate a pipe definition
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to the pipe definition (JSON or YAML)
    #[arg(short, long)]
    pub file: String,

    /// Directory holding sub-pipe definitions by id
    #[arg(long)]
    pub pipes_dir: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}
