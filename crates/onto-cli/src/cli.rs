use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "onto",
    about = "Ontology sandbox: inspect, query, and validate against fixture files",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Store configuration (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load a fixture and verify link consistency
    Check(CheckArgs),
    /// List the targets of one link
    Links(LinksArgs),
    /// Evaluate an object set and print one page
    Query(QueryArgs),
    /// Validate action parameters without applying them
    Validate(ValidateArgs),
}

#[derive(Args)]
pub struct CheckArgs {
    pub fixture: PathBuf,
}

#[derive(Args)]
pub struct LinksArgs {
    pub fixture: PathBuf,
    pub object_type: String,
    pub primary_key: String,
    pub link: String,
}

#[derive(Args)]
pub struct QueryArgs {
    pub fixture: PathBuf,
    /// Object set as JSON, e.g. '{"type":"base","objectType":"Employee"}'
    pub object_set: String,
    /// Sort fields, e.g. "salary:desc,name"
    #[arg(long)]
    pub order_by: Option<String>,
    /// Properties to keep (repeatable or comma separated)
    #[arg(long, value_delimiter = ',')]
    pub select: Vec<String>,
    #[arg(long)]
    pub page_size: Option<usize>,
    #[arg(long)]
    pub page_token: Option<String>,
}

#[derive(Args)]
pub struct ValidateArgs {
    pub fixture: PathBuf,
    pub action: String,
    /// Parameters as a JSON object
    pub params: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_check() {
        let cli = Cli::try_parse_from(["onto", "check", "offices.toml"]).unwrap();
        if let Command::Check(args) = cli.command {
            assert_eq!(args.fixture, PathBuf::from("offices.toml"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_links() {
        let cli = Cli::try_parse_from(["onto", "links", "f.json", "Employee", "1", "peeps"]).unwrap();
        if let Command::Links(args) = cli.command {
            assert_eq!(args.object_type, "Employee");
            assert_eq!(args.primary_key, "1");
            assert_eq!(args.link, "peeps");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_query_options() {
        let cli = Cli::try_parse_from([
            "onto", "query", "f.toml", "{}",
            "--order-by", "salary:desc",
            "--select", "name,salary",
            "--page-size", "2",
            "--page-token", "0000000000000002",
        ])
        .unwrap();
        if let Command::Query(args) = cli.command {
            assert_eq!(args.order_by.as_deref(), Some("salary:desc"));
            assert_eq!(args.select, vec!["name", "salary"]);
            assert_eq!(args.page_size, Some(2));
            assert!(args.page_token.is_some());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_validate() {
        let cli = Cli::try_parse_from(["onto", "validate", "f.toml", "moveOffice", "{}"]).unwrap();
        assert!(matches!(cli.command, Command::Validate(_)));
    }

    #[test]
    fn parse_globals() {
        let cli = Cli::try_parse_from([
            "onto", "--verbose", "--format", "json", "--config", "store.toml", "check", "f.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.format, OutputFormat::Json));
        assert_eq!(cli.config, Some(PathBuf::from("store.toml")));
    }
}
