use std::path::Path;

use anyhow::{anyhow, Context};
use colored::Colorize;
use onto_action::{ActionParameters, ValidationResponse};
use onto_query::{LoadObjectSetRequest, ObjectPage, ObjectSet, OrderBy};
use onto_sdk::Sandbox;
use onto_store::StoreConfig;
use onto_types::Locator;
use serde_json::Value;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let format = cli.format;
    match cli.command {
        Command::Check(args) => cmd_check(args, config, &format),
        Command::Links(args) => cmd_links(args, config, &format),
        Command::Query(args) => cmd_query(args, config, &format),
        Command::Validate(args) => cmd_validate(args, config, &format),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<StoreConfig> {
    match path {
        Some(path) => StoreConfig::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(StoreConfig::default()),
    }
}

fn open(fixture: &Path, config: StoreConfig) -> anyhow::Result<Sandbox> {
    Sandbox::load_fixture(fixture, config).with_context(|| format!("loading fixture {}", fixture.display()))
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---- check ----

fn cmd_check(args: CheckArgs, config: StoreConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let sandbox = open(&args.fixture, config)?;
    sandbox.store().check_invariants()?;
    let counts = type_counts(&sandbox)?;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "objects": counts.iter().map(|(t, n)| (t.clone(), Value::from(*n))).collect::<serde_json::Map<_, _>>(),
            "links": sandbox.store().links().edge_count(),
        })),
        OutputFormat::Text => {
            println!("{} {} is consistent", "✓".green().bold(), args.fixture.display().to_string().bold());
            for (object_type, count) in &counts {
                println!("  {:<24} {}", object_type.cyan(), count);
            }
            println!("  {:<24} {}", "link ends".dimmed(), sandbox.store().links().edge_count());
            Ok(())
        }
    }
}

fn type_counts(sandbox: &Sandbox) -> anyhow::Result<Vec<(String, usize)>> {
    let mut names: Vec<String> = sandbox
        .ontology()
        .object_types()
        .map(|def| def.api_name.clone())
        .collect();
    names.sort();
    names
        .into_iter()
        .map(|name| {
            let count = sandbox.store().get_objects_of_type(&name)?.count();
            Ok((name, count))
        })
        .collect()
}

// ---- links ----

fn cmd_links(args: LinksArgs, config: StoreConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let sandbox = open(&args.fixture, config)?;
    let locator = Locator::new(args.object_type, args.primary_key);
    let targets = sandbox.get_links_or_err(&locator, &args.link)?;
    match format {
        OutputFormat::Json => {
            let rendered = targets
                .iter()
                .map(|r| {
                    let def = sandbox.ontology().object_type(&r.object_type)?;
                    Ok(r.to_json(&def.primary_key))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            print_json(&rendered)
        }
        OutputFormat::Text => {
            println!("{} {} ({})", locator.to_string().bold(), args.link.yellow(), targets.len());
            for target in &targets {
                println!("  → {}", target.locator().to_string().cyan());
            }
            Ok(())
        }
    }
}

// ---- query ----

fn query_page(sandbox: &Sandbox, args: &QueryArgs) -> anyhow::Result<ObjectPage> {
    let set: ObjectSet = serde_json::from_str(&args.object_set).context("parsing object set")?;
    let mut request = LoadObjectSetRequest::new(set).select(args.select.iter().cloned());
    if let Some(order) = &args.order_by {
        request = request.order_by(OrderBy::parse(order).map_err(|e| anyhow!(e))?);
    }
    if let Some(size) = args.page_size {
        request = request.page_size(size);
    }
    if let Some(token) = &args.page_token {
        request = request.page_token(token.clone());
    }
    Ok(sandbox.get_objects_from_object_set(&request)?)
}

fn cmd_query(args: QueryArgs, config: StoreConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let sandbox = open(&args.fixture, config)?;
    let page = query_page(&sandbox, &args)?;
    match format {
        OutputFormat::Json => print_json(&page),
        OutputFormat::Text => {
            for object in &page.data {
                println!("{}", serde_json::to_string(object)?);
            }
            println!("{} of {} objects", page.data.len().to_string().bold(), page.total_count);
            if let Some(token) = &page.next_page_token {
                println!("next page: {}", token.yellow());
            }
            Ok(())
        }
    }
}

// ---- validate ----

fn validate(sandbox: &Sandbox, args: &ValidateArgs) -> anyhow::Result<ValidationResponse> {
    let params: ActionParameters = serde_json::from_str(&args.params).context("parsing parameters")?;
    Ok(sandbox.validate_action(&args.action, &params)?)
}

fn cmd_validate(args: ValidateArgs, config: StoreConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let sandbox = open(&args.fixture, config)?;
    let response = validate(&sandbox, &args)?;
    match format {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Text => {
            if response.is_valid() {
                println!("{} {} is valid", "✓".green().bold(), args.action.bold());
            } else {
                println!("{} {} is invalid", "✗".red().bold(), args.action.bold());
                for (name, eval) in &response.parameters {
                    let constraints = if eval.evaluated_constraints.is_empty() {
                        String::new()
                    } else {
                        format!(" ({})", eval.evaluated_constraints.join(", "))
                    };
                    let kind = if eval.required { "required parameter" } else { "parameter" };
                    println!("  {} {}{}", kind.dimmed(), name.yellow(), constraints);
                }
                for criterion in response.submission_criteria.iter().filter(|c| c.reason.is_some()) {
                    println!(
                        "  {} {}: {}",
                        "criterion".dimmed(),
                        criterion.name.yellow(),
                        criterion.reason.as_deref().unwrap_or_default()
                    );
                }
            }
            Ok(())
        }
    }
}
