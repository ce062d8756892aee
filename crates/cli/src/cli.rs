use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "wiring")]
#[command(about = "Inspect type catalogs, injection plans and object graphs")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Catalog file declaring classes, parameters and bindings
	#[arg(long, short = 'c', value_name = "PATH")]
	pub catalog: PathBuf,

	/// Extra parameter binding, by full or short name
	#[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
	pub assignments: Vec<(String, String)>,

	/// Verbose logging
	#[arg(short, long)]
	pub verbose: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// Print the registered namespace tree
	Tree,
	/// Print the registry as JSON
	Export,
	/// List referenced types the catalog does not declare
	Unresolved,
	/// Print the injection plan for a type or parameter
	Plan {
		/// Full name to plan
		name: String,
		/// One line instead of the full tree
		#[arg(long)]
		shallow: bool,
	},
	/// Build a type or parameter and print the result as JSON
	Inject {
		/// Full name to build
		name: String,
	},
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
	match raw.split_once('=') {
		Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
		_ => Err(format!("expected NAME=VALUE, got {raw:?}")),
	}
}
