//! Wiring diagnostic driver.
//!
//! Loads a TOML catalog, registers every declared type plus whatever the
//! declarations reference, applies the catalog's bindings and `--set`
//! overrides, then prints the requested view.

mod cli;
mod render;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::debug;
use wiring::{Configuration, Injector};
use wiring_catalog::Catalog;

use crate::cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	let catalog = Catalog::load(&cli.catalog)
		.with_context(|| format!("loading catalog {}", cli.catalog.display()))?;

	match cli.command {
		Command::Unresolved => {
			for name in catalog.undeclared_references() {
				println!("{name}");
			}
		}
		Command::Tree => {
			let config = configuration(&catalog, &cli.assignments)?;
			print!("{}", config.hierarchy().to_pretty_string());
		}
		Command::Export => {
			let config = configuration(&catalog, &cli.assignments)?;
			println!("{}", serde_json::to_string_pretty(&config.hierarchy().export())?);
		}
		Command::Plan { name, shallow } => {
			let injector = Injector::new(configuration(&catalog, &cli.assignments)?);
			let plan = injector.plan(&name)?;
			let hierarchy = injector.config().hierarchy();
			if shallow {
				println!("{}", plan.to_shallow_string(hierarchy));
			} else {
				print!("{}", plan.to_pretty_string(hierarchy));
			}
			if !plan.is_injectable() {
				bail!("{name} is not injectable: {}", plan.cant_inject_reason(hierarchy));
			}
		}
		Command::Inject { name } => {
			let injector = Injector::new(configuration(&catalog, &cli.assignments)?);
			let value = injector
				.get_instance(&name)
				.with_context(|| format!("injecting {name}"))?;
			println!("{}", serde_json::to_string_pretty(&render::to_json(&value))?);
		}
	}
	Ok(())
}

/// Catalog bindings plus command-line overrides, short names accepted.
fn configuration(catalog: &Catalog, assignments: &[(String, String)]) -> anyhow::Result<Configuration> {
	let mut builder = catalog.builder()?;
	for (name, value) in assignments {
		let full = builder
			.hierarchy()
			.resolve_short_name(name)
			.map(|id| builder.hierarchy().full_name(id).to_string())
			.unwrap_or_else(|| name.clone());
		debug!(parameter = %full, value = %value, "command-line binding");
		builder
			.bind_named_parameter(&full, value)
			.with_context(|| format!("binding --set {name}={value}"))?;
	}
	Ok(builder.build())
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = std::env::var("WIRING_LOG")
		.ok()
		.and_then(|directives| EnvFilter::try_new(directives).ok())
		.or_else(|| EnvFilter::try_from_default_env().ok())
		.unwrap_or_else(|| EnvFilter::new(if verbose { "debug" } else { "warn" }));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}
