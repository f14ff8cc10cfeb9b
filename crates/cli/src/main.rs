//! `loctab` binary.
//!
//! Works against a table directory laid out as:
//! - `{root}/{config_id}.toml`: locale/table registry
//! - `{root}/{locale}/{table}.toml`: one flat table per locale

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use loctab::adapters::{DirTableLoader, LocaleSelector};
use loctab::{
	CONFIG_NAME, ConfigSource, DefaultTableTypeProvider, LoadError, LocaleIdentifier, LocalizationConfig, LocalizationService, LocalizedId,
	SystemLanguage, TableLoader, TableReference, TomlConfigSource,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "loctab")]
#[command(about = "Inspect and exercise localization tables")]
struct Args {
	/// Directory holding the registry and per-locale tables
	#[arg(short, long, value_name = "DIR", default_value = ".")]
	root: PathBuf,

	/// Registry id, resolved to `{root}/{id}.toml`
	#[arg(long, value_name = "ID", default_value = CONFIG_NAME)]
	config_id: String,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print one localized string
	Get {
		/// Entry as `table/entry`
		id: LocalizedId,
		/// Locale to resolve in; defaults to the first registered locale
		#[arg(short, long)]
		locale: Option<LocaleIdentifier>,
		/// Placeholder argument as `name=value`
		#[arg(short, long = "arg", value_name = "NAME=VALUE", value_parser = parse_arg)]
		args: Vec<(String, String)>,
	},
	/// Report tables and entries missing from any registered locale
	Check,
	/// Resolve an entry, switch locale, and resolve it again
	Switch {
		/// Entry as `table/entry`
		id: LocalizedId,
		/// Starting locale
		#[arg(long)]
		from: LocaleIdentifier,
		/// Target locale
		#[arg(long)]
		to: LocaleIdentifier,
	},
}

fn parse_arg(raw: &str) -> Result<(String, String), String> {
	raw.split_once('=')
		.map(|(name, value)| (name.to_owned(), value.to_owned()))
		.ok_or_else(|| format!("expected NAME=VALUE, got {raw:?}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
	let args = Args::parse();
	setup_tracing(args.verbose);

	let configs = TomlConfigSource::new(&args.root);
	let config = configs
		.load(&args.config_id)
		.await
		.with_context(|| format!("reading {}", configs.path_for(&args.config_id).display()))?;
	info!(root = %args.root.display(), locales = config.locales.len(), tables = config.tables.len(), "loctab.start");

	match args.command {
		Command::Get { id, locale, args: params } => {
			let locale = locale.unwrap_or_else(|| default_locale(&config));
			let service = start(&args.root, configs, &config, locale).await?;
			let params: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
			println!("{}", id.resolve_with(&service, &params));
			Ok(ExitCode::SUCCESS)
		}
		Command::Check => check(&args.root, &config).await,
		Command::Switch { id, from, to } => {
			let (before, after) = switch(&args.root, configs, &config, &id, from.clone(), to.clone()).await?;
			println!("{from}: {before}");
			println!("{to}: {after}");
			Ok(ExitCode::SUCCESS)
		}
	}
}

/// Resolves `id` in `from`, switches to `to` and resolves it again.
async fn switch(
	root: &Path,
	configs: TomlConfigSource,
	config: &LocalizationConfig,
	id: &LocalizedId,
	from: LocaleIdentifier,
	to: LocaleIdentifier,
) -> anyhow::Result<(String, String)> {
	let service = start(root, configs, config, from.clone()).await?;
	let before = id.resolve(&service);

	// Reselecting the active locale is not announced, so there is nothing to wait for.
	if from == to {
		service.dispose();
		return Ok((before.clone(), before));
	}

	let (tx, mut updated) = tokio::sync::mpsc::unbounded_channel();
	let _sub = service.on_locale_update(move |_| {
		let _ = tx.send(());
	});
	service.set_locale(to)?;
	tokio::time::timeout(Duration::from_secs(10), updated.recv())
		.await
		.context("timed out waiting for the locale switch")?;
	let after = id.resolve(&service);
	service.dispose();
	Ok((before, after))
}

fn default_locale(config: &LocalizationConfig) -> LocaleIdentifier {
	config
		.locales
		.first()
		.cloned()
		.unwrap_or_else(|| SystemLanguage::English.into())
}

async fn start(
	root: &Path,
	configs: TomlConfigSource,
	config: &LocalizationConfig,
	locale: LocaleIdentifier,
) -> anyhow::Result<LocalizationService<DefaultTableTypeProvider>> {
	if !config.locales.contains(&locale) {
		bail!("locale {locale} is not registered");
	}
	let selector = LocaleSelector::started(config.locales.iter().cloned(), locale);
	let service = LocalizationService::new(
		DefaultTableTypeProvider,
		Arc::new(DirTableLoader::new(root)),
		Arc::new(selector),
		Arc::new(configs),
	);
	service.initialize().await?;
	debug!(tables = ?service.loaded_tables(), "loctab.service.ready");
	Ok(service)
}

/// Compares every locale against the union of entry keys per table.
async fn check(root: &Path, config: &LocalizationConfig) -> anyhow::Result<ExitCode> {
	let loader = DirTableLoader::new(root);
	let mut problems = 0usize;

	for table in &config.tables {
		let reference = TableReference::new(table);
		let mut loaded = Vec::with_capacity(config.locales.len());
		for locale in &config.locales {
			match loader.load(&reference, locale, CancellationToken::new()).await {
				Ok(data) => loaded.push((locale, data)),
				Err(LoadError::NotFound { .. }) => {
					problems += 1;
					println!("{locale}: table {table} is missing ({})", loader.path_for(&reference, locale).display());
				}
				Err(error) => {
					problems += 1;
					println!("{locale}: table {table}: {error}");
				}
			}
		}

		let keys: BTreeSet<&str> = loaded.iter().flat_map(|(_, data)| data.keys()).collect();
		for (locale, data) in &loaded {
			for key in keys.iter().filter(|key| data.entry(key).is_none()) {
				problems += 1;
				println!("{locale}: {table}/{key} is missing");
			}
		}
	}

	if problems == 0 {
		println!("{} locales, {} tables: ok", config.locales.len(), config.tables.len());
		Ok(ExitCode::SUCCESS)
	} else {
		println!("{problems} problem(s)");
		Ok(ExitCode::FAILURE)
	}
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_env("LOCTAB_LOG")
		.or_else(|_| EnvFilter::try_from_default_env())
		.unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("loctab=debug,loctab_worker=debug,warn")
			} else {
				EnvFilter::new("loctab=info,warn")
			}
		});

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(verbose)
		.init();
}
