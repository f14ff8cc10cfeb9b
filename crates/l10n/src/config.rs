//! Locale/table registry and service options.
//!
//! The registry is published once as TOML:
//!
//! ```toml
//! locales = ["en", "fr"]
//! tables = ["ui", "dialogue"]
//! ```
//!
//! It is read once during [`LocalizationService::initialize`](crate::LocalizationService::initialize)
//! and never re-read for the lifetime of the service.

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::locale::LocaleIdentifier;

/// Well-known id under which the registry is published.
pub const CONFIG_NAME: &str = "loctab.config";

/// Sentinel returned by every lookup that cannot be served.
pub const NOT_FOUND: &str = "Localization not found";

/// Supported locales and tracked tables, in publication order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalizationConfig {
	/// Locales the application ships.
	#[serde(default)]
	pub locales: Vec<LocaleIdentifier>,
	/// Table names the service tracks.
	#[serde(default)]
	pub tables: Vec<String>,
}

impl LocalizationConfig {
	/// Builds a registry from already-parsed parts.
	pub fn new(locales: impl IntoIterator<Item = LocaleIdentifier>, tables: impl IntoIterator<Item = impl Into<String>>) -> Self {
		Self {
			locales: locales.into_iter().collect(),
			tables: tables.into_iter().map(Into::into).collect(),
		}
	}

	/// Parses and validates a TOML registry.
	pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	/// Rejects empty or duplicated table names.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let mut seen = HashSet::with_capacity(self.tables.len());
		for table in &self.tables {
			if table.trim().is_empty() {
				return Err(ConfigError::EmptyTableName);
			}
			if !seen.insert(table.as_str()) {
				return Err(ConfigError::DuplicateTable(table.clone()));
			}
		}
		Ok(())
	}
}

/// Options for a [`LocalizationService`](crate::LocalizationService).
#[derive(Debug, Clone)]
pub struct ServiceOptions {
	/// Registry id passed to the [`ConfigSource`].
	pub config_id: String,
	/// String returned when a lookup cannot be served.
	pub sentinel: Cow<'static, str>,
}

impl Default for ServiceOptions {
	fn default() -> Self {
		Self {
			config_id: CONFIG_NAME.to_owned(),
			sentinel: Cow::Borrowed(NOT_FOUND),
		}
	}
}

/// One-shot source of the registry.
#[async_trait]
pub trait ConfigSource: Send + Sync {
	/// Loads the registry published under `config_id`.
	async fn load(&self, config_id: &str) -> Result<LocalizationConfig, ConfigError>;
}

/// Reads `{root}/{config_id}.toml`.
#[derive(Debug, Clone)]
pub struct TomlConfigSource {
	root: PathBuf,
}

impl TomlConfigSource {
	/// Creates a source rooted at `root`.
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	/// Path of the registry file for `config_id`.
	pub fn path_for(&self, config_id: &str) -> PathBuf {
		self.root.join(format!("{config_id}.toml"))
	}

	/// Root directory.
	pub fn root(&self) -> &Path {
		&self.root
	}
}

#[async_trait]
impl ConfigSource for TomlConfigSource {
	async fn load(&self, config_id: &str) -> Result<LocalizationConfig, ConfigError> {
		let path = self.path_for(config_id);
		let text = match tokio::fs::read_to_string(&path).await {
			Ok(text) => text,
			Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
				return Err(ConfigError::NotFound(config_id.to_owned()));
			}
			Err(error) => return Err(ConfigError::Io { path, error }),
		};
		let config = LocalizationConfig::from_toml(&text)?;
		tracing::debug!(path = %path.display(), locales = config.locales.len(), tables = config.tables.len(), "l10n.config.loaded");
		Ok(config)
	}
}

/// Serves one in-memory registry under a single id.
#[derive(Debug, Clone)]
pub struct StaticConfigSource {
	config_id: String,
	config: LocalizationConfig,
}

impl StaticConfigSource {
	/// Serves `config` under [`CONFIG_NAME`].
	pub fn new(config: LocalizationConfig) -> Self {
		Self::with_id(CONFIG_NAME, config)
	}

	/// Serves `config` under `config_id`.
	pub fn with_id(config_id: impl Into<String>, config: LocalizationConfig) -> Self {
		Self {
			config_id: config_id.into(),
			config,
		}
	}
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
	async fn load(&self, config_id: &str) -> Result<LocalizationConfig, ConfigError> {
		if config_id != self.config_id {
			return Err(ConfigError::NotFound(config_id.to_owned()));
		}
		self.config.validate()?;
		Ok(self.config.clone())
	}
}
