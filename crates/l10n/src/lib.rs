//! Runtime localization-table cache.
//!
//! A [`LocalizationService`] tracks a fixed set of string tables listed in a
//! registry ([`LocalizationConfig`]) and keeps the data for the currently
//! selected locale in memory:
//!
//! - **Lookups** ([`LocalizationService::localized`]) never block and never
//!   fail. Anything that cannot be served yields a sentinel string.
//! - **Locale switches** ([`LocalizationService::set_locale`]) go through the
//!   [`LocaleSubsystem`]; its change notification reloads every table.
//! - **Reloads** fan out one load per table and supersede each other. Only
//!   the newest generation commits, and update callbacks
//!   ([`LocalizationService::on_locale_update`]) run once per settled reload.
//!
//! Table data comes from a [`TableLoader`]; the mapping from table names to
//! cache keys comes from a [`TableTypeProvider`]. The [`adapters`] module has
//! in-process implementations of every collaborator.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use loctab::adapters::{LocaleSelector, MemoryTableLoader};
//! use loctab::{DefaultTableTypeProvider, LocaleIdentifier, LocalizationConfig, LocalizationService, StaticConfigSource};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let en: LocaleIdentifier = "en".parse()?;
//! let fr: LocaleIdentifier = "fr".parse()?;
//!
//! let loader = MemoryTableLoader::new();
//! loader.insert(&en, "ui", [("greeting", "Hello")]);
//! loader.insert(&fr, "ui", [("greeting", "Bonjour")]);
//!
//! let service = LocalizationService::new(
//! 	DefaultTableTypeProvider,
//! 	Arc::new(loader),
//! 	Arc::new(LocaleSelector::started([en.clone(), fr.clone()], en)),
//! 	Arc::new(StaticConfigSource::new(LocalizationConfig::new([], ["ui"]))),
//! );
//! service.initialize().await?;
//! assert_eq!(service.localized("ui", "greeting"), "Hello");
//!
//! let _sub = service.on_locale_update(|service| println!("{}", service.localized("ui", "greeting")));
//! service.set_locale(fr)?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
mod config;
mod error;
mod id;
mod locale;
mod provider;
mod service;
mod source;
mod table;

pub use config::{CONFIG_NAME, ConfigSource, LocalizationConfig, NOT_FOUND, ServiceOptions, StaticConfigSource, TomlConfigSource};
pub use error::{ConfigError, EntryError, FormatError, InitError, LoadError, LocaleError, LookupError, ParseLocaleError};
pub use id::{LocalizedId, ParseLocalizedIdError};
pub use locale::{LocaleIdentifier, SystemLanguage};
pub use provider::{DefaultTableTypeProvider, TableTypeProvider};
pub use service::{LocalizationService, ServiceState, UpdateSubscription};
pub use source::{AvailableLocale, LocaleHandle, LocaleSubsystem, TableLoader};
pub use table::{StringTable, TableReference};
