//! Error types for configuration, table loading, locale selection and lookup.

use std::path::PathBuf;

use thiserror::Error;

use crate::locale::LocaleIdentifier;
use crate::source::LocaleHandle;

/// A locale code that is not a valid language identifier.
#[derive(Debug, Error)]
#[error("invalid locale identifier {code:?}: {source}")]
pub struct ParseLocaleError {
	/// The rejected input.
	pub code: String,
	/// Parser diagnostic.
	#[source]
	pub source: unic_langid::LanguageIdentifierError,
}

/// Errors that can occur when reading the locale/table registry.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading the registry file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or schema.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// The same table name is listed twice.
	#[error("table {0:?} is listed more than once")]
	DuplicateTable(String),

	/// A table name is empty.
	#[error("table names must not be empty")]
	EmptyTableName,

	/// No registry is published under the requested id.
	#[error("no localization config named {0:?}")]
	NotFound(String),
}

/// Errors reported by a [`TableLoader`](crate::TableLoader) for one table.
#[derive(Debug, Error)]
pub enum LoadError {
	/// The table is not published for the requested locale.
	#[error("table {table:?} is not available for locale {locale}")]
	NotFound {
		/// Requested table.
		table: String,
		/// Requested locale.
		locale: LocaleIdentifier,
	},

	/// Error reading table data.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Table data is malformed.
	#[error("malformed table {path}: {error}")]
	Parse {
		/// Path to the malformed file.
		path: PathBuf,
		/// Parser diagnostic.
		error: toml::de::Error,
	},

	/// The load observed its cancellation token.
	#[error("load cancelled")]
	Cancelled,

	/// Loader-specific failure.
	#[error("{0}")]
	Other(String),
}

/// Errors returned by [`LocalizationService::set_locale`](crate::LocalizationService::set_locale).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocaleError {
	/// The service has not finished initializing.
	#[error("localization service is not initialized")]
	NotInitialized,

	/// The locale subsystem does not currently offer this locale.
	#[error("locale {0} is not available")]
	Unavailable(LocaleIdentifier),

	/// The locale subsystem no longer recognizes a handle it issued.
	#[error("stale locale handle {0:?}")]
	StaleHandle(LocaleHandle),
}

/// Errors returned by [`LocalizationService::initialize`](crate::LocalizationService::initialize).
#[derive(Debug, Error)]
pub enum InitError {
	/// The registry could not be read.
	#[error("failed to load localization config: {0}")]
	Config(#[from] ConfigError),

	/// The locale subsystem shut down before any locale was selected.
	#[error("locale subsystem closed before a locale was selected")]
	NoLocaleSelected,

	/// Another caller's initialization failed while this caller waited on it.
	#[error("concurrent initialization failed")]
	Aborted,

	/// The service was disposed before initialization finished.
	#[error("localization service was disposed")]
	Disposed,
}

/// Errors from rendering one table entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
	/// The table has no entry with this key.
	#[error("no entry {0:?}")]
	Missing(String),

	/// The entry value is not a valid template for the given arguments.
	#[error("entry {entry:?}: {reason}")]
	Format {
		/// Entry key.
		entry: String,
		/// What went wrong.
		reason: FormatError,
	},
}

/// Template errors in an entry value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
	/// `{` without a closing `}`.
	#[error("unclosed placeholder at byte {0}")]
	UnclosedPlaceholder(usize),

	/// `}` without an opening `{`.
	#[error("unmatched '}}' at byte {0}")]
	UnmatchedClose(usize),

	/// `{}` with no argument name.
	#[error("empty placeholder at byte {0}")]
	EmptyPlaceholder(usize),

	/// A placeholder names an argument that was not supplied.
	#[error("unknown argument {0:?}")]
	UnknownArgument(String),
}

/// Why a lookup fell back to the sentinel string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
	/// The service is not ready.
	#[error("localization service is not ready")]
	NotReady,

	/// The entry key is empty.
	#[error("empty entry key")]
	EmptyEntry,

	/// The table provider reports the key unusable.
	#[error("table is not available")]
	Unavailable,

	/// The key does not belong to any configured table.
	#[error("table is not configured")]
	NotTracked,

	/// The table has no data for the current locale yet.
	#[error("table is not loaded")]
	NotLoaded,

	/// The table is loaded but the entry could not be rendered.
	#[error(transparent)]
	Entry(#[from] EntryError),
}
