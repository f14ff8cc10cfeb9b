//! Serializable references to one localized string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::provider::TableTypeProvider;
use crate::service::LocalizationService;

/// A table name paired with an entry key, written `table/entry`.
///
/// Lets data files and UI definitions refer to strings without holding a
/// service handle; resolve against the service at display time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalizedId {
	/// Table name.
	pub table: String,
	/// Entry key within the table.
	pub entry: String,
}

impl LocalizedId {
	/// Creates an id.
	pub fn new(table: impl Into<String>, entry: impl Into<String>) -> Self {
		Self {
			table: table.into(),
			entry: entry.into(),
		}
	}

	/// Resolves against `service`, falling back to the sentinel.
	pub fn resolve<P: TableTypeProvider>(&self, service: &LocalizationService<P>) -> String {
		service.localized(&self.table, &self.entry)
	}

	/// Resolves with `{name}` arguments, falling back to the sentinel.
	pub fn resolve_with<P: TableTypeProvider>(&self, service: &LocalizationService<P>, args: &[(&str, &str)]) -> String {
		service.localized_with(&self.table, &self.entry, args)
	}
}

impl fmt::Display for LocalizedId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.table, self.entry)
	}
}

/// `table/entry` text without a separator or with an empty half.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected `table/entry`, got {0:?}")]
pub struct ParseLocalizedIdError(pub String);

impl FromStr for LocalizedId {
	type Err = ParseLocalizedIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.split_once('/') {
			Some((table, entry)) if !table.is_empty() && !entry.is_empty() => Ok(Self::new(table, entry)),
			_ => Err(ParseLocalizedIdError(s.to_owned())),
		}
	}
}
