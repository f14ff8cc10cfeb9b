//! Loaded string tables and entry rendering.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{EntryError, FormatError};
use crate::locale::LocaleIdentifier;

/// Identifies one configured table to a [`TableLoader`](crate::TableLoader).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableReference(Arc<str>);

impl TableReference {
	/// Creates a reference from a table name.
	pub fn new(name: impl AsRef<str>) -> Self {
		Self(Arc::from(name.as_ref()))
	}

	/// Returns the table name.
	pub fn name(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for TableReference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for TableReference {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

/// All entries of one table in one locale.
///
/// Immutable once built; a reload replaces the whole table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringTable {
	reference: TableReference,
	locale: LocaleIdentifier,
	entries: HashMap<String, String>,
}

impl StringTable {
	/// Builds a table from `(key, value)` pairs.
	pub fn new<K, V>(reference: TableReference, locale: LocaleIdentifier, entries: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			reference,
			locale,
			entries: entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
		}
	}

	/// Table this data belongs to.
	pub fn reference(&self) -> &TableReference {
		&self.reference
	}

	/// Locale this data was loaded for.
	pub fn locale(&self) -> &LocaleIdentifier {
		&self.locale
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns `true` if the table has no entries.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Raw, unrendered entry value.
	pub fn entry(&self, key: &str) -> Option<&str> {
		self.entries.get(key).map(String::as_str)
	}

	/// Entry keys in no particular order.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}

	/// Renders an entry with no arguments. Only `{{`/`}}` escapes are expanded.
	///
	/// Values are always parsed as templates, so a literal brace must be
	/// written `{{` or `}}`. An unescaped `{x}` is an unknown argument here
	/// and fails with [`FormatError::UnknownArgument`].
	pub fn localized(&self, key: &str) -> Result<String, EntryError> {
		self.localized_with(key, &[])
	}

	/// Renders an entry, substituting `{name}` placeholders from `args`.
	pub fn localized_with(&self, key: &str, args: &[(&str, &str)]) -> Result<String, EntryError> {
		let template = self.entry(key).ok_or_else(|| EntryError::Missing(key.to_owned()))?;
		render(template, args).map_err(|reason| EntryError::Format {
			entry: key.to_owned(),
			reason,
		})
	}
}

fn render(template: &str, args: &[(&str, &str)]) -> Result<String, FormatError> {
	let mut out = String::with_capacity(template.len());
	let mut chars = template.char_indices().peekable();

	while let Some((at, c)) = chars.next() {
		match c {
			'{' if chars.peek().is_some_and(|&(_, next)| next == '{') => {
				chars.next();
				out.push('{');
			}
			'{' => {
				let start = at + 1;
				let end = loop {
					match chars.next() {
						Some((close, '}')) => break close,
						Some((_, '{')) | None => return Err(FormatError::UnclosedPlaceholder(at)),
						Some(_) => {}
					}
				};
				let name = template[start..end].trim();
				if name.is_empty() {
					return Err(FormatError::EmptyPlaceholder(at));
				}
				let (_, value) = args
					.iter()
					.find(|(arg, _)| *arg == name)
					.ok_or_else(|| FormatError::UnknownArgument(name.to_owned()))?;
				out.push_str(value);
			}
			'}' if chars.peek().is_some_and(|&(_, next)| next == '}') => {
				chars.next();
				out.push('}');
			}
			'}' => return Err(FormatError::UnmatchedClose(at)),
			c => out.push(c),
		}
	}

	Ok(out)
}
