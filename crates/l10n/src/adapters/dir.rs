use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::LoadError;
use crate::locale::LocaleIdentifier;
use crate::source::TableLoader;
use crate::table::{StringTable, TableReference};

/// [`TableLoader`] reading `{root}/{locale}/{table}.toml`.
///
/// Each file is a flat map of entry keys to string values:
///
/// ```toml
/// greeting = "Bonjour"
/// farewell = "Au revoir, {name}"
/// ```
#[derive(Debug, Clone)]
pub struct DirTableLoader {
	root: PathBuf,
}

impl DirTableLoader {
	/// Creates a loader rooted at `root`.
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	/// Root directory.
	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Path of one table file.
	pub fn path_for(&self, reference: &TableReference, locale: &LocaleIdentifier) -> PathBuf {
		self.root.join(locale.as_str()).join(format!("{}.toml", reference.name()))
	}
}

#[async_trait]
impl TableLoader for DirTableLoader {
	async fn load(&self, reference: &TableReference, locale: &LocaleIdentifier, cancel: CancellationToken) -> Result<StringTable, LoadError> {
		let path = self.path_for(reference, locale);
		let read = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(LoadError::Cancelled),
			read = tokio::fs::read_to_string(&path) => read,
		};
		let text = match read {
			Ok(text) => text,
			Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
				return Err(LoadError::NotFound {
					table: reference.name().to_owned(),
					locale: locale.clone(),
				});
			}
			Err(error) => return Err(LoadError::Io { path, error }),
		};

		let entries: HashMap<String, String> = match toml::from_str(&text) {
			Ok(entries) => entries,
			Err(error) => return Err(LoadError::Parse { path, error }),
		};
		tracing::trace!(path = %path.display(), entries = entries.len(), "l10n.dir.loaded");
		Ok(StringTable::new(reference.clone(), locale.clone(), entries))
	}
}
