use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::LoadError;
use crate::locale::LocaleIdentifier;
use crate::source::TableLoader;
use crate::table::{StringTable, TableReference};

/// [`TableLoader`] over tables held in memory.
///
/// Tables can be replaced at any time; the next load observes the new data.
#[derive(Debug, Clone, Default)]
pub struct MemoryTableLoader {
	tables: Arc<RwLock<HashMap<(LocaleIdentifier, TableReference), StringTable>>>,
	loads: Arc<AtomicUsize>,
}

impl MemoryTableLoader {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Publishes (or replaces) one table.
	pub fn insert<K, V>(&self, locale: &LocaleIdentifier, table: &str, entries: impl IntoIterator<Item = (K, V)>)
	where
		K: Into<String>,
		V: Into<String>,
	{
		let reference = TableReference::new(table);
		let data = StringTable::new(reference.clone(), locale.clone(), entries);
		self.tables.write().insert((locale.clone(), reference), data);
	}

	/// Withdraws one table. Returns whether it was published.
	pub fn remove(&self, locale: &LocaleIdentifier, table: &str) -> bool {
		self.tables.write().remove(&(locale.clone(), TableReference::new(table))).is_some()
	}

	/// Number of [`TableLoader::load`] calls served so far.
	pub fn load_count(&self) -> usize {
		self.loads.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl TableLoader for MemoryTableLoader {
	async fn load(&self, reference: &TableReference, locale: &LocaleIdentifier, cancel: CancellationToken) -> Result<StringTable, LoadError> {
		self.loads.fetch_add(1, Ordering::SeqCst);
		if cancel.is_cancelled() {
			return Err(LoadError::Cancelled);
		}
		self.tables
			.read()
			.get(&(locale.clone(), reference.clone()))
			.cloned()
			.ok_or_else(|| LoadError::NotFound {
				table: reference.name().to_owned(),
				locale: locale.clone(),
			})
	}
}
