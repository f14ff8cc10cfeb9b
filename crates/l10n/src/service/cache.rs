use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use crate::config::LocalizationConfig;
use crate::provider::TableTypeProvider;
use crate::table::{StringTable, TableReference};

/// One configured table, resolved once at initialization.
#[derive(Debug)]
pub(crate) struct TrackedTable<K> {
	pub name: String,
	pub key: K,
	pub reference: TableReference,
}

/// Registry snapshot plus the key/reference arrays derived from it.
#[derive(Debug)]
pub(crate) struct TrackedTables<K> {
	pub config: LocalizationConfig,
	pub tables: Vec<TrackedTable<K>>,
}

impl<K: Clone + Eq + Hash + std::fmt::Debug> TrackedTables<K> {
	pub fn resolve<P>(provider: &P, config: LocalizationConfig) -> Self
	where
		P: TableTypeProvider<Key = K>,
	{
		let tables = config
			.tables
			.iter()
			.map(|name| TrackedTable {
				name: name.clone(),
				key: provider.key(name),
				reference: TableReference::new(name),
			})
			.collect::<Vec<_>>();

		for (i, table) in tables.iter().enumerate() {
			if let Some(other) = tables[..i].iter().find(|t| t.key == table.key) {
				tracing::warn!(table = %table.name, shadows = %other.name, key = ?table.key, "l10n.cache.key_collision");
			}
		}

		Self { config, tables }
	}

	pub fn len(&self) -> usize {
		self.tables.len()
	}
}

/// Key to loaded-table map. Keys are fixed at construction.
#[derive(Debug)]
pub(crate) struct TableCache<K> {
	entries: HashMap<K, Option<Arc<StringTable>>>,
}

impl<K> Default for TableCache<K> {
	fn default() -> Self {
		Self { entries: HashMap::new() }
	}
}

impl<K: Eq + Hash + Clone> TableCache<K> {
	/// Creates one unloaded entry per key.
	pub fn with_keys<'a>(keys: impl IntoIterator<Item = &'a K>) -> Self
	where
		K: 'a,
	{
		Self {
			entries: keys.into_iter().map(|key| (key.clone(), None)).collect(),
		}
	}

	/// `None` when the key is not tracked, `Some(None)` when tracked but unloaded.
	pub fn get(&self, key: &K) -> Option<Option<&Arc<StringTable>>> {
		self.entries.get(key).map(Option::as_ref)
	}

	/// Replaces the table for a tracked key. Untracked keys are ignored.
	pub fn commit(&mut self, key: &K, table: Arc<StringTable>) -> bool {
		match self.entries.get_mut(key) {
			Some(slot) => {
				*slot = Some(table);
				true
			}
			None => false,
		}
	}

	#[cfg(test)]
	pub fn contains(&self, key: &K) -> bool {
		self.entries.contains_key(key)
	}

	pub fn is_loaded(&self, key: &K) -> bool {
		matches!(self.entries.get(key), Some(Some(_)))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}
}
