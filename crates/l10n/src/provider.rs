//! Table name to typed key mapping.

use std::fmt::Debug;
use std::hash::Hash;

/// Maps table names to application-defined keys.
///
/// Both methods must be pure. [`Self::key`] must be total over every
/// configured table name and must not map two configured names to the same
/// key, otherwise one table silently shadows the other in the cache.
pub trait TableTypeProvider: Send + Sync + 'static {
	/// Cache key type, often a fieldless enum.
	type Key: Clone + Eq + Hash + Debug + Send + Sync + 'static;

	/// Returns the key for a table name.
	fn key(&self, table: &str) -> Self::Key;

	/// Returns whether lookups against `key` are allowed.
	fn is_available(&self, key: &Self::Key) -> bool;
}

/// Uses table names as keys and allows every key.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTableTypeProvider;

impl TableTypeProvider for DefaultTableTypeProvider {
	type Key = String;

	fn key(&self, table: &str) -> String {
		table.to_owned()
	}

	fn is_available(&self, _key: &String) -> bool {
		true
	}
}
