//! Collaborator contracts the service is built on.
//!
//! Neither the asset loader nor the locale subsystem is owned by this crate.
//! The service takes them as trait objects so embedders can plug in their own
//! platform integration and tests can substitute fakes. Reference
//! implementations live in [`crate::adapters`].

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::error::{LoadError, LocaleError};
use crate::locale::LocaleIdentifier;
use crate::table::{StringTable, TableReference};

/// Resolves a table reference into string data.
#[async_trait]
pub trait TableLoader: Send + Sync {
	/// Loads `reference` for `locale`.
	///
	/// Must be idempotent. Implementations should stop early and return
	/// [`LoadError::Cancelled`] once `cancel` fires; the service drops
	/// superseded results either way.
	async fn load(&self, reference: &TableReference, locale: &LocaleIdentifier, cancel: CancellationToken) -> Result<StringTable, LoadError>;
}

/// Opaque handle to one installed locale, issued by a [`LocaleSubsystem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocaleHandle(pub u64);

/// One entry of [`LocaleSubsystem::available_locales`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableLocale {
	/// Locale identifier.
	pub identifier: LocaleIdentifier,
	/// Handle accepted by [`LocaleSubsystem::set_selected`].
	pub handle: LocaleHandle,
}

/// Owner of the process-wide "current locale".
#[async_trait]
pub trait LocaleSubsystem: Send + Sync {
	/// Resolves once the subsystem finished starting up.
	async fn ready(&self);

	/// Resolves with the selected locale once one is selected, or `None` if
	/// the subsystem shuts down first.
	async fn selected_locale(&self) -> Option<LocaleIdentifier>;

	/// Locales currently installed.
	fn available_locales(&self) -> Vec<AvailableLocale>;

	/// Makes `handle` the selected locale.
	///
	/// The change is announced asynchronously through [`Self::subscribe`].
	fn set_selected(&self, handle: LocaleHandle) -> Result<(), LocaleError>;

	/// Subscribes to selected-locale changes. Dropping the receiver unsubscribes.
	fn subscribe(&self) -> broadcast::Receiver<LocaleIdentifier>;
}
