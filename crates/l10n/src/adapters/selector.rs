use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::error::LocaleError;
use crate::locale::LocaleIdentifier;
use crate::source::{AvailableLocale, LocaleHandle, LocaleSubsystem};

const CHANGE_BUFFER: usize = 16;

/// In-process [`LocaleSubsystem`].
///
/// Starts not ready and with nothing selected, mirroring a platform subsystem
/// that finishes booting asynchronously. Handles are indices into the
/// installed list, which only grows. Cloning shares state.
#[derive(Debug, Clone)]
pub struct LocaleSelector {
	inner: Arc<SelectorInner>,
}

#[derive(Debug)]
struct SelectorInner {
	installed: RwLock<Vec<LocaleIdentifier>>,
	ready: watch::Sender<bool>,
	selected: watch::Sender<Option<LocaleIdentifier>>,
	changes: broadcast::Sender<LocaleIdentifier>,
	closed: CancellationToken,
}

impl LocaleSelector {
	/// Creates a selector with `installed` locales, not ready, nothing selected.
	pub fn new(installed: impl IntoIterator<Item = LocaleIdentifier>) -> Self {
		let selector = Self {
			inner: Arc::new(SelectorInner {
				installed: RwLock::new(Vec::new()),
				ready: watch::Sender::new(false),
				selected: watch::Sender::new(None),
				changes: broadcast::Sender::new(CHANGE_BUFFER),
				closed: CancellationToken::new(),
			}),
		};
		for locale in installed {
			selector.install(locale);
		}
		selector
	}

	/// Creates a ready selector with `initial` installed and selected.
	pub fn started(installed: impl IntoIterator<Item = LocaleIdentifier>, initial: LocaleIdentifier) -> Self {
		let selector = Self::new(installed);
		selector.install(initial.clone());
		selector.inner.selected.send_replace(Some(initial));
		selector.mark_ready();
		selector
	}

	/// Installs a locale, returning its handle. Installing twice returns the
	/// existing handle.
	pub fn install(&self, locale: LocaleIdentifier) -> LocaleHandle {
		let mut installed = self.inner.installed.write();
		if let Some(index) = installed.iter().position(|l| *l == locale) {
			return LocaleHandle(index as u64);
		}
		installed.push(locale);
		LocaleHandle((installed.len() - 1) as u64)
	}

	/// Signals that startup completed.
	pub fn mark_ready(&self) {
		self.inner.ready.send_replace(true);
	}

	/// Selects an installed locale and announces the change.
	///
	/// Reselecting the current locale is accepted without a notification.
	pub fn select(&self, locale: &LocaleIdentifier) -> Result<(), LocaleError> {
		if !self.inner.installed.read().contains(locale) {
			return Err(LocaleError::Unavailable(locale.clone()));
		}

		let changed = self.inner.selected.send_if_modified(|selected| {
			if selected.as_ref() == Some(locale) {
				false
			} else {
				*selected = Some(locale.clone());
				true
			}
		});
		if changed {
			tracing::info!(locale = %locale, receivers = self.inner.changes.receiver_count(), "l10n.selector.changed");
			// No receivers is fine: nobody is tracking locale changes yet.
			let _ = self.inner.changes.send(locale.clone());
		}
		Ok(())
	}

	/// Currently selected locale.
	pub fn selected(&self) -> Option<LocaleIdentifier> {
		self.inner.selected.borrow().clone()
	}

	/// Number of live change subscriptions.
	pub fn subscriber_count(&self) -> usize {
		self.inner.changes.receiver_count()
	}

	/// Shuts the selector down; pending [`LocaleSubsystem::selected_locale`]
	/// calls resolve with `None`.
	pub fn close(&self) {
		self.inner.closed.cancel();
	}
}

#[async_trait]
impl LocaleSubsystem for LocaleSelector {
	async fn ready(&self) {
		let mut ready = self.inner.ready.subscribe();
		while !*ready.borrow_and_update() {
			tokio::select! {
				changed = ready.changed() => if changed.is_err() { return },
				_ = self.inner.closed.cancelled() => return,
			}
		}
	}

	async fn selected_locale(&self) -> Option<LocaleIdentifier> {
		let mut selected = self.inner.selected.subscribe();
		loop {
			let current = selected.borrow_and_update().clone();
			if current.is_some() {
				return current;
			}
			tokio::select! {
				changed = selected.changed() => changed.ok()?,
				_ = self.inner.closed.cancelled() => return None,
			}
		}
	}

	fn available_locales(&self) -> Vec<AvailableLocale> {
		self.inner
			.installed
			.read()
			.iter()
			.enumerate()
			.map(|(index, identifier)| AvailableLocale {
				identifier: identifier.clone(),
				handle: LocaleHandle(index as u64),
			})
			.collect()
	}

	fn set_selected(&self, handle: LocaleHandle) -> Result<(), LocaleError> {
		let locale = self.inner.installed.read().get(handle.0 as usize).cloned();
		match locale {
			Some(locale) => self.select(&locale),
			None => Err(LocaleError::StaleHandle(handle)),
		}
	}

	fn subscribe(&self) -> broadcast::Receiver<LocaleIdentifier> {
		self.inner.changes.subscribe()
	}
}
