//! Localization service: table cache, locale switching and reload protocol.
//!
//! The service owns one cache entry per configured table. Every locale change
//! announced by the [`LocaleSubsystem`] reloads all tables under a fresh
//! generation, cancelling the previous one first. Loads fan out on the worker
//! runtime; results are committed only while their generation is still live,
//! so a slow superseded load can never overwrite fresher data. Lookups only
//! take a read lock on the cache and never wait for a reload.

mod cache;
mod listeners;
#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::{Arc, OnceLock};

use loctab_worker::{GenerationScope, GenerationToken, TaskClass, WorkerJoinSet};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use self::cache::{TableCache, TrackedTable, TrackedTables};
use self::listeners::UpdateListeners;
pub use self::listeners::UpdateSubscription;
use crate::config::{ConfigSource, LocalizationConfig, ServiceOptions};
use crate::error::{InitError, LoadError, LocaleError, LookupError};
use crate::locale::LocaleIdentifier;
use crate::provider::TableTypeProvider;
use crate::source::{LocaleSubsystem, TableLoader};
use crate::table::StringTable;

/// Lifecycle of a [`LocalizationService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceState {
	/// [`LocalizationService::initialize`] has not run, or its last attempt failed.
	Uninitialized,
	/// Initialization is in progress.
	Initializing,
	/// The cache skeleton exists and the first reload finished.
	Ready,
}

/// Localized string cache keyed by `P::Key`.
///
/// Cloning yields another handle to the same service. The service is torn
/// down by [`Self::dispose`] or when the last handle is dropped.
pub struct LocalizationService<P: TableTypeProvider> {
	inner: Arc<Inner<P>>,
}

struct Inner<P: TableTypeProvider> {
	provider: P,
	loader: Arc<dyn TableLoader>,
	locales: Arc<dyn LocaleSubsystem>,
	config_source: Arc<dyn ConfigSource>,
	options: ServiceOptions,
	state: watch::Sender<ServiceState>,
	tracked: OnceLock<TrackedTables<P::Key>>,
	cache: RwLock<TableCache<P::Key>>,
	locale: RwLock<Option<LocaleIdentifier>>,
	reloads: GenerationScope,
	subscription: Mutex<Option<CancellationToken>>,
	listeners: UpdateListeners<LocalizationService<P>>,
}

impl<P: TableTypeProvider> Inner<P> {
	fn unsubscribe(&self) -> bool {
		match self.subscription.lock().take() {
			Some(stop) => {
				stop.cancel();
				true
			}
			None => false,
		}
	}
}

impl<P: TableTypeProvider> Drop for Inner<P> {
	fn drop(&mut self) {
		self.unsubscribe();
		self.reloads.close();
	}
}

/// Reverts a claimed initialization that did not complete.
struct InitGuard<'a, P: TableTypeProvider> {
	inner: &'a Inner<P>,
	armed: bool,
}

impl<P: TableTypeProvider> Drop for InitGuard<'_, P> {
	fn drop(&mut self) {
		if self.armed {
			self.inner.unsubscribe();
			self.inner.reloads.cancel_current();
			self.inner.state.send_replace(ServiceState::Uninitialized);
		}
	}
}

impl<P: TableTypeProvider> Clone for LocalizationService<P> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<P: TableTypeProvider> fmt::Debug for LocalizationService<P> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LocalizationService")
			.field("state", &self.state())
			.field("locale", &self.current_locale())
			.field("generation", &self.inner.reloads.current_generation())
			.finish_non_exhaustive()
	}
}

impl<P: TableTypeProvider> LocalizationService<P> {
	/// Creates an uninitialized service with default options.
	pub fn new(provider: P, loader: Arc<dyn TableLoader>, locales: Arc<dyn LocaleSubsystem>, config_source: Arc<dyn ConfigSource>) -> Self {
		Self::with_options(provider, loader, locales, config_source, ServiceOptions::default())
	}

	/// Creates an uninitialized service.
	pub fn with_options(
		provider: P,
		loader: Arc<dyn TableLoader>,
		locales: Arc<dyn LocaleSubsystem>,
		config_source: Arc<dyn ConfigSource>,
		options: ServiceOptions,
	) -> Self {
		Self {
			inner: Arc::new(Inner {
				provider,
				loader,
				locales,
				config_source,
				options,
				state: watch::Sender::new(ServiceState::Uninitialized),
				tracked: OnceLock::new(),
				cache: RwLock::new(TableCache::default()),
				locale: RwLock::new(None),
				reloads: GenerationScope::new(),
				subscription: Mutex::new(None),
				listeners: UpdateListeners::new(),
			}),
		}
	}

	/// Current lifecycle state.
	pub fn state(&self) -> ServiceState {
		*self.inner.state.borrow()
	}

	/// Returns `true` once initialization completed.
	pub fn is_ready(&self) -> bool {
		self.state() == ServiceState::Ready
	}

	/// Locale of the last settled reload.
	pub fn current_locale(&self) -> Option<LocaleIdentifier> {
		self.inner.locale.read().clone()
	}

	/// Registry read during initialization.
	pub fn config(&self) -> Option<&LocalizationConfig> {
		self.inner.tracked.get().map(|tracked| &tracked.config)
	}

	/// Names of configured tables that currently hold data, in registry order.
	pub fn loaded_tables(&self) -> Vec<&str> {
		let Some(tracked) = self.inner.tracked.get() else {
			return Vec::new();
		};
		let cache = self.inner.cache.read();
		tracked
			.tables
			.iter()
			.filter(|table| cache.is_loaded(&table.key))
			.map(|table| table.name.as_str())
			.collect()
	}

	/// String returned by lookups that cannot be served.
	pub fn sentinel(&self) -> &str {
		&self.inner.options.sentinel
	}

	/// Table type provider.
	pub fn provider(&self) -> &P {
		&self.inner.provider
	}

	/// Brings the service to [`ServiceState::Ready`].
	///
	/// Waits for the locale subsystem to start and select a locale, reads the
	/// registry, allocates one cache entry per table, subscribes to locale
	/// changes and performs the first reload. Only the first caller does the
	/// work; concurrent callers wait for its outcome and later callers return
	/// immediately. A failed attempt leaves the service uninitialized so it
	/// can be retried.
	pub async fn initialize(&self) -> Result<(), InitError> {
		if self.is_disposed() {
			return Err(InitError::Disposed);
		}
		let claimed = self.inner.state.send_if_modified(|state| {
			if *state == ServiceState::Uninitialized {
				*state = ServiceState::Initializing;
				true
			} else {
				false
			}
		});
		if !claimed {
			trace!("l10n.init.join");
			return self.wait_initialized().await;
		}

		info!(config_id = %self.inner.options.config_id, "l10n.init.start");
		let mut guard = InitGuard {
			inner: &self.inner,
			armed: true,
		};
		match self.run_initialize().await {
			Ok(()) => {
				guard.armed = false;
				Ok(())
			}
			Err(err) => {
				warn!(error = %err, "l10n.init.failed");
				Err(err)
			}
		}
	}

	async fn run_initialize(&self) -> Result<(), InitError> {
		let inner = &self.inner;

		inner.locales.ready().await;
		debug!("l10n.init.subsystem_ready");
		let initial = inner.locales.selected_locale().await.ok_or(InitError::NoLocaleSelected)?;

		let config = inner.config_source.load(&inner.options.config_id).await?;
		let tracked = inner.tracked.get_or_init(|| TrackedTables::resolve(&inner.provider, config));
		*inner.cache.write() = TableCache::with_keys(tracked.tables.iter().map(|table| &table.key));

		if inner.reloads.is_closed() {
			return Err(InitError::Disposed);
		}
		self.subscribe_locale_changes();

		// The generation is claimed before the selection is re-read: a change
		// announced after this point supersedes the initial reload, and one
		// announced before the subscription existed is only visible in the read.
		let token = inner.reloads.replace();
		let locale = inner.locales.selected_locale().await.unwrap_or(initial);
		let settled = self.reload(&locale, &token, TaskClass::Interactive).await;
		if inner.reloads.is_closed() {
			return Err(InitError::Disposed);
		}

		inner.state.send_if_modified(promote_to_ready);
		info!(locale = %locale, tables = tracked.len(), cached = inner.cache.read().len(), settled, "l10n.init.ready");
		if settled {
			self.notify_updated();
		}
		Ok(())
	}

	async fn wait_initialized(&self) -> Result<(), InitError> {
		let mut state = self.inner.state.subscribe();
		loop {
			let current = *state.borrow_and_update();
			match current {
				ServiceState::Ready => return Ok(()),
				ServiceState::Uninitialized => return Err(InitError::Aborted),
				ServiceState::Initializing => {}
			}
			if state.changed().await.is_err() {
				return Err(InitError::Aborted);
			}
		}
	}

	/// Asks the locale subsystem to select `locale`.
	///
	/// Returns as soon as the request is accepted; tables reload when the
	/// subsystem announces the change, after which update callbacks run.
	/// Fails without touching the cache when the service is not ready or the
	/// subsystem does not offer `locale`.
	pub fn set_locale(&self, locale: impl Into<LocaleIdentifier>) -> Result<(), LocaleError> {
		let locale = locale.into();
		if !self.is_ready() {
			warn!(locale = %locale, "l10n.set_locale.not_initialized");
			return Err(LocaleError::NotInitialized);
		}

		let available = self.inner.locales.available_locales();
		let Some(found) = available.into_iter().find(|candidate| candidate.identifier == locale) else {
			warn!(locale = %locale, "l10n.set_locale.unavailable");
			return Err(LocaleError::Unavailable(locale));
		};

		info!(locale = %locale, "l10n.set_locale");
		self.inner.locales.set_selected(found.handle)
	}

	/// Localized entry of a table, or the sentinel.
	pub fn localized(&self, table: &str, entry: &str) -> String {
		self.localized_with(table, entry, &[])
	}

	/// Localized entry of a table with `{name}` arguments, or the sentinel.
	pub fn localized_with(&self, table: &str, entry: &str, args: &[(&str, &str)]) -> String {
		let key = self.inner.provider.key(table);
		self.localized_by_key_with(&key, entry, args)
	}

	/// Localized entry of the table under `key`, or the sentinel.
	pub fn localized_by_key(&self, key: &P::Key, entry: &str) -> String {
		self.localized_by_key_with(key, entry, &[])
	}

	/// Localized entry of the table under `key` with `{name}` arguments, or the sentinel.
	pub fn localized_by_key_with(&self, key: &P::Key, entry: &str, args: &[(&str, &str)]) -> String {
		self.try_localized_by_key(key, entry, args)
			.unwrap_or_else(|_| self.sentinel().to_owned())
	}

	/// Like [`Self::localized`] but reports why the sentinel would be used.
	pub fn try_localized(&self, table: &str, entry: &str) -> Result<String, LookupError> {
		let key = self.inner.provider.key(table);
		self.try_localized_by_key(&key, entry, &[])
	}

	/// Like [`Self::localized_by_key_with`] but reports why the sentinel would be used.
	pub fn try_localized_by_key(&self, key: &P::Key, entry: &str, args: &[(&str, &str)]) -> Result<String, LookupError> {
		if !self.is_ready() {
			return Err(LookupError::NotReady);
		}
		if !self.inner.provider.is_available(key) {
			return Err(LookupError::Unavailable);
		}
		if entry.is_empty() {
			return Err(LookupError::EmptyEntry);
		}

		let table = match self.inner.cache.read().get(key) {
			None => return Err(LookupError::NotTracked),
			Some(None) => return Err(LookupError::NotLoaded),
			Some(Some(table)) => Arc::clone(table),
		};
		Ok(table.localized_with(entry, args)?)
	}

	/// Registers `callback` to run after every settled reload.
	///
	/// Callbacks run on the task that finished the reload and receive the
	/// service so they can re-query instead of caching strings.
	pub fn on_locale_update<F>(&self, callback: F) -> UpdateSubscription
	where
		F: Fn(&LocalizationService<P>) + Send + Sync + 'static,
	{
		self.inner.listeners.subscribe(Arc::new(callback))
	}

	/// Unsubscribes from locale changes, cancels any reload in flight and
	/// drops every update callback. Idempotent.
	///
	/// Lookups keep serving whatever is cached. An [`Self::initialize`] still
	/// in progress fails with [`InitError::Disposed`] and leaves no subscription.
	pub fn dispose(&self) {
		let unsubscribed = self.inner.unsubscribe();
		self.inner.reloads.close();
		self.inner.listeners.clear();
		debug!(unsubscribed, "l10n.dispose");
	}

	/// Returns `true` after [`Self::dispose`].
	pub fn is_disposed(&self) -> bool {
		self.inner.reloads.is_closed()
	}

	fn subscribe_locale_changes(&self) {
		let mut changes = self.inner.locales.subscribe();
		let stop = CancellationToken::new();
		if let Some(previous) = self.inner.subscription.lock().replace(stop.clone()) {
			previous.cancel();
		}
		let weak = Arc::downgrade(&self.inner);
		debug!("l10n.locale_change.subscribed");

		loctab_worker::spawn(TaskClass::Listener, async move {
			loop {
				let locale = tokio::select! {
					biased;
					_ = stop.cancelled() => break,
					received = changes.recv() => match received {
						Ok(locale) => locale,
						Err(broadcast::error::RecvError::Lagged(skipped)) => {
							warn!(skipped, "l10n.locale_change.lagged");
							continue;
						}
						Err(broadcast::error::RecvError::Closed) => break,
					},
				};
				let Some(inner) = weak.upgrade() else {
					break;
				};
				LocalizationService { inner }.begin_reload(locale);
			}
			debug!("l10n.locale_change.unsubscribed");
		});
	}

	/// Supersedes any reload in flight with one for `locale`.
	fn begin_reload(&self, locale: LocaleIdentifier) -> JoinHandle<()> {
		let token = self.inner.reloads.replace();
		debug!(generation = token.generation(), locale = %locale, "l10n.reload.scheduled");
		let service = self.clone();
		loctab_worker::spawn(TaskClass::Background, async move {
			if service.reload(&locale, &token, TaskClass::Background).await {
				service.inner.state.send_if_modified(promote_to_ready);
				service.notify_updated();
			}
		})
	}

	/// Loads every tracked table for `locale` under `token`.
	///
	/// Returns `true` when the generation settled, i.e. was never cancelled.
	async fn reload(&self, locale: &LocaleIdentifier, token: &GenerationToken, class: TaskClass) -> bool {
		let Some(tracked) = self.inner.tracked.get() else {
			return false;
		};
		let generation = token.generation();
		debug!(generation, locale = %locale, tables = tracked.len(), "l10n.reload.start");

		let mut loads = WorkerJoinSet::new(class);
		for (index, table) in tracked.tables.iter().enumerate() {
			let loader = Arc::clone(&self.inner.loader);
			let reference = table.reference.clone();
			let locale = locale.clone();
			let token = token.clone();
			loads.spawn(async move {
				let result = tokio::select! {
					biased;
					_ = token.cancelled() => Err(LoadError::Cancelled),
					result = loader.load(&reference, &locale, token.cancellation()) => result,
				};
				(index, result)
			});
		}

		let mut committed = 0usize;
		let mut failed = 0usize;
		let panicked = loads
			.for_each_ready(|(index, result)| {
				let table = &tracked.tables[index];
				match result {
					Ok(data) => {
						if self.commit(table, data, token) {
							committed += 1;
						}
					}
					Err(LoadError::Cancelled) => trace!(generation, table = %table.name, "l10n.reload.load_cancelled"),
					Err(error) => {
						failed += 1;
						warn!(generation, table = %table.name, locale = %locale, %error, "l10n.reload.table_failed");
					}
				}
			})
			.await;

		let settled = {
			let _cache = self.inner.cache.write();
			if token.is_cancelled() {
				false
			} else {
				*self.inner.locale.write() = Some(locale.clone());
				true
			}
		};
		debug!(generation, committed, failed = failed + panicked, settled, "l10n.reload.finish");
		settled
	}

	/// Commits one table unless its generation was superseded.
	fn commit(&self, table: &TrackedTable<P::Key>, data: StringTable, token: &GenerationToken) -> bool {
		let mut cache = self.inner.cache.write();
		if token.is_cancelled() {
			trace!(generation = token.generation(), table = %table.name, "l10n.reload.stale_discarded");
			return false;
		}
		trace!(generation = token.generation(), table = %table.name, entries = data.len(), "l10n.reload.commit");
		cache.commit(&table.key, Arc::new(data))
	}

	fn notify_updated(&self) {
		let listeners = self.inner.listeners.notify(self);
		debug!(listeners, "l10n.update.notified");
	}
}

fn promote_to_ready(state: &mut ServiceState) -> bool {
	if *state == ServiceState::Initializing {
		*state = ServiceState::Ready;
		true
	} else {
		false
	}
}
