use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::sync::{Notify, mpsc, watch};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::adapters::{LocaleSelector, MemoryTableLoader};
use crate::config::{NOT_FOUND, StaticConfigSource};
use crate::error::ConfigError;
use crate::provider::DefaultTableTypeProvider;
use crate::table::TableReference;

const WAIT: Duration = Duration::from_secs(5);

fn id(code: &str) -> LocaleIdentifier {
	LocaleIdentifier::parse(code).unwrap()
}

fn registry() -> Arc<StaticConfigSource> {
	Arc::new(StaticConfigSource::new(LocalizationConfig::new([id("en"), id("fr"), id("de")], ["ui", "dialogue"])))
}

fn library() -> MemoryTableLoader {
	let loader = MemoryTableLoader::new();
	loader.insert(&id("en"), "ui", [("greeting", "Hello"), ("welcome", "Welcome, {name}")]);
	loader.insert(&id("en"), "dialogue", [("intro", "Once upon a time")]);
	loader.insert(&id("fr"), "ui", [("greeting", "Bonjour"), ("welcome", "Bienvenue, {name}")]);
	loader.insert(&id("fr"), "dialogue", [("intro", "Il était une fois")]);
	loader.insert(&id("de"), "ui", [("greeting", "Hallo")]);
	loader.insert(&id("de"), "dialogue", [("intro", "Es war einmal")]);
	loader
}

struct Fixture<L> {
	service: LocalizationService<DefaultTableTypeProvider>,
	selector: LocaleSelector,
	loader: Arc<L>,
}

fn fixture_with<L: TableLoader + 'static>(loader: L, selector: LocaleSelector) -> Fixture<L> {
	let loader = Arc::new(loader);
	let service = LocalizationService::new(DefaultTableTypeProvider, loader.clone(), Arc::new(selector.clone()), registry());
	Fixture { service, selector, loader }
}

fn fixture() -> Fixture<MemoryTableLoader> {
	fixture_with(library(), LocaleSelector::started([id("en"), id("fr"), id("de")], id("en")))
}

/// Forwards the settled locale of every update notification.
fn record_updates(service: &LocalizationService<DefaultTableTypeProvider>) -> (UpdateSubscription, mpsc::UnboundedReceiver<Option<LocaleIdentifier>>) {
	let (tx, rx) = mpsc::unbounded_channel();
	let sub = service.on_locale_update(move |service| {
		let _ = tx.send(service.current_locale());
	});
	(sub, rx)
}

async fn next_update(rx: &mut mpsc::UnboundedReceiver<Option<LocaleIdentifier>>) -> Option<LocaleIdentifier> {
	timeout(WAIT, rx.recv()).await.expect("update notification timed out").expect("update channel closed")
}

/// Holds loads for one locale, optionally only one of its tables, until
/// [`Self::open`] is called.
struct GatedLoader {
	data: MemoryTableLoader,
	gated: LocaleIdentifier,
	table: Option<&'static str>,
	open: watch::Sender<bool>,
	started: Notify,
}

impl GatedLoader {
	fn new(data: MemoryTableLoader, gated: LocaleIdentifier) -> Self {
		Self {
			data,
			gated,
			table: None,
			open: watch::Sender::new(false),
			started: Notify::new(),
		}
	}

	fn for_table(data: MemoryTableLoader, gated: LocaleIdentifier, table: &'static str) -> Self {
		Self {
			table: Some(table),
			..Self::new(data, gated)
		}
	}

	fn open(&self) {
		self.open.send_replace(true);
	}
}

#[async_trait]
impl TableLoader for GatedLoader {
	async fn load(&self, reference: &TableReference, locale: &LocaleIdentifier, cancel: CancellationToken) -> Result<StringTable, LoadError> {
		if *locale == self.gated && self.table.is_none_or(|table| table == reference.name()) {
			self.started.notify_one();
			let mut open = self.open.subscribe();
			let _ = open.wait_for(|open| *open).await;
		}
		self.data.load(reference, locale, cancel).await
	}
}

/// Changes the selection while the service re-reads it during startup, then
/// reports the selection it saw before the change.
struct ShiftingSubsystem {
	selector: LocaleSelector,
	reads: AtomicUsize,
	shift_to: LocaleIdentifier,
}

#[async_trait]
impl LocaleSubsystem for ShiftingSubsystem {
	async fn ready(&self) {
		self.selector.ready().await;
	}

	async fn selected_locale(&self) -> Option<LocaleIdentifier> {
		let seen = self.selector.selected_locale().await;
		if self.reads.fetch_add(1, Ordering::SeqCst) == 1 {
			self.selector.select(&self.shift_to).unwrap();
			tokio::time::sleep(Duration::from_millis(50)).await;
		}
		seen
	}

	fn available_locales(&self) -> Vec<crate::source::AvailableLocale> {
		self.selector.available_locales()
	}

	fn set_selected(&self, handle: crate::source::LocaleHandle) -> Result<(), LocaleError> {
		self.selector.set_selected(handle)
	}

	fn subscribe(&self) -> tokio::sync::broadcast::Receiver<LocaleIdentifier> {
		self.selector.subscribe()
	}
}

struct FlakyConfigSource {
	attempts: AtomicUsize,
	config: LocalizationConfig,
}

#[async_trait]
impl ConfigSource for FlakyConfigSource {
	async fn load(&self, config_id: &str) -> Result<LocalizationConfig, ConfigError> {
		if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
			return Err(ConfigError::NotFound(config_id.to_owned()));
		}
		Ok(self.config.clone())
	}
}

#[tokio::test]
async fn lookups_before_initialize_return_sentinel() {
	let f = fixture();
	assert_eq!(f.service.state(), ServiceState::Uninitialized);
	assert_eq!(f.service.localized("ui", "greeting"), NOT_FOUND);
	assert_eq!(f.service.try_localized("ui", "greeting"), Err(LookupError::NotReady));
	assert!(f.service.loaded_tables().is_empty());
	assert_eq!(f.loader.load_count(), 0);
}

#[tokio::test]
async fn initialize_loads_every_configured_table() {
	let f = fixture();
	f.service.initialize().await.unwrap();

	assert!(f.service.is_ready());
	assert_eq!(f.service.current_locale(), Some(id("en")));
	assert_eq!(f.service.loaded_tables(), vec!["ui", "dialogue"]);
	assert_eq!(f.service.localized("ui", "greeting"), "Hello");
	assert_eq!(f.service.localized("dialogue", "intro"), "Once upon a time");
	assert_eq!(f.service.config().map(|c| c.tables.len()), Some(2));
	assert_eq!(f.loader.load_count(), 2);
}

#[tokio::test]
async fn lookup_edge_cases_fall_back_to_sentinel() {
	let f = fixture();
	f.service.initialize().await.unwrap();

	assert_eq!(f.service.localized("combat", "attack"), NOT_FOUND);
	assert_eq!(f.service.try_localized("combat", "attack"), Err(LookupError::NotTracked));
	assert_eq!(f.service.try_localized("ui", ""), Err(LookupError::EmptyEntry));
	assert_eq!(f.service.localized("ui", "missing"), NOT_FOUND);
	assert_eq!(
		f.service.try_localized("ui", "missing"),
		Err(LookupError::Entry(crate::error::EntryError::Missing("missing".into())))
	);
	assert_eq!(f.service.localized_with("ui", "welcome", &[("name", "Ada")]), "Welcome, Ada");
	assert_eq!(f.service.localized_with("ui", "welcome", &[]), NOT_FOUND);
}

#[tokio::test]
async fn concurrent_initialize_runs_once() {
	let selector = LocaleSelector::new([id("en"), id("fr")]);
	let f = fixture_with(library(), selector);

	let (a, b, ()) = tokio::join!(f.service.initialize(), f.service.initialize(), async {
		tokio::time::sleep(Duration::from_millis(10)).await;
		assert_eq!(f.service.state(), ServiceState::Initializing);
		f.selector.select(&id("en")).unwrap();
		f.selector.mark_ready();
	});
	a.unwrap();
	b.unwrap();

	f.service.initialize().await.unwrap();
	assert_eq!(f.selector.subscriber_count(), 1);
	assert_eq!(f.loader.load_count(), 2);
}

#[tokio::test]
async fn initialize_waits_for_a_selected_locale() {
	let selector = LocaleSelector::new([id("en")]);
	let f = fixture_with(library(), selector);
	f.selector.close();

	assert!(matches!(f.service.initialize().await, Err(InitError::NoLocaleSelected)));
	assert_eq!(f.service.state(), ServiceState::Uninitialized);
	assert_eq!(f.selector.subscriber_count(), 0);
}

#[tokio::test]
async fn failed_initialize_can_be_retried() {
	let selector = LocaleSelector::started([id("en")], id("en"));
	let loader = Arc::new(library());
	let config = Arc::new(FlakyConfigSource {
		attempts: AtomicUsize::new(0),
		config: LocalizationConfig::new([id("en")], ["ui"]),
	});
	let service = LocalizationService::new(DefaultTableTypeProvider, loader.clone(), Arc::new(selector.clone()), config);

	assert!(matches!(service.initialize().await, Err(InitError::Config(ConfigError::NotFound(_)))));
	assert_eq!(service.state(), ServiceState::Uninitialized);
	assert_eq!(loader.load_count(), 0);

	service.initialize().await.unwrap();
	assert_eq!(service.localized("ui", "greeting"), "Hello");
	assert_eq!(selector.subscriber_count(), 1);
}

#[tokio::test]
async fn set_locale_before_ready_is_rejected() {
	let f = fixture();
	assert_eq!(f.service.set_locale(id("fr")), Err(LocaleError::NotInitialized));
	assert_eq!(f.selector.selected(), Some(id("en")));
}

#[tokio::test]
async fn set_locale_rejects_unavailable_locale_without_reloading() {
	let f = fixture();
	f.service.initialize().await.unwrap();
	let loads = f.loader.load_count();

	assert_eq!(f.service.set_locale(id("ja")), Err(LocaleError::Unavailable(id("ja"))));
	tokio::time::sleep(Duration::from_millis(20)).await;

	assert_eq!(f.loader.load_count(), loads);
	assert_eq!(f.service.current_locale(), Some(id("en")));
	assert_eq!(f.service.localized("ui", "greeting"), "Hello");
}

#[tokio::test]
async fn switching_locale_reloads_and_notifies_once() {
	let f = fixture();
	f.service.initialize().await.unwrap();
	let (_sub, mut updates) = record_updates(&f.service);

	f.service.set_locale(id("fr")).unwrap();
	assert_eq!(next_update(&mut updates).await, Some(id("fr")));

	assert_eq!(f.service.localized("ui", "greeting"), "Bonjour");
	assert_eq!(f.service.localized("dialogue", "intro"), "Il était une fois");
	assert_eq!(f.loader.load_count(), 4);

	tokio::time::sleep(Duration::from_millis(20)).await;
	assert!(updates.try_recv().is_err());
}

#[tokio::test]
async fn reselecting_current_locale_does_not_reload() {
	let f = fixture();
	f.service.initialize().await.unwrap();
	let (_sub, mut updates) = record_updates(&f.service);

	f.service.set_locale(id("en")).unwrap();
	tokio::time::sleep(Duration::from_millis(20)).await;

	assert_eq!(f.loader.load_count(), 2);
	assert!(updates.try_recv().is_err());
}

#[tokio::test]
async fn failed_table_keeps_previous_locale_data() {
	let f = fixture();
	f.service.initialize().await.unwrap();
	f.loader.remove(&id("fr"), "dialogue");
	let (_sub, mut updates) = record_updates(&f.service);

	f.service.set_locale(id("fr")).unwrap();
	assert_eq!(next_update(&mut updates).await, Some(id("fr")));

	assert_eq!(f.service.localized("ui", "greeting"), "Bonjour");
	assert_eq!(f.service.localized("dialogue", "intro"), "Once upon a time");
}

#[tokio::test]
async fn superseded_reload_never_overwrites_newer_locale() {
	let f = fixture_with(GatedLoader::new(library(), id("fr")), LocaleSelector::started([id("en"), id("fr"), id("de")], id("en")));
	f.service.initialize().await.unwrap();
	let (_sub, mut updates) = record_updates(&f.service);

	f.service.set_locale(id("fr")).unwrap();
	timeout(WAIT, f.loader.started.notified()).await.unwrap();

	f.service.set_locale(id("de")).unwrap();
	assert_eq!(next_update(&mut updates).await, Some(id("de")));

	f.loader.open();
	tokio::time::sleep(Duration::from_millis(50)).await;

	assert_eq!(f.service.current_locale(), Some(id("de")));
	assert_eq!(f.service.localized("ui", "greeting"), "Hallo");
	assert_eq!(f.service.localized("dialogue", "intro"), "Es war einmal");
	assert!(updates.try_recv().is_err());
}

#[tokio::test]
async fn dropped_subscription_stops_notifications() {
	let f = fixture();
	f.service.initialize().await.unwrap();
	let hits = Arc::new(AtomicUsize::new(0));
	let sub = f.service.on_locale_update({
		let hits = Arc::clone(&hits);
		move |_| {
			hits.fetch_add(1, Ordering::SeqCst);
		}
	});
	let (_probe, mut updates) = record_updates(&f.service);

	f.service.set_locale(id("fr")).unwrap();
	next_update(&mut updates).await;
	drop(sub);
	f.service.set_locale(id("de")).unwrap();
	next_update(&mut updates).await;

	assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dispose_unsubscribes_and_keeps_cache() {
	let f = fixture();
	f.service.initialize().await.unwrap();
	assert_eq!(f.selector.subscriber_count(), 1);

	f.service.dispose();
	f.service.dispose();
	assert!(f.service.is_disposed());

	timeout(WAIT, async {
		while f.selector.subscriber_count() > 0 {
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
	})
	.await
	.unwrap();

	f.selector.select(&id("fr")).unwrap();
	tokio::time::sleep(Duration::from_millis(20)).await;
	assert_eq!(f.loader.load_count(), 2);
	assert_eq!(f.service.localized("ui", "greeting"), "Hello");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Table {
	Ui,
	Dialogue,
	Unknown,
}

struct GameTables;

impl TableTypeProvider for GameTables {
	type Key = Table;

	fn key(&self, table: &str) -> Table {
		match table {
			"ui" => Table::Ui,
			"dialogue" => Table::Dialogue,
			_ => Table::Unknown,
		}
	}

	fn is_available(&self, key: &Table) -> bool {
		*key != Table::Dialogue
	}
}

#[tokio::test]
async fn typed_keys_respect_availability() {
	let selector = LocaleSelector::started([id("en")], id("en"));
	let service = LocalizationService::new(GameTables, Arc::new(library()), Arc::new(selector), registry());
	service.initialize().await.unwrap();

	assert_eq!(service.localized_by_key(&Table::Ui, "greeting"), "Hello");
	assert_eq!(service.localized("ui", "greeting"), "Hello");
	assert_eq!(service.try_localized_by_key(&Table::Dialogue, "intro", &[]), Err(LookupError::Unavailable));
	assert_eq!(service.try_localized_by_key(&Table::Unknown, "intro", &[]), Err(LookupError::NotTracked));
}

#[tokio::test]
async fn custom_sentinel_is_used() {
	let selector = LocaleSelector::started([id("en")], id("en"));
	let options = ServiceOptions {
		sentinel: "??".into(),
		..ServiceOptions::default()
	};
	let service = LocalizationService::with_options(DefaultTableTypeProvider, Arc::new(library()), Arc::new(selector), registry(), options);

	assert_eq!(service.localized("ui", "greeting"), "??");
	service.initialize().await.unwrap();
	assert_eq!(service.localized("ui", "nope"), "??");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn selection_change_during_startup_wins_over_initial_locale() {
	let selector = LocaleSelector::started([id("en"), id("fr")], id("en"));
	let subsystem = Arc::new(ShiftingSubsystem {
		selector: selector.clone(),
		reads: AtomicUsize::new(0),
		shift_to: id("fr"),
	});
	let service = LocalizationService::new(DefaultTableTypeProvider, Arc::new(library()), subsystem, registry());

	service.initialize().await.unwrap();
	timeout(WAIT, async {
		while service.current_locale() != selector.selected() {
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
	})
	.await
	.unwrap();

	assert_eq!(service.current_locale(), Some(id("fr")));
	assert_eq!(service.localized("ui", "greeting"), "Bonjour");
}

#[tokio::test]
async fn dispose_during_initialize_leaves_no_subscription() {
	let selector = LocaleSelector::new([id("en")]);
	let f = fixture_with(library(), selector);
	let pending = {
		let service = f.service.clone();
		tokio::spawn(async move { service.initialize().await })
	};

	tokio::time::sleep(Duration::from_millis(10)).await;
	f.service.dispose();
	f.selector.select(&id("en")).unwrap();
	f.selector.mark_ready();

	assert!(matches!(pending.await.unwrap(), Err(InitError::Disposed)));
	assert_eq!(f.service.state(), ServiceState::Uninitialized);
	assert_eq!(f.selector.subscriber_count(), 0);
	assert!(f.service.loaded_tables().is_empty());
	assert_eq!(f.loader.load_count(), 0);
	assert!(matches!(f.service.initialize().await, Err(InitError::Disposed)));
}

#[tokio::test]
async fn stalled_table_does_not_hold_back_the_others() {
	let f = fixture_with(
		GatedLoader::for_table(library(), id("fr"), "dialogue"),
		LocaleSelector::started([id("en"), id("fr")], id("en")),
	);
	f.service.initialize().await.unwrap();
	let (_sub, mut updates) = record_updates(&f.service);

	f.service.set_locale(id("fr")).unwrap();
	timeout(WAIT, f.loader.started.notified()).await.unwrap();
	timeout(WAIT, async {
		while f.service.localized("ui", "greeting") != "Bonjour" {
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
	})
	.await
	.unwrap();

	assert_eq!(f.service.localized("dialogue", "intro"), "Once upon a time");
	assert!(updates.try_recv().is_err());

	f.loader.open();
	assert_eq!(next_update(&mut updates).await, Some(id("fr")));
	assert_eq!(f.service.localized("dialogue", "intro"), "Il était une fois");
}
