use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slab::Slab;

/// Callbacks run after every settled reload.
pub(crate) struct UpdateListeners<S: ?Sized> {
	slots: Arc<Mutex<Slab<Arc<dyn Fn(&S) + Send + Sync>>>>,
}

impl<S: ?Sized + 'static> UpdateListeners<S> {
	pub fn new() -> Self {
		Self {
			slots: Arc::new(Mutex::new(Slab::new())),
		}
	}

	pub fn subscribe(&self, callback: Arc<dyn Fn(&S) + Send + Sync>) -> UpdateSubscription {
		let id = self.slots.lock().insert(callback);
		let slots: Weak<Mutex<Slab<_>>> = Arc::downgrade(&self.slots);
		UpdateSubscription {
			detach: Some(Box::new(move || {
				if let Some(slots) = slots.upgrade() {
					slots.lock().try_remove(id);
				}
			})),
		}
	}

	/// Invokes every callback once.
	///
	/// Callbacks run outside the lock so they may subscribe or unsubscribe.
	/// A panicking callback is logged and does not stop the others.
	pub fn notify(&self, subject: &S) -> usize {
		let callbacks: Vec<_> = self.slots.lock().iter().map(|(_, cb)| Arc::clone(cb)).collect();
		for callback in &callbacks {
			if catch_unwind(AssertUnwindSafe(|| callback(subject))).is_err() {
				tracing::warn!("l10n.update.listener_panicked");
			}
		}
		callbacks.len()
	}

	pub fn clear(&self) {
		self.slots.lock().clear();
	}

	#[cfg(test)]
	pub fn len(&self) -> usize {
		self.slots.lock().len()
	}
}

/// Live registration of a locale-update callback.
///
/// Dropping it unsubscribes. Use [`Self::detach`] to keep the callback for
/// the service's lifetime.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct UpdateSubscription {
	detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl UpdateSubscription {
	/// Keeps the callback registered until the service is disposed.
	pub fn detach(mut self) {
		self.detach = None;
	}

	/// Unsubscribes now.
	pub fn unsubscribe(self) {}
}

impl Drop for UpdateSubscription {
	fn drop(&mut self) {
		if let Some(detach) = self.detach.take() {
			detach();
		}
	}
}

impl std::fmt::Debug for UpdateSubscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("UpdateSubscription").field("attached", &self.detach.is_some()).finish()
	}
}
