use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Monotonic generation clock.
#[derive(Debug, Default, Clone)]
pub struct GenerationClock {
	next: Arc<AtomicU64>,
}

impl GenerationClock {
	/// Creates a new generation clock starting at generation 1.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the next generation ID.
	pub fn next(&self) -> u64 {
		self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}
}

/// Cancellation token tagged with the generation it governs.
#[derive(Debug, Clone)]
pub struct GenerationToken {
	generation: u64,
	cancel: CancellationToken,
}

impl GenerationToken {
	/// Creates a new generation token.
	pub fn new(generation: u64, cancel: CancellationToken) -> Self {
		Self { generation, cancel }
	}

	/// Returns generation ID.
	pub const fn generation(&self) -> u64 {
		self.generation
	}

	/// Returns true when cancellation is requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Requests cancellation. Cancelling twice is a no-op.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Future resolving when cancellation is requested.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Returns the raw token handed to collaborators that only understand
	/// [`CancellationToken`]. Cancelling it cancels this generation.
	pub fn cancellation(&self) -> CancellationToken {
		self.cancel.clone()
	}
}

/// Owner of the single "current" generation.
///
/// [`Self::replace`] cancels whatever generation is current before handing
/// out the next one, so at most one generation is ever live. Every method is
/// safe to call when nothing is current.
#[derive(Debug, Default)]
pub struct GenerationScope {
	clock: GenerationClock,
	parent: CancellationToken,
	current: Mutex<Option<GenerationToken>>,
}

impl GenerationScope {
	/// Creates an empty scope.
	pub fn new() -> Self {
		Self::default()
	}

	/// Cancels the current generation, if any, and installs a fresh one.
	///
	/// Tokens are children of the scope, so [`Self::close`] also cancels any
	/// generation handed out later by mistake.
	pub fn replace(&self) -> GenerationToken {
		let next = GenerationToken::new(self.clock.next(), self.parent.child_token());
		let previous = self.current.lock().replace(next.clone());
		if let Some(previous) = previous {
			tracing::trace!(superseded = previous.generation(), generation = next.generation(), "worker.generation.replace");
			previous.cancel();
		}
		next
	}

	/// Cancels and clears the current generation. Returns its ID, if one was live.
	pub fn cancel_current(&self) -> Option<u64> {
		let previous = self.current.lock().take()?;
		previous.cancel();
		Some(previous.generation())
	}

	/// Returns the ID of the live generation.
	pub fn current_generation(&self) -> Option<u64> {
		self.current.lock().as_ref().map(GenerationToken::generation)
	}

	/// Returns true when `token` is the live generation and is not cancelled.
	pub fn is_current(&self, token: &GenerationToken) -> bool {
		!token.is_cancelled() && self.current_generation() == Some(token.generation())
	}

	/// Cancels the current generation and every generation issued afterwards.
	pub fn close(&self) {
		self.parent.cancel();
		self.cancel_current();
	}

	/// Returns true once [`Self::close`] has been called.
	pub fn is_closed(&self) -> bool {
		self.parent.is_cancelled()
	}
}
