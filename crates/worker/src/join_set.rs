use std::future::Future;

use tokio::task::{JoinError, JoinSet};

use crate::TaskClass;

/// Fan-out wrapper around a Tokio [`JoinSet`].
///
/// Spawning is routed through [`crate::current_handle`] so the set works both
/// inside an ambient runtime and from plain threads. Dropping the set aborts
/// every task still running.
#[derive(Debug)]
pub struct WorkerJoinSet<T> {
	class: TaskClass,
	inner: JoinSet<T>,
}

impl<T> WorkerJoinSet<T>
where
	T: Send + 'static,
{
	/// Creates an empty join set for the given task class.
	pub fn new(class: TaskClass) -> Self {
		Self { class, inner: JoinSet::new() }
	}

	/// Returns the number of tasks currently in the set.
	pub fn len(&self) -> usize {
		self.inner.len()
	}

	/// Returns `true` if the set is empty.
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Spawns a future into the set.
	pub fn spawn<F>(&mut self, fut: F)
	where
		F: Future<Output = T> + Send + 'static,
	{
		tracing::trace!(worker_class = self.class.as_str(), pending = self.inner.len(), "worker.join_set.spawn");
		self.inner.spawn_on(fut, &crate::current_handle());
	}

	/// Waits for the next completed task.
	pub async fn join_next(&mut self) -> Option<Result<T, JoinError>> {
		self.inner.join_next().await
	}

	/// Waits for every task and hands each successful output to `on_ready` in
	/// completion order.
	///
	/// Panicked or aborted tasks are logged and skipped. Returns the number of
	/// tasks that failed to produce an output.
	pub async fn for_each_ready(&mut self, mut on_ready: impl FnMut(T)) -> usize {
		let mut failed = 0;
		while let Some(joined) = self.inner.join_next().await {
			match joined {
				Ok(output) => on_ready(output),
				Err(err) => {
					failed += 1;
					tracing::warn!(worker_class = self.class.as_str(), panicked = err.is_panic(), "worker.join_set.task_failed");
				}
			}
		}
		failed
	}

	/// Aborts every task still in the set.
	pub fn abort_all(&mut self) {
		self.inner.abort_all();
	}
}
