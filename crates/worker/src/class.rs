/// Execution classes used to tag spawned work in traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Work a caller is waiting on, such as the initial table load.
	Interactive,
	/// Work nobody awaits directly, such as reloads driven by locale notifications.
	Background,
	/// Long-lived listeners that live as long as their owner.
	Listener,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Background => "background",
			Self::Listener => "listener",
		}
	}
}
