//! Injectable waiting for the token-expiry context.
//!
//! The expiry wait is the only suspension point that is not a network call, so it sits behind
//! [`Sleeper`]: real runs use [`TokioSleeper`], tests use [`ManualSleeper`] to record the requested
//! waits without blocking.

// self
use crate::_prelude::*;

/// Boxed future returned by [`Sleeper::sleep`].
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Waiting contract used by the suite.
pub trait Sleeper
where
	Self: Send + Sync,
{
	/// Suspends the caller for at least `duration`. Non-positive durations return immediately.
	fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}

/// Sleeper backed by `tokio::time::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;
impl Sleeper for TokioSleeper {
	fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
		let duration = std::time::Duration::try_from(duration).unwrap_or_default();

		Box::pin(tokio::time::sleep(duration))
	}
}

/// Sleeper that records every requested wait and returns immediately.
#[derive(Clone, Debug, Default)]
pub struct ManualSleeper {
	requested: Arc<Mutex<Vec<Duration>>>,
}
impl ManualSleeper {
	/// Creates an empty recorder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Waits requested so far, in call order.
	pub fn requested(&self) -> Vec<Duration> {
		self.requested.lock().clone()
	}

	/// Sum of every requested wait.
	pub fn total(&self) -> Duration {
		self.requested.lock().iter().fold(Duration::ZERO, |acc, wait| acc + *wait)
	}
}
impl Sleeper for ManualSleeper {
	fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
		self.requested.lock().push(duration);

		Box::pin(std::future::ready(()))
	}
}
