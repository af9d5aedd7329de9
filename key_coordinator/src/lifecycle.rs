use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// The coordinator's cooperative shutdown state machine: `Init -> Running -> ShuttingDown ->
/// Shutdown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Constructed but not yet started.
    Init,
    /// The consumer and processor loops are running.
    Running,
    /// `stop()` has been called; the consumer has been interrupted and the processor is
    /// finishing its current batch.
    ShuttingDown,
    /// Both loops have exited.
    Shutdown,
}

/// Shared shutdown coordination between the consumer loop and the processor loop.
///
/// A `CancellationToken` paired with a state variable: cancellation is the actual
/// suspension-point signal, `state` is for observability and for callers polling whether it's
/// safe to tear down collaborators.
#[derive(Debug)]
pub struct ShutdownHandle {
    token: CancellationToken,
    state: Mutex<RunState>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self {
            token: CancellationToken::new(),
            state: Mutex::new(RunState::Init),
        }
    }
}

impl ShutdownHandle {
    /// Create a fresh handle in [`RunState::Init`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Transition to [`RunState::Running`]. Called once both loops have been spawned.
    pub fn mark_running(&self) {
        *self.state.lock() = RunState::Running;
    }

    /// Signal cooperative shutdown: transitions to [`RunState::ShuttingDown`] and cancels the
    /// shared token, interrupting any suspended `poll`/queue operation.
    pub fn stop(&self) {
        *self.state.lock() = RunState::ShuttingDown;
        self.token.cancel();
    }

    /// Transition to [`RunState::Shutdown`]. Called once both loops have exited.
    pub fn mark_shutdown(&self) {
        *self.state.lock() = RunState::Shutdown;
    }

    /// The current state.
    pub fn state(&self) -> RunState {
        *self.state.lock()
    }

    /// Whether [`Self::stop`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A future that resolves once [`Self::stop`] is called; suitable for `tokio::select!`.
    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}
