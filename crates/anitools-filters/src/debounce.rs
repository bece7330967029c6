//! Single cancellable debounce deadline.
//!
//! The session owns one [`Debouncer`]. Arming it replaces any pending
//! deadline; the session loop waits on [`Debouncer::wait`] next to its
//! command channel.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// (Re)start the quiet period from now.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.window);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Resolves when the armed deadline passes; never resolves when disarmed.
    pub fn wait(&self) -> impl std::future::Future<Output = ()> {
        sleep_until_deadline(self.deadline)
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
