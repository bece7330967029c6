//! Latest-request-wins slots.
//!
//! Every request class holds at most one in-flight request. Beginning a new
//! request cancels the previous one's token and bumps the class generation;
//! a completion is applied only while its ticket is still current.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anitools_core::FilterName;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Request classes that supersede each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestClass {
    FilterValues,
    UserLists,
    Typeahead(FilterName),
    TablePage,
}

struct Slot {
    generation: u64,
    token: CancellationToken,
}

/// Proof of ownership of a slot's current request.
#[derive(Debug, Clone)]
pub struct Ticket {
    class: RequestClass,
    generation: u64,
    token: CancellationToken,
}

impl Ticket {
    pub fn class(&self) -> RequestClass {
        self.class
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Drive `fut` unless the ticket is cancelled first.
    ///
    /// Returns `None` when superseded; the future is dropped at that point.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            _ = self.token.cancelled() => None,
            out = fut => Some(out),
        }
    }
}

/// Shared table of request slots.
#[derive(Clone, Default)]
pub struct RequestSlots {
    inner: Arc<Mutex<HashMap<RequestClass, Slot>>>,
}

impl RequestSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request for `class`, cancelling the one it supersedes.
    pub fn begin(&self, class: RequestClass) -> Ticket {
        let mut slots = self.inner.lock();
        let token = CancellationToken::new();
        let generation = match slots.get_mut(&class) {
            Some(slot) => {
                slot.token.cancel();
                slot.generation += 1;
                slot.token = token.clone();
                slot.generation
            }
            None => {
                slots.insert(
                    class,
                    Slot {
                        generation: 1,
                        token: token.clone(),
                    },
                );
                1
            }
        };
        trace!(?class, generation, "Request slot begun");
        Ticket {
            class,
            generation,
            token,
        }
    }

    /// Whether `ticket` is still the latest request of its class.
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        if ticket.token.is_cancelled() {
            return false;
        }
        self.inner
            .lock()
            .get(&ticket.class)
            .is_some_and(|slot| slot.generation == ticket.generation)
    }

    /// Release the slot if `ticket` still owns it. Returns whether the
    /// completion should be applied.
    pub fn finish(&self, ticket: &Ticket) -> bool {
        let mut slots = self.inner.lock();
        let current = slots
            .get(&ticket.class)
            .is_some_and(|slot| slot.generation == ticket.generation)
            && !ticket.token.is_cancelled();
        if current {
            slots.remove(&ticket.class);
        }
        current
    }

    /// Cancel the in-flight request of one class.
    pub fn cancel(&self, class: RequestClass) {
        if let Some(slot) = self.inner.lock().remove(&class) {
            slot.token.cancel();
        }
    }

    /// Cancel everything in flight.
    pub fn cancel_all(&self) {
        let mut slots = self.inner.lock();
        for (_, slot) in slots.drain() {
            slot.token.cancel();
        }
    }

    pub fn in_flight(&self, class: RequestClass) -> bool {
        self.inner.lock().contains_key(&class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_begin_supersedes_previous() {
        let slots = RequestSlots::new();
        let first = slots.begin(RequestClass::FilterValues);
        let second = slots.begin(RequestClass::FilterValues);

        assert!(first.is_cancelled());
        assert!(!slots.is_current(&first));
        assert!(slots.is_current(&second));
        assert!(second.generation() > first.generation());

        assert!(!slots.finish(&first));
        assert!(slots.finish(&second));
        assert!(!slots.in_flight(RequestClass::FilterValues));
    }

    #[test]
    fn test_classes_are_independent() {
        let slots = RequestSlots::new();
        let studio = slots.begin(RequestClass::Typeahead(FilterName::Studio));
        let staff = slots.begin(RequestClass::Typeahead(FilterName::Staff));
        assert!(slots.is_current(&studio));
        assert!(slots.is_current(&staff));

        slots.cancel(RequestClass::Typeahead(FilterName::Studio));
        assert!(studio.is_cancelled());
        assert!(!staff.is_cancelled());
    }

    #[test]
    fn test_cancel_all() {
        let slots = RequestSlots::new();
        let a = slots.begin(RequestClass::UserLists);
        let b = slots.begin(RequestClass::TablePage);
        slots.cancel_all();
        assert!(a.is_cancelled() && b.is_cancelled());
        assert!(!slots.finish(&a));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_none_when_superseded() {
        let slots = RequestSlots::new();
        let ticket = slots.begin(RequestClass::TablePage);

        let slow = {
            let ticket = ticket.clone();
            tokio::spawn(async move {
                ticket
                    .run(async {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        42
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        let _next = slots.begin(RequestClass::TablePage);
        assert_eq!(slow.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_run_returns_output_when_current() {
        let slots = RequestSlots::new();
        let ticket = slots.begin(RequestClass::FilterValues);
        assert_eq!(ticket.run(async { "done" }).await, Some("done"));
    }
}
