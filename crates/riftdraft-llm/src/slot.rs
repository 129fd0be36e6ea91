// One in-flight request per purpose.
//
// A `RequestSlot` owns the cancellation token of the request currently
// running for its purpose (analysis, bot turn, scoring). Starting a new
// request cancels the old one and bumps the generation; results must be
// checked against the slot before they are applied so that a late reply
// from a superseded request never reaches shared state.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Handle given to the task that performs one request.
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    token: CancellationToken,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// False once the request has been cancelled or superseded.
    pub fn is_live(&self) -> bool {
        !self.token.is_cancelled()
    }
}

#[derive(Debug)]
pub struct RequestSlot {
    purpose: &'static str,
    generation: u64,
    parent: Option<CancellationToken>,
    current: Option<CancellationToken>,
}

impl RequestSlot {
    pub fn new(purpose: &'static str) -> Self {
        Self {
            purpose,
            generation: 0,
            parent: None,
            current: None,
        }
    }

    /// A slot whose tickets are all cancelled when `parent` is.
    pub fn child_of(parent: &CancellationToken, purpose: &'static str) -> Self {
        Self {
            purpose,
            generation: 0,
            parent: Some(parent.clone()),
            current: None,
        }
    }

    pub fn purpose(&self) -> &'static str {
        self.purpose
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancel whatever is in flight and issue a ticket for a new request.
    pub fn replace(&mut self) -> Ticket {
        self.cancel();
        self.generation += 1;
        let token = match &self.parent {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        self.current = Some(token.clone());
        debug!(purpose = self.purpose, generation = self.generation, "request slot replaced");
        Ticket {
            generation: self.generation,
            token,
        }
    }

    /// Cancel the in-flight request, if any.
    pub fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            if !token.is_cancelled() {
                debug!(purpose = self.purpose, generation = self.generation, "request cancelled");
            }
            token.cancel();
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.current.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Whether a result produced under `ticket` may still be applied.
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation && ticket.is_live()
    }

    /// Mark the request under `ticket` as finished without cancelling
    /// anything newer.
    pub fn finish(&mut self, ticket: &Ticket) {
        if ticket.generation == self.generation {
            self.current = None;
        }
    }
}

impl Drop for RequestSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Wait out a quiet period. Returns `false` when `ticket` was cancelled
/// before the window elapsed, in which case the caller should not proceed.
pub async fn debounce(window: Duration, ticket: &Ticket) -> bool {
    if window.is_zero() {
        return ticket.is_live();
    }
    tokio::select! {
        biased;
        _ = ticket.token.cancelled() => false,
        _ = tokio::time::sleep(window) => ticket.is_live(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_cancels_previous_ticket() {
        let mut slot = RequestSlot::new("analysis");
        let first = slot.replace();
        assert!(slot.is_current(&first));

        let second = slot.replace();
        assert!(!first.is_live());
        assert!(!slot.is_current(&first));
        assert!(slot.is_current(&second));
        assert_eq!(second.generation(), 2);
    }

    #[test]
    fn finished_ticket_stays_current_until_replaced() {
        let mut slot = RequestSlot::new("analysis");
        let ticket = slot.replace();
        slot.finish(&ticket);

        assert!(!slot.is_in_flight());
        assert!(slot.is_current(&ticket));

        // Finishing a stale ticket must not clear the newer one.
        let newer = slot.replace();
        slot.finish(&ticket);
        assert!(slot.is_in_flight());
        assert!(slot.is_current(&newer));
    }

    #[test]
    fn dropping_the_slot_cancels_in_flight_work() {
        let ticket = {
            let mut slot = RequestSlot::new("bot-turn");
            slot.replace()
        };
        assert!(!ticket.is_live());
    }

    #[test]
    fn parent_cancellation_reaches_tickets() {
        let parent = CancellationToken::new();
        let mut slot = RequestSlot::child_of(&parent, "score");
        let ticket = slot.replace();

        parent.cancel();
        assert!(!ticket.is_live());
        assert!(!slot.is_current(&ticket));
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_completes_when_undisturbed() {
        let mut slot = RequestSlot::new("analysis");
        let ticket = slot.replace();
        assert!(debounce(Duration::from_millis(500), &ticket).await);
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_collapses_a_burst_to_the_last_change() {
        let mut slot = RequestSlot::new("analysis");
        let mut waits = Vec::new();

        for _ in 0..3 {
            let ticket = slot.replace();
            waits.push(tokio::spawn(async move {
                debounce(Duration::from_millis(500), &ticket).await
            }));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let mut outcomes = Vec::new();
        for w in waits {
            outcomes.push(w.await.unwrap());
        }
        assert_eq!(outcomes, vec![false, false, true]);
    }
}
