//! Per-endpoint inbox with tag/source matching.
//!
//! Envelopes are kept in arrival order. A receive takes the oldest envelope
//! whose tag and source match, so messages from one sender on one tag are
//! always consumed in the order they were delivered.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::trace;

use crate::address::{Address, Source};
use crate::error::TransportError;
use crate::message::{Envelope, Tag};

#[derive(Debug, Default)]
struct State {
    envelopes: VecDeque<Envelope>,
    closed: Option<String>,
}

/// Inbox shared between a transport's delivery path and its receivers.
#[derive(Debug, Default)]
pub struct Mailbox {
    state: Mutex<State>,
    arrived: Notify,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // The lock is never held across user code, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an envelope and wake any waiting receivers.
    pub fn deliver(&self, envelope: Envelope) {
        trace!(source = %envelope.source, tag = %envelope.tag(), "mailbox delivery");
        self.lock().envelopes.push_back(envelope);
        self.arrived.notify_waiters();
    }

    /// Mark the mailbox closed. Buffered envelopes can still be received;
    /// blocking calls that find no match fail with [`TransportError::Closed`].
    pub fn close(&self, reason: impl Into<String>) {
        let mut state = self.lock();
        if state.closed.is_none() {
            state.closed = Some(reason.into());
        }
        drop(state);
        self.arrived.notify_waiters();
    }

    pub fn len(&self) -> usize {
        self.lock().envelopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return the oldest match, if any.
    pub fn try_take(&self, source: Source, tag: Tag) -> Result<Option<Envelope>, TransportError> {
        let mut state = self.lock();
        let position = state
            .envelopes
            .iter()
            .position(|e| e.tag() == tag && source.matches(e.source));
        match position {
            Some(i) => Ok(state.envelopes.remove(i)),
            None => match &state.closed {
                Some(reason) => Err(TransportError::Closed(reason.clone())),
                None => Ok(None),
            },
        }
    }

    /// Sender of the oldest match, without consuming it.
    pub fn try_peek(&self, source: Source, tag: Tag) -> Result<Option<Address>, TransportError> {
        let state = self.lock();
        let found = state
            .envelopes
            .iter()
            .find(|e| e.tag() == tag && source.matches(e.source))
            .map(|e| e.source);
        match (found, &state.closed) {
            (Some(a), _) => Ok(Some(a)),
            (None, Some(reason)) => Err(TransportError::Closed(reason.clone())),
            (None, None) => Ok(None),
        }
    }

    /// Wait for a match and consume it.
    pub async fn take(&self, source: Source, tag: Tag) -> Result<Envelope, TransportError> {
        loop {
            let notified = self.arrived.notified();
            tokio::pin!(notified);
            // Register before checking so a delivery between the check and the await is not lost.
            notified.as_mut().enable();
            if let Some(envelope) = self.try_take(source, tag)? {
                return Ok(envelope);
            }
            notified.await;
        }
    }

    /// Wait for a match without consuming it.
    pub async fn peek(&self, source: Source, tag: Tag) -> Result<Address, TransportError> {
        loop {
            let notified = self.arrived.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(address) = self.try_peek(source, tag)? {
                return Ok(address);
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::message::Message;

    const A: Tag = Tag(1);
    const B: Tag = Tag(2);

    fn envelope(source: u32, tag: Tag, value: u32) -> Envelope {
        Envelope::new(
            Address(source),
            Address::COORDINATOR,
            Message::new(tag, &value).unwrap(),
        )
    }

    fn value(e: &Envelope) -> u32 {
        e.message.decode().unwrap()
    }

    #[test]
    fn take_matches_tag_and_source_in_fifo_order() {
        let mb = Mailbox::new();
        mb.deliver(envelope(1, A, 10));
        mb.deliver(envelope(2, B, 20));
        mb.deliver(envelope(1, A, 11));
        mb.deliver(envelope(2, A, 21));

        let e = mb.try_take(Source::Any, B).unwrap().unwrap();
        assert_eq!(value(&e), 20);

        let e = mb.try_take(Source::Exact(Address(2)), A).unwrap().unwrap();
        assert_eq!(value(&e), 21);

        let e = mb.try_take(Source::Any, A).unwrap().unwrap();
        assert_eq!(value(&e), 10);
        let e = mb.try_take(Source::Any, A).unwrap().unwrap();
        assert_eq!(value(&e), 11);

        assert!(mb.try_take(Source::Any, A).unwrap().is_none());
        assert!(mb.is_empty());
    }

    #[test]
    fn peek_does_not_consume() {
        let mb = Mailbox::new();
        mb.deliver(envelope(3, A, 1));
        assert_eq!(mb.try_peek(Source::Any, A).unwrap(), Some(Address(3)));
        assert_eq!(mb.try_peek(Source::Any, B).unwrap(), None);
        assert_eq!(mb.len(), 1);
    }

    #[test]
    fn closed_mailbox_still_drains_buffered_envelopes() {
        let mb = Mailbox::new();
        mb.deliver(envelope(1, A, 5));
        mb.close("peer gone");

        assert!(mb.try_take(Source::Any, A).unwrap().is_some());
        let err = mb.try_take(Source::Any, A).unwrap_err();
        assert!(matches!(err, TransportError::Closed(ref r) if r == "peer gone"));
    }

    #[tokio::test]
    async fn take_wakes_on_later_delivery() {
        let mb = Arc::new(Mailbox::new());
        let waiter = {
            let mb = mb.clone();
            tokio::spawn(async move { mb.take(Source::Exact(Address(4)), B).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        mb.deliver(envelope(4, A, 1));
        mb.deliver(envelope(5, B, 2));
        mb.deliver(envelope(4, B, 3));

        let e = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .expect("take should complete")
            .unwrap()
            .unwrap();
        assert_eq!(value(&e), 3);
        assert_eq!(mb.len(), 2);
    }

    #[tokio::test]
    async fn peek_fails_when_closed_without_match() {
        let mb = Arc::new(Mailbox::new());
        let waiter = {
            let mb = mb.clone();
            tokio::spawn(async move { mb.peek(Source::Any, A).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        mb.close("shutdown");

        let result = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .expect("peek should complete")
            .unwrap();
        assert!(matches!(result, Err(TransportError::Closed(_))));
    }
}
