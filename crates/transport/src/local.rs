//! In-process transport: one [`Mailbox`] per rank, shared by every endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::address::{Address, Source};
use crate::error::TransportError;
use crate::mailbox::Mailbox;
use crate::message::{Envelope, Message, Tag};
use crate::traits::Transport;

/// A fixed set of in-process endpoints addressed by rank `0..size`.
#[derive(Debug, Clone)]
pub struct LocalMesh {
    mailboxes: Arc<[Arc<Mailbox>]>,
}

impl LocalMesh {
    /// Create a mesh with `size` endpoints (coordinator plus `size - 1` workers).
    pub fn new(size: usize) -> Self {
        let mailboxes: Vec<Arc<Mailbox>> = (0..size).map(|_| Arc::new(Mailbox::new())).collect();
        Self {
            mailboxes: mailboxes.into(),
        }
    }

    /// Mesh for a coordinator and `workers` workers.
    pub fn with_workers(workers: usize) -> Self {
        Self::new(workers + 1)
    }

    pub fn size(&self) -> usize {
        self.mailboxes.len()
    }

    /// Endpoint bound to `address`.
    pub fn endpoint(&self, address: Address) -> Result<LocalTransport, TransportError> {
        let inbox = self
            .mailboxes
            .get(address.0 as usize)
            .cloned()
            .ok_or(TransportError::UnknownAddress(address))?;
        Ok(LocalTransport {
            address,
            inbox,
            mailboxes: Arc::clone(&self.mailboxes),
        })
    }

    /// Mark every mailbox closed so blocked receivers fail instead of hanging.
    pub fn close(&self, reason: &str) {
        for mb in self.mailboxes.iter() {
            mb.close(reason);
        }
    }
}

/// One participant's view of a [`LocalMesh`].
#[derive(Debug, Clone)]
pub struct LocalTransport {
    address: Address,
    inbox: Arc<Mailbox>,
    mailboxes: Arc<[Arc<Mailbox>]>,
}

#[async_trait]
impl Transport for LocalTransport {
    fn local_address(&self) -> Address {
        self.address
    }

    async fn send(&self, dest: Address, message: Message) -> Result<(), TransportError> {
        let mailbox = self
            .mailboxes
            .get(dest.0 as usize)
            .ok_or(TransportError::UnknownAddress(dest))?;
        debug!(from = %self.address, to = %dest, tag = %message.tag, "local send");
        mailbox.deliver(Envelope::new(self.address, dest, message));
        Ok(())
    }

    async fn recv(&self, source: Source, tag: Tag) -> Result<Envelope, TransportError> {
        self.inbox.take(source, tag).await
    }

    async fn probe(&self, source: Source, tag: Tag) -> Result<Address, TransportError> {
        self.inbox.peek(source, tag).await
    }

    fn try_probe(&self, source: Source, tag: Tag) -> Result<Option<Address>, TransportError> {
        self.inbox.try_peek(source, tag)
    }

    fn try_recv(&self, source: Source, tag: Tag) -> Result<Option<Envelope>, TransportError> {
        self.inbox.try_take(source, tag)
    }
}
