use std::sync::Arc;

use async_trait::async_trait;

use crate::address::{Address, Source};
use crate::error::TransportError;
use crate::message::{Envelope, Message, Tag};

/// Asynchronous tagged point-to-point messaging.
///
/// Messages from one source to one destination on one tag arrive in the order
/// they were sent. Nothing is promised across different tags or sources.
#[async_trait]
pub trait Transport: Send + Sync {
    /// This endpoint's own address.
    fn local_address(&self) -> Address;

    /// Send a message to `dest`. Returns once the message is handed to the transport.
    async fn send(&self, dest: Address, message: Message) -> Result<(), TransportError>;

    /// Wait for a matching message and consume it.
    async fn recv(&self, source: Source, tag: Tag) -> Result<Envelope, TransportError>;

    /// Wait until a matching message is available, without consuming it.
    async fn probe(&self, source: Source, tag: Tag) -> Result<Address, TransportError>;

    /// Sender of a matching message if one is available right now.
    fn try_probe(&self, source: Source, tag: Tag) -> Result<Option<Address>, TransportError>;

    /// Consume a matching message if one is available right now.
    fn try_recv(&self, source: Source, tag: Tag) -> Result<Option<Envelope>, TransportError>;
}

/// Blanket implementation so `Arc<dyn Transport>` can be used directly.
#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn local_address(&self) -> Address {
        (**self).local_address()
    }

    async fn send(&self, dest: Address, message: Message) -> Result<(), TransportError> {
        (**self).send(dest, message).await
    }

    async fn recv(&self, source: Source, tag: Tag) -> Result<Envelope, TransportError> {
        (**self).recv(source, tag).await
    }

    async fn probe(&self, source: Source, tag: Tag) -> Result<Address, TransportError> {
        (**self).probe(source, tag).await
    }

    fn try_probe(&self, source: Source, tag: Tag) -> Result<Option<Address>, TransportError> {
        (**self).try_probe(source, tag)
    }

    fn try_recv(&self, source: Source, tag: Tag) -> Result<Option<Envelope>, TransportError> {
        (**self).try_recv(source, tag)
    }
}
