//! Multi-process transport over ZeroMQ ROUTER/DEALER sockets.
//!
//! - [`ZmqHub`] binds a ROUTER socket; it is the coordinator's endpoint
//! - [`ZmqSpoke`] connects a DEALER socket; one per worker process
//!
//! Each socket is owned by a background task that multiplexes outbound
//! sends (fed through an mpsc channel) with inbound receives (fed into a
//! [`Mailbox`]), so send and receive never contend for the socket.
//!
//! ## Framing (zeromq-rs 0.4)
//!
//! ROUTER pushes the peer identity as first frame on recv and pops it on send:
//! - DEALER sends: `[envelope]`
//! - ROUTER receives: `[identity, envelope]`
//! - ROUTER sends: `[identity, envelope]`
//! - DEALER receives: `[envelope]`
//!
//! The hub learns which identity belongs to which [`Address`] from the
//! `source` of the first envelope each worker sends. Workers always speak
//! first (a task request), so every reply has a known route.
//!
//! A failed send or receive ends the loop and closes the mailbox: pending
//! receives fail with [`TransportError::Closed`] and later sends are refused.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use zeromq::{DealerSocket, RouterSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

use crate::address::{Address, Source};
use crate::endpoint::Endpoint;
use crate::error::TransportError;
use crate::mailbox::Mailbox;
use crate::message::{Envelope, Message, Tag};
use crate::traits::Transport;

/// Capacity of the outbound command channel feeding each socket loop.
const OUTBOUND_CAPACITY: usize = 256;

/// Attempts made by [`ZmqSpoke::connect`] before giving up.
const CONNECT_ATTEMPTS: u32 = 20;
const CONNECT_BACKOFF: Duration = Duration::from_millis(150);

type Routes = Arc<Mutex<HashMap<Address, Vec<u8>>>>;

/// Outbound frame for the ROUTER loop.
struct RoutedFrame {
    identity: Vec<u8>,
    bytes: Vec<u8>,
}

/// Drop leading empty delimiter frames and return the first data frame.
fn envelope_frame<'a>(mut frames: impl Iterator<Item = &'a [u8]>) -> Option<&'a [u8]> {
    frames.find(|f| !f.is_empty())
}

// ── Hub ──────────────────────────────────────────────────────────────

/// Coordinator-side ZeroMQ endpoint (ROUTER socket).
pub struct ZmqHub {
    inbox: Arc<Mailbox>,
    routes: Routes,
    outbound: mpsc::Sender<RoutedFrame>,
    loop_handle: JoinHandle<()>,
}

impl ZmqHub {
    /// Bind a ROUTER socket on the given endpoint.
    #[instrument(skip_all, fields(endpoint = %endpoint))]
    pub async fn bind(endpoint: &Endpoint) -> Result<Self, TransportError> {
        endpoint.ensure_ipc_dir()?;
        endpoint.remove_stale_socket()?;

        let mut socket = RouterSocket::new();
        let address = endpoint.endpoint();
        info!(endpoint = %address, "binding ROUTER socket");
        socket.bind(&address).await?;

        let inbox = Arc::new(Mailbox::new());
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);

        let loop_inbox = Arc::clone(&inbox);
        let loop_routes = Arc::clone(&routes);
        let loop_handle = tokio::spawn(async move {
            Self::event_loop(socket, outbound_rx, loop_inbox, loop_routes).await;
        });

        Ok(Self {
            inbox,
            routes,
            outbound,
            loop_handle,
        })
    }

    async fn event_loop(
        mut socket: RouterSocket,
        mut outbound: mpsc::Receiver<RoutedFrame>,
        inbox: Arc<Mailbox>,
        routes: Routes,
    ) {
        loop {
            tokio::select! {
                cmd = outbound.recv() => {
                    match cmd {
                        Some(frame) => {
                            let mut zmq_msg = ZmqMessage::from(frame.identity);
                            zmq_msg.push_back(frame.bytes.into());
                            if let Err(e) = socket.send(zmq_msg).await {
                                warn!(error = %e, "ROUTER send failed, closing hub");
                                inbox.close(format!("ROUTER send failed: {e}"));
                                return;
                            }
                        }
                        // Every sender dropped and the queue is flushed.
                        None => break,
                    }
                }
                result = socket.recv() => {
                    match result {
                        Ok(zmq_msg) => Self::accept(&inbox, &routes, zmq_msg),
                        Err(e) => {
                            debug!(error = %e, "ROUTER recv loop ending");
                            inbox.close(format!("ROUTER socket failed: {e}"));
                            return;
                        }
                    }
                }
            }
        }
        inbox.close("hub shut down");
    }

    /// Record the sender's routing identity and deliver the envelope.
    fn accept(inbox: &Mailbox, routes: &Mutex<HashMap<Address, Vec<u8>>>, zmq_msg: ZmqMessage) {
        let frames: Vec<&[u8]> = zmq_msg.iter().map(|f| f.as_ref()).collect();
        let Some((identity, rest)) = frames.split_first() else {
            warn!("empty message on ROUTER recv");
            return;
        };
        let Some(bytes) = envelope_frame(rest.iter().copied()) else {
            warn!(frame_count = frames.len(), "no envelope frame after identity");
            return;
        };
        let envelope = match Envelope::from_bytes(bytes) {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "failed to decode envelope on ROUTER");
                return;
            }
        };
        if !envelope.dest.is_coordinator() {
            warn!(dest = %envelope.dest, "hub received envelope addressed elsewhere");
        }

        let previous = routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(envelope.source, identity.to_vec());
        if previous.is_none() {
            info!(peer = %envelope.source, "registered worker route");
        }
        inbox.deliver(envelope);
    }

    /// Workers whose routing identity is known.
    pub fn known_peers(&self) -> Vec<Address> {
        let mut peers: Vec<Address> = self
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        peers.sort();
        peers
    }

    /// Flush queued sends and stop the socket loop.
    pub async fn shutdown(self) {
        drop(self.outbound);
        if let Err(e) = self.loop_handle.await {
            warn!(error = %e, "hub event loop panicked");
        }
    }
}

#[async_trait]
impl Transport for ZmqHub {
    fn local_address(&self) -> Address {
        Address::COORDINATOR
    }

    async fn send(&self, dest: Address, message: Message) -> Result<(), TransportError> {
        let identity = self
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&dest)
            .cloned()
            .ok_or(TransportError::UnknownAddress(dest))?;
        let bytes = Envelope::new(Address::COORDINATOR, dest, message).to_bytes()?;
        self.outbound
            .send(RoutedFrame { identity, bytes })
            .await
            .map_err(|_| TransportError::Closed("hub event loop closed".into()))
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

// ── Spoke ────────────────────────────────────────────────────────────

/// Worker-side ZeroMQ endpoint (DEALER socket). Can only talk to the coordinator.
pub struct ZmqSpoke {
    address: Address,
    inbox: Arc<Mailbox>,
    outbound: mpsc::Sender<Vec<u8>>,
    loop_handle: JoinHandle<()>,
}

impl ZmqSpoke {
    /// Connect a DEALER socket to the hub, retrying while the hub is not yet up.
    #[instrument(skip_all, fields(endpoint = %endpoint, address = %address))]
    pub async fn connect(endpoint: &Endpoint, address: Address) -> Result<Self, TransportError> {
        let target = endpoint.endpoint();
        let mut attempt = 1;
        let socket = loop {
            let mut socket = DealerSocket::new();
            match socket.connect(&target).await {
                Ok(()) => break socket,
                Err(e) if attempt < CONNECT_ATTEMPTS => {
                    debug!(attempt, error = %e, "hub not reachable yet, retrying");
                    attempt += 1;
                    tokio::time::sleep(CONNECT_BACKOFF).await;
                }
                Err(e) => return Err(e.into()),
            }
        };
        info!(endpoint = %target, "connected DEALER socket");

        let inbox = Arc::new(Mailbox::new());
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let loop_inbox = Arc::clone(&inbox);
        let loop_handle = tokio::spawn(async move {
            Self::event_loop(socket, outbound_rx, loop_inbox).await;
        });

        Ok(Self {
            address,
            inbox,
            outbound,
            loop_handle,
        })
    }

    async fn event_loop(
        mut socket: DealerSocket,
        mut outbound: mpsc::Receiver<Vec<u8>>,
        inbox: Arc<Mailbox>,
    ) {
        loop {
            tokio::select! {
                cmd = outbound.recv() => {
                    match cmd {
                        Some(bytes) => {
                            if let Err(e) = socket.send(ZmqMessage::from(bytes)).await {
                                warn!(error = %e, "DEALER send failed, closing spoke");
                                inbox.close(format!("DEALER send failed: {e}"));
                                return;
                            }
                        }
                        None => break,
                    }
                }
                result = socket.recv() => {
                    match result {
                        Ok(zmq_msg) => Self::accept(&inbox, zmq_msg),
                        Err(e) => {
                            debug!(error = %e, "DEALER recv loop ending");
                            inbox.close(format!("DEALER socket failed: {e}"));
                            return;
                        }
                    }
                }
            }
        }
        inbox.close("spoke shut down");
    }

    fn accept(inbox: &Mailbox, zmq_msg: ZmqMessage) {
        let Some(bytes) = envelope_frame(zmq_msg.iter().map(|f| f.as_ref())) else {
            warn!("no envelope frame on DEALER recv");
            return;
        };
        match Envelope::from_bytes(bytes) {
            Ok(envelope) => inbox.deliver(envelope),
            Err(e) => warn!(error = %e, "failed to decode envelope on DEALER"),
        }
    }

    /// Flush queued sends and stop the socket loop.
    pub async fn shutdown(self) {
        drop(self.outbound);
        if let Err(e) = self.loop_handle.await {
            warn!(error = %e, "spoke event loop panicked");
        }
    }
}

#[async_trait]
impl Transport for ZmqSpoke {
    fn local_address(&self) -> Address {
        self.address
    }

    async fn send(&self, dest: Address, message: Message) -> Result<(), TransportError> {
        if !dest.is_coordinator() {
            return Err(TransportError::UnknownAddress(dest));
        }
        let bytes = Envelope::new(self.address, dest, message).to_bytes()?;
        self.outbound
            .send(bytes)
            .await
            .map_err(|_| TransportError::Closed("spoke event loop closed".into()))
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
