// src/client/websocket.rs

//! WebSocket transport built on `tokio-tungstenite`.
//!
//! `connect` opens the socket (plain or TLS), wires a `Client` to it and spawns
//! three tasks: a writer draining the outbound queue into the socket, a reader
//! feeding text frames to the client, and the registry purger. The reader owns
//! the connection lifecycle: when the peer closes or the stream fails it reports
//! `on_closed` and signals the other tasks to stop. Nothing reconnects.

use crate::client::purger::RegistryPurgerTask;
use crate::client::{Client, Credentials, Transport};
use crate::config::Config;
use crate::core::ClientError;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, info, warn};

/// How long `ConnectionHandle::close` waits for the peer to acknowledge a close frame.
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

// Close codes reported when no close frame was received (RFC 6455 §7.4.1).
const CLOSE_CODE_NO_STATUS: u16 = 1005;
const CLOSE_CODE_ABNORMAL: u16 = 1006;
const CLOSE_CODE_NORMAL: u16 = 1000;

/// The outbound half of a WebSocket connection.
///
/// Frames are queued on an unbounded channel and written by the writer task,
/// so `send_text` never blocks the caller.
#[derive(Debug, Clone)]
pub struct WsTransport {
    outbound: mpsc::UnboundedSender<Message>,
    open: Arc<AtomicBool>,
}

impl WsTransport {
    fn new(outbound: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            outbound,
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    fn mark_closed(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl Transport for WsTransport {
    fn send_text(&self, frame: String) -> Result<(), ClientError> {
        if !self.is_open() {
            return Err(ClientError::TransportClosed);
        }
        self.outbound
            .send(Message::Text(frame))
            .map_err(|_| ClientError::TransportClosed)
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.outbound.is_closed()
    }
}

/// Owns the background tasks of one WebSocket connection.
pub struct ConnectionHandle {
    client: Arc<Client>,
    transport: WsTransport,
    closing: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
    purger: Option<JoinHandle<()>>,
}

impl ConnectionHandle {
    pub fn client(&self) -> &Arc<Client> {
        &self.client
    }

    /// Waits until the connection is closed, by either side.
    ///
    /// Cancel safe: the reader handle is only released once it has finished.
    pub async fn closed(&mut self) {
        if let Some(reader) = self.reader.as_mut() {
            let _ = reader.await;
            self.reader = None;
        }
    }

    /// Starts the close handshake, waits briefly for the peer to answer and
    /// then stops every background task.
    pub async fn close(mut self) {
        self.closing.store(true, Ordering::SeqCst);
        if self.transport.is_open() {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "client closing".into(),
            };
            let _ = self.transport.outbound.send(Message::Close(Some(frame)));
        }
        self.transport.mark_closed();

        if let Some(reader) = self.reader.take() {
            if tokio::time::timeout(CLOSE_HANDSHAKE_TIMEOUT, reader).await.is_err() {
                warn!("Peer did not acknowledge the close frame in time.");
            }
        }
        let _ = self.shutdown_tx.send(());
        for task in [self.writer.take(), self.purger.take()].into_iter().flatten() {
            let _ = task.await;
        }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        // A dropped handle is a local close.
        self.closing.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }
}

/// Connects to the configured endpoint, sends the login request and starts
/// routing inbound frames. Returns as soon as the socket is up; use
/// `Client::wait_for_login` to learn the login outcome.
pub async fn connect(config: &Config) -> Result<ConnectionHandle, ClientError> {
    let endpoint = config
        .endpoint()
        .map_err(|e| ClientError::InvalidEndpoint(format!("{e:#}")))?;
    config
        .validate()
        .map_err(|e| ClientError::InvalidConfig(format!("{e:#}")))?;

    if endpoint.scheme() == "wss" {
        // Fails harmlessly when a process-wide provider is already installed.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    }

    info!("Connecting to {endpoint}");
    let (ws_stream, _response) =
        tokio::time::timeout(config.connect_timeout, connect_async(endpoint.as_str()))
            .await
            .map_err(|_| ClientError::ConnectTimeout(endpoint.to_string()))??;
    let (sink, stream) = ws_stream.split();

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let transport = WsTransport::new(outbound_tx);
    let client = Arc::new(Client::new(
        Credentials::from(config),
        Arc::new(transport.clone()),
        config.registry.clone(),
    ));
    let closing = Arc::new(AtomicBool::new(false));
    let (shutdown_tx, _) = broadcast::channel(1);

    // The login request is queued before the reader starts, so the
    // established callback always precedes the first message callback.
    client.on_session_established();

    let writer = tokio::spawn(write_loop(sink, outbound_rx, shutdown_tx.subscribe()));
    let reader = tokio::spawn(read_loop(
        stream,
        Arc::clone(&client),
        transport.clone(),
        Arc::clone(&closing),
        shutdown_tx.clone(),
    ));
    let purger = tokio::spawn(
        RegistryPurgerTask::new(Arc::clone(&client)).run(shutdown_tx.subscribe()),
    );

    Ok(ConnectionHandle {
        client,
        transport,
        closing,
        shutdown_tx,
        reader: Some(reader),
        writer: Some(writer),
        purger: Some(purger),
    })
}

async fn write_loop<S>(
    mut sink: S,
    mut outbound_rx: mpsc::UnboundedReceiver<Message>,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    S: Sink<Message, Error = WsError> + Unpin,
{
    loop {
        tokio::select! {
            message = outbound_rx.recv() => {
                let Some(message) = message else {
                    return;
                };
                let is_close = matches!(message, Message::Close(_));
                if let Err(e) = sink.send(message).await {
                    warn!("Failed to write frame: {e}");
                    return;
                }
                if is_close {
                    debug!("Close frame sent; writer stopping.");
                    return;
                }
            }
            _ = shutdown_rx.recv() => {
                let _ = sink.close().await;
                return;
            }
        }
    }
}

async fn read_loop<S>(
    mut stream: S,
    client: Arc<Client>,
    transport: WsTransport,
    closing: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
) where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    let mut shutdown_rx = shutdown_tx.subscribe();
    let (code, reason) = loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => client.on_message_received(&text),
                Some(Ok(Message::Close(frame))) => {
                    break frame
                        .map(|f| (u16::from(f.code), f.reason.into_owned()))
                        .unwrap_or((CLOSE_CODE_NO_STATUS, String::new()));
                }
                Some(Ok(Message::Binary(data))) => {
                    debug!(len = data.len(), "Ignoring binary frame");
                }
                // Pings are answered by tungstenite itself.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let error = ClientError::from(e);
                    client.on_error(&error);
                    break (CLOSE_CODE_ABNORMAL, error.to_string());
                }
                None => break (CLOSE_CODE_ABNORMAL, "stream ended".to_string()),
            },
            _ = shutdown_rx.recv() => {
                break (CLOSE_CODE_NORMAL, "client shutdown".to_string());
            }
        }
    };

    transport.mark_closed();
    let remote = !closing.load(Ordering::SeqCst);
    client.on_closed(code, &reason, remote);
    let _ = shutdown_tx.send(());
}
