/// WebSocket connection pumps
///
/// Each upgraded socket is split into a reader and a writer:
/// - the writer drains the connection's outbound queue onto the wire and
///   sends heartbeat pings
/// - the reader only watches for closure; inbound frames are not interpreted
///
/// Either side ending closes the shared `CloseGuard` and unregisters the
/// connection. Unregister is idempotent, so both sides always call it.
use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

use crate::{
    arguments::is_debug_websocket_enabled,
    auth::SubscriberId,
    logger::{self, LogTag},
};

use super::{
    health::{heartbeat_ticker, PumpConfig},
    hub::{ConnectionId, HubHandle},
    message::Outbound,
    metrics::ConnectionMetrics,
};

// ============================================================================
// CLOSE GUARD
// ============================================================================

/// Close-once flag shared by a connection's reader and writer
#[derive(Debug, Default)]
pub struct CloseGuard {
    closed: AtomicBool,
    notify: Notify,
}

impl CloseGuard {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mark closed; returns true only for the first caller
    pub fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::AcqRel);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Resolves once `close` has been called
    pub async fn closed(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_closed() {
                return;
            }
            notified.await;
        }
    }
}

// ============================================================================
// CONNECTION LIFECYCLE
// ============================================================================

/// Run an upgraded socket until either side ends
pub async fn serve_connection(
    socket: WebSocket,
    hub: HubHandle,
    subscriber: Option<SubscriberId>,
    config: PumpConfig,
) {
    let (id, queue) = hub.open_connection(subscriber.clone());
    let (sink, stream) = socket.split();
    let guard = CloseGuard::new();

    let user = subscriber
        .as_ref()
        .map(|u| u.to_string())
        .unwrap_or_else(|| "anonymous".to_string());
    logger::info(
        LogTag::Websocket,
        &format!("Client connected (connection={}, user={})", id, user),
    );

    let writer = tokio::spawn(write_pump(
        id,
        sink,
        queue,
        hub.clone(),
        guard.clone(),
        config.clone(),
    ));

    read_pump(id, stream, hub, guard, config.max_message_bytes).await;
    let _ = writer.await;

    logger::info(
        LogTag::Websocket,
        &format!("Client disconnected (connection={}, user={})", id, user),
    );
}

// ============================================================================
// WRITER
// ============================================================================

/// Drain the outbound queue onto the wire
///
/// Payloads go out as text frames in queue order. A ping is sent once a full
/// heartbeat interval passes without a payload; every payload restarts the
/// interval. Every write is bounded by the write timeout. When the queue is
/// closed a close frame is sent before exiting.
pub async fn write_pump<S>(
    id: ConnectionId,
    mut sink: S,
    mut queue: mpsc::Receiver<Outbound>,
    hub: HubHandle,
    guard: Arc<CloseGuard>,
    config: PumpConfig,
) where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let metrics = ConnectionMetrics::new();
    let mut heartbeat = heartbeat_ticker(config.heartbeat_interval);

    let reason = loop {
        tokio::select! {
            biased;

            item = queue.recv() => match item {
                Some(payload) => {
                    let frame = Message::Text(payload.to_string());
                    if let Err(e) = write_frame(&mut sink, frame, config.write_timeout).await {
                        break e;
                    }
                    metrics.record_frame(payload.len());
                    heartbeat.reset();
                }
                None => {
                    let _ = write_frame(&mut sink, Message::Close(None), config.write_timeout).await;
                    break "outbound queue closed".to_string();
                }
            },

            _ = heartbeat.tick() => {
                if let Err(e) = write_frame(&mut sink, Message::Ping(Vec::new()), config.write_timeout).await {
                    break e;
                }
                metrics.record_ping();
            }
        }
    };

    guard.close();
    hub.unregister(id);
    let _ = tokio::time::timeout(config.write_timeout, sink.close()).await;

    if is_debug_websocket_enabled() {
        let snapshot = metrics.snapshot();
        logger::debug(
            LogTag::Websocket,
            &format!(
                "Connection {} writer stopped: {} (frames={}, pings={}, bytes={})",
                id, reason, snapshot.frames_sent, snapshot.pings_sent, snapshot.bytes_sent
            ),
        );
    }
}

async fn write_frame<S>(sink: &mut S, frame: Message, deadline: Duration) -> Result<(), String>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    match tokio::time::timeout(deadline, sink.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("write failed: {}", e)),
        Err(_) => Err(format!("write timed out after {}s", deadline.as_secs())),
    }
}

// ============================================================================
// READER
// ============================================================================

/// Watch the inbound side until the peer goes away
///
/// Frames are read and discarded. A frame larger than `max_message_bytes`,
/// a close frame, a read error or the writer shutting down all end the
/// connection.
pub async fn read_pump<St, E>(
    id: ConnectionId,
    mut stream: St,
    hub: HubHandle,
    guard: Arc<CloseGuard>,
    max_message_bytes: usize,
) where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let reason = loop {
        tokio::select! {
            _ = guard.closed() => break "writer closed".to_string(),

            frame = stream.next() => match frame {
                None => break "stream ended".to_string(),
                Some(Ok(Message::Close(_))) => break "client sent close".to_string(),
                Some(Ok(frame)) => {
                    let size = frame_size(&frame);
                    if size > max_message_bytes {
                        break format!(
                            "inbound frame of {} bytes exceeds limit of {}",
                            size, max_message_bytes
                        );
                    }
                }
                Some(Err(e)) => break format!("read error: {}", e),
            }
        }
    };

    guard.close();
    hub.unregister(id);

    if is_debug_websocket_enabled() {
        logger::debug(
            LogTag::Websocket,
            &format!("Connection {} reader stopped: {}", id, reason),
        );
    }
}

fn frame_size(frame: &Message) -> usize {
    match frame {
        Message::Text(text) => text.len(),
        Message::Binary(data) | Message::Ping(data) | Message::Pong(data) => data.len(),
        Message::Close(_) => 0,
    }
}
