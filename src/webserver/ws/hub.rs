/// Connection registry and fan-out
///
/// The `Hub` owns every live connection and is driven by a single control
/// loop task. All mutations (register, unregister, publish) arrive as
/// commands on an unbounded channel, so callers never block and the maps
/// have exactly one writer. `HubHandle` is the cloneable front end.
///
/// Delivery is a non-blocking `try_send` into each connection's bounded
/// queue. A full queue means the client cannot keep up: the connection is
/// dropped from every index and its queue is closed, which makes its writer
/// send a close frame and exit.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::{
    arguments::is_debug_hub_enabled,
    auth::SubscriberId,
    logger::{self, LogTag},
};

use super::message::{HubMessage, Outbound};
use super::metrics::{HubMetrics, HubStatsSnapshot};

// ============================================================================
// HUB TYPES
// ============================================================================

/// Process-unique connection id
pub type ConnectionId = u64;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Registry entry for one live push channel
///
/// Holds the producer side of the connection's outbound queue. Dropping the
/// `Connection` closes the queue.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    subscriber: Option<SubscriberId>,
    sender: mpsc::Sender<Outbound>,
}

impl Connection {
    /// New connection with a bounded outbound queue of `capacity` frames
    pub fn new(
        subscriber: Option<SubscriberId>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Outbound>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let connection = Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            subscriber,
            sender,
        };
        (connection, receiver)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn subscriber(&self) -> Option<&SubscriberId> {
        self.subscriber.as_ref()
    }
}

enum Command {
    Register(Connection),
    Unregister(ConnectionId),
    Publish(HubMessage),
    ConnectionCount(oneshot::Sender<usize>),
    SubscriberConnections(SubscriberId, oneshot::Sender<Vec<ConnectionId>>),
    Stats(oneshot::Sender<HubStatsSnapshot>),
    Shutdown,
}

// ============================================================================
// HUB HANDLE
// ============================================================================

/// Cloneable handle to a running hub
///
/// Every method only enqueues a command. Once the hub has shut down,
/// mutations are silently ignored and queries return empty results.
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::UnboundedSender<Command>,
    metrics: Arc<HubMetrics>,
    queue_capacity: usize,
}

impl HubHandle {
    /// Outbound queue capacity used by `open_connection`
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    pub fn metrics(&self) -> Arc<HubMetrics> {
        self.metrics.clone()
    }

    pub fn register(&self, connection: Connection) {
        let _ = self.commands.send(Command::Register(connection));
    }

    /// Create a connection with the hub's queue capacity and register it
    pub fn open_connection(
        &self,
        subscriber: Option<SubscriberId>,
    ) -> (ConnectionId, mpsc::Receiver<Outbound>) {
        let (connection, queue) = Connection::new(subscriber, self.queue_capacity);
        let id = connection.id();
        self.register(connection);
        (id, queue)
    }

    /// Remove a connection; unknown or already removed ids are ignored
    pub fn unregister(&self, id: ConnectionId) {
        let _ = self.commands.send(Command::Unregister(id));
    }

    pub fn publish(&self, message: HubMessage) {
        let _ = self.commands.send(Command::Publish(message));
    }

    /// Push a payload to every connection of one user
    pub fn send_to_user(
        &self,
        user: &SubscriberId,
        message_type: &str,
        payload: impl Into<Outbound>,
    ) {
        self.publish(HubMessage::to_user(user.clone(), message_type, payload));
    }

    /// Push a payload to every live connection
    pub fn broadcast(&self, message_type: &str, payload: impl Into<Outbound>) {
        self.publish(HubMessage::broadcast(message_type, payload));
    }

    pub async fn connection_count(&self) -> usize {
        self.query(Command::ConnectionCount).await.unwrap_or(0)
    }

    /// Connection ids registered under `user`, in registration order
    pub async fn subscriber_connections(&self, user: &SubscriberId) -> Vec<ConnectionId> {
        let user = user.clone();
        self.query(|reply| Command::SubscriberConnections(user, reply))
            .await
            .unwrap_or_default()
    }

    pub async fn subscriber_connection_count(&self, user: &SubscriberId) -> usize {
        self.subscriber_connections(user).await.len()
    }

    pub async fn stats(&self) -> HubStatsSnapshot {
        match self.query(Command::Stats).await {
            Some(stats) => stats,
            None => HubStatsSnapshot {
                connections: 0,
                subscribers: 0,
                lifetime: self.metrics.snapshot(),
            },
        }
    }

    /// Close every connection and stop the control loop
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    async fn query<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Option<T> {
        let (reply, response) = oneshot::channel();
        self.commands.send(make(reply)).ok()?;
        response.await.ok()
    }
}

// ============================================================================
// HUB
// ============================================================================

/// Registry state owned by the control loop
pub struct Hub {
    connections: HashMap<ConnectionId, Connection>,
    subscribers: HashMap<SubscriberId, Vec<ConnectionId>>,
    metrics: Arc<HubMetrics>,
}

impl Hub {
    /// Spawn the control loop and return its handle
    ///
    /// The loop runs until `HubHandle::shutdown` is called or every handle
    /// has been dropped.
    pub fn start(queue_capacity: usize) -> HubHandle {
        let (commands, receiver) = mpsc::unbounded_channel();
        let metrics = HubMetrics::new();

        let hub = Hub {
            connections: HashMap::new(),
            subscribers: HashMap::new(),
            metrics: metrics.clone(),
        };
        tokio::spawn(hub.run(receiver));

        HubHandle {
            commands,
            metrics,
            queue_capacity,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        logger::info(LogTag::Hub, "Hub control loop started");

        while let Some(command) = commands.recv().await {
            match command {
                Command::Register(connection) => self.register(connection),
                Command::Unregister(id) => {
                    self.remove(id);
                }
                Command::Publish(message) => self.publish(message),
                Command::ConnectionCount(reply) => {
                    let _ = reply.send(self.connections.len());
                }
                Command::SubscriberConnections(user, reply) => {
                    let ids = self.subscribers.get(&user).cloned().unwrap_or_default();
                    let _ = reply.send(ids);
                }
                Command::Stats(reply) => {
                    let _ = reply.send(self.stats());
                }
                Command::Shutdown => break,
            }
        }

        let remaining = self.connections.len();
        self.close_all();
        logger::info(
            LogTag::Hub,
            &format!("Hub control loop stopped ({} connections closed)", remaining),
        );
    }

    fn register(&mut self, connection: Connection) {
        let id = connection.id;

        if let Some(user) = &connection.subscriber {
            let ids = self.subscribers.entry(user.clone()).or_default();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        if is_debug_hub_enabled() {
            logger::debug(
                LogTag::Hub,
                &format!(
                    "Connection {} registered (user={}, active={})",
                    id,
                    connection
                        .subscriber
                        .as_ref()
                        .map(|u| u.as_str())
                        .unwrap_or("anonymous"),
                    self.connections.len() + 1
                ),
            );
        }

        self.connections.insert(id, connection);
        self.metrics.connection_registered();
    }

    /// Drop a connection from every index, closing its queue
    fn remove(&mut self, id: ConnectionId) -> bool {
        let Some(connection) = self.connections.remove(&id) else {
            return false;
        };

        if let Some(user) = &connection.subscriber {
            if let Some(ids) = self.subscribers.get_mut(user) {
                ids.retain(|c| *c != id);
                if ids.is_empty() {
                    self.subscribers.remove(user);
                }
            }
        }

        self.metrics.connection_unregistered();

        if is_debug_hub_enabled() {
            logger::debug(
                LogTag::Hub,
                &format!(
                    "Connection {} unregistered (active={})",
                    id,
                    self.connections.len()
                ),
            );
        }

        true
    }

    fn publish(&mut self, message: HubMessage) {
        self.metrics.message_published();

        let targets: Vec<ConnectionId> = match &message.target {
            Some(user) => self.subscribers.get(user).cloned().unwrap_or_default(),
            None => self.connections.keys().copied().collect(),
        };

        let mut delivered = 0u64;
        let mut evicted = Vec::new();

        for id in targets {
            let Some(connection) = self.connections.get(&id) else {
                continue;
            };
            match connection.sender.try_send(message.payload.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.metrics.slow_consumer_evicted();
                    logger::debug(
                        LogTag::Hub,
                        &format!("Connection {} evicted: outbound queue full", id),
                    );
                    evicted.push(id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => evicted.push(id),
            }
        }

        for id in evicted {
            self.remove(id);
        }

        self.metrics.messages_delivered(delivered);

        if is_debug_hub_enabled() {
            logger::debug(
                LogTag::Hub,
                &format!(
                    "Published '{}' to {} (delivered={})",
                    message.message_type,
                    message
                        .target
                        .as_ref()
                        .map(|u| format!("user {}", u))
                        .unwrap_or_else(|| "all".to_string()),
                    delivered
                ),
            );
        }
    }

    fn stats(&self) -> HubStatsSnapshot {
        HubStatsSnapshot {
            connections: self.connections.len(),
            subscribers: self.subscribers.len(),
            lifetime: self.metrics.snapshot(),
        }
    }

    fn close_all(&mut self) {
        self.subscribers.clear();
        for (_, _connection) in self.connections.drain() {
            self.metrics.connection_unregistered();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;

    fn user(id: &str) -> SubscriberId {
        SubscriberId::from(id)
    }

    /// Round-trip through the loop so earlier commands have been applied
    async fn settle(hub: &HubHandle) {
        hub.connection_count().await;
    }

    #[tokio::test]
    async fn test_targeted_publish_reaches_only_that_user() {
        let hub = Hub::start(16);

        let mut u1_queues: Vec<_> = (0..3)
            .map(|_| hub.open_connection(Some(user("u1"))).1)
            .collect();
        let (_, mut u2_queue) = hub.open_connection(Some(user("u2")));
        let (_, mut anon_queue) = hub.open_connection(None);

        hub.send_to_user(&user("u1"), "notification", r#"{"n":1}"#);
        settle(&hub).await;

        for queue in u1_queues.iter_mut() {
            assert_eq!(&*queue.try_recv().unwrap(), r#"{"n":1}"#);
            assert!(matches!(queue.try_recv(), Err(TryRecvError::Empty)));
        }
        assert!(matches!(u2_queue.try_recv(), Err(TryRecvError::Empty)));
        assert!(matches!(anon_queue.try_recv(), Err(TryRecvError::Empty)));

        let stats = hub.stats().await;
        assert_eq!(stats.connections, 5);
        assert_eq!(stats.subscribers, 2);
        assert_eq!(stats.lifetime.messages_delivered, 3);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_connection() {
        let hub = Hub::start(16);
        let (_, mut a) = hub.open_connection(Some(user("u1")));
        let (_, mut b) = hub.open_connection(None);

        hub.broadcast("announcement", "hello");
        settle(&hub).await;

        assert_eq!(&*a.try_recv().unwrap(), "hello");
        assert_eq!(&*b.try_recv().unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_publish_to_unknown_user_is_noop() {
        let hub = Hub::start(16);
        let (_, mut a) = hub.open_connection(Some(user("u1")));

        hub.send_to_user(&user("ghost"), "notification", "x");
        settle(&hub).await;

        assert!(matches!(a.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(hub.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent_and_closes_queue() {
        let hub = Hub::start(16);
        let (id, mut queue) = hub.open_connection(Some(user("u1")));
        let (_, _other) = hub.open_connection(Some(user("u2")));

        hub.unregister(id);
        hub.unregister(id);
        hub.unregister(9_999_999);

        assert_eq!(hub.connection_count().await, 1);
        assert_eq!(hub.subscriber_connection_count(&user("u1")).await, 0);
        assert!(queue.recv().await.is_none());

        let stats = hub.stats().await;
        assert_eq!(stats.subscribers, 1);
        assert_eq!(stats.lifetime.total_unregistered, 1);
    }

    #[tokio::test]
    async fn test_unregister_keeps_order_of_remaining() {
        let hub = Hub::start(16);
        let (first, _q1) = hub.open_connection(Some(user("u1")));
        let (middle, _q2) = hub.open_connection(Some(user("u1")));
        let (last, _q3) = hub.open_connection(Some(user("u1")));

        assert_eq!(
            hub.subscriber_connections(&user("u1")).await,
            vec![first, middle, last]
        );

        hub.unregister(middle);
        assert_eq!(
            hub.subscriber_connections(&user("u1")).await,
            vec![first, last]
        );
    }

    #[tokio::test]
    async fn test_messages_arrive_in_publish_order() {
        let hub = Hub::start(16);
        let (_, mut queue) = hub.open_connection(Some(user("u1")));

        for i in 0..5 {
            hub.send_to_user(&user("u1"), "notification", format!("m{}", i));
        }
        settle(&hub).await;

        for i in 0..5 {
            assert_eq!(&*queue.recv().await.unwrap(), format!("m{}", i));
        }
    }

    #[tokio::test]
    async fn test_full_queue_evicts_slow_consumer() {
        let hub = Hub::start(2);
        let (slow_id, mut slow) = hub.open_connection(Some(user("u1")));
        let (_, mut fast) = hub.open_connection(Some(user("u1")));

        hub.send_to_user(&user("u1"), "notification", "1");
        hub.send_to_user(&user("u1"), "notification", "2");
        settle(&hub).await;
        assert_eq!(&*fast.recv().await.unwrap(), "1");
        assert_eq!(&*fast.recv().await.unwrap(), "2");

        // slow still holds "1" and "2"; the third push overflows it
        hub.send_to_user(&user("u1"), "notification", "3");
        settle(&hub).await;

        assert_eq!(&*fast.recv().await.unwrap(), "3");
        assert_eq!(&*slow.recv().await.unwrap(), "1");
        assert_eq!(&*slow.recv().await.unwrap(), "2");
        assert!(slow.recv().await.is_none());

        let remaining = hub.subscriber_connections(&user("u1")).await;
        assert!(!remaining.contains(&slow_id));
        assert_eq!(remaining.len(), 1);
        assert_eq!(hub.stats().await.lifetime.slow_consumer_evictions, 1);
    }

    #[tokio::test]
    async fn test_closed_queue_is_evicted_on_publish() {
        let hub = Hub::start(4);
        let (_, queue) = hub.open_connection(Some(user("u1")));
        drop(queue);

        hub.send_to_user(&user("u1"), "notification", "x");
        assert_eq!(hub.connection_count().await, 0);
        assert_eq!(hub.stats().await.lifetime.slow_consumer_evictions, 0);
    }

    #[tokio::test]
    async fn test_register_prebuilt_connection() {
        let hub = Hub::start(4);
        let (connection, mut queue) = Connection::new(Some(user("u1")), 4);
        let id = connection.id();
        assert_eq!(connection.subscriber(), Some(&user("u1")));
        hub.register(connection);

        assert_eq!(hub.subscriber_connections(&user("u1")).await, vec![id]);
        hub.send_to_user(&user("u1"), "notification", "x");
        assert_eq!(&*queue.recv().await.unwrap(), "x");
    }

    #[tokio::test]
    async fn test_shutdown_closes_queues_and_ignores_later_calls() {
        let hub = Hub::start(4);
        let (_, mut a) = hub.open_connection(Some(user("u1")));
        let (_, mut b) = hub.open_connection(None);

        hub.shutdown();
        assert!(a.recv().await.is_none());
        assert!(b.recv().await.is_none());

        hub.broadcast("announcement", "late");
        let (_, mut late) = hub.open_connection(None);
        assert!(late.recv().await.is_none());
        assert_eq!(hub.connection_count().await, 0);
        assert!(hub.subscriber_connections(&user("u1")).await.is_empty());
    }
}
