//! Message broker client.
//!
//! # Responsibilities
//! - Own the broker connection for the whole service
//! - Queue subscriptions (competing consumers) and topic subscriptions
//!   (fan-out)
//! - Publish counterparts used by peers and by the test suite
//! - Close exactly once on shutdown, ending all subscription workers
//!
//! # Design Decisions
//! - Two-phase startup: `new` parses the address, `connect` performs I/O
//! - Queue = broker list with blocking pop, topic = pub/sub channel
//! - Every subscription worker owns a dedicated connection; blocking pops
//!   never run on the shared multiplexed connection
//! - Handlers run sequentially per subscription, in delivery order

use std::borrow::Cow;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::observability::metrics;

/// How long one blocking queue pop waits before looping to observe stop.
const QUEUE_POLL_SECS: f64 = 1.0;

/// Pause after a failed queue poll before retrying.
const QUEUE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Errors that can occur on the broker client.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// The broker address could not be parsed.
    #[error("invalid broker address '{address}': {source}")]
    InvalidAddress {
        address: String,
        source: redis::RedisError,
    },

    /// Operation attempted before `connect` or after `close`.
    #[error("messaging client is not connected")]
    NotConnected,

    /// The broker rejected or dropped an operation.
    #[error("broker error: {0}")]
    Broker(#[from] redis::RedisError),
}

/// One message handed to a subscription handler.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Locally assigned id for log correlation.
    pub message_id: Uuid,

    /// Queue or topic the message arrived on.
    pub source: String,

    /// Raw payload bytes.
    pub body: Vec<u8>,
}

impl Delivery {
    fn new(source: &str, body: Vec<u8>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            source: source.to_string(),
            body,
        }
    }

    /// Payload rendered as text for logging. Lossy on purpose.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Client for the message broker.
///
/// Created once at startup, shared behind an `Arc` between the bootstrap,
/// the health surface and the shutdown cleanup task.
pub struct MessagingClient {
    client: Client,
    address: String,
    /// Shared connection for publishing and health probes.
    connection: Mutex<Option<MultiplexedConnection>>,
    /// Set once by the first `close`; later calls are no-ops.
    closed: AtomicBool,
    /// Fired by `close` to end all subscription workers.
    stop: broadcast::Sender<()>,
}

impl MessagingClient {
    /// Create a client for the given broker address.
    ///
    /// Only parses the address; no I/O happens until [`connect`].
    ///
    /// [`connect`]: MessagingClient::connect
    pub fn new(broker_url: &str) -> Result<Self, MessagingError> {
        let client = Client::open(broker_url).map_err(|source| MessagingError::InvalidAddress {
            address: broker_url.to_string(),
            source,
        })?;
        let (stop, _) = broadcast::channel(1);

        Ok(Self {
            client,
            address: broker_url.to_string(),
            connection: Mutex::new(None),
            closed: AtomicBool::new(false),
            stop,
        })
    }

    /// Establish the shared broker connection.
    pub async fn connect(&self) -> Result<(), MessagingError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(MessagingError::NotConnected);
        }

        let connection = self.client.get_multiplexed_async_connection().await?;
        *self.connection.lock().await = Some(connection);

        tracing::info!(address = %self.address, "Connected to message broker");
        Ok(())
    }

    /// Subscribe to a work queue with competing-consumer semantics.
    ///
    /// Each queued message is delivered to exactly one subscriber. The
    /// handler runs to completion per message; deliveries on one
    /// subscription never interleave. Setup errors surface here; the worker
    /// itself only stops when the client closes.
    pub async fn subscribe_to_queue<F, Fut>(
        &self,
        queue: &str,
        consumer: &str,
        handler: F,
    ) -> Result<(), MessagingError>
    where
        F: Fn(Delivery) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.ensure_connected().await?;

        // Blocking pops would starve the shared multiplexed connection, so
        // each queue worker gets its own.
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let mut stop = self.subscribe_stop()?;
        let queue = queue.to_string();
        let consumer = consumer.to_string();

        tokio::spawn(async move {
            tracing::info!(queue = %queue, consumer = %consumer, "Queue subscription started");
            loop {
                tokio::select! {
                    _ = stop.recv() => break,
                    popped = queue_pop(&mut connection, &queue) => match popped {
                        Ok(Some(body)) => {
                            let delivery = Delivery::new(&queue, body);
                            metrics::record_message_received(&queue);
                            handler(delivery).await;
                        }
                        // Poll timeout; loop so stop stays observable.
                        Ok(None) => {}
                        Err(error) => {
                            tracing::warn!(queue = %queue, %error, "Queue poll failed; backing off");
                            tokio::time::sleep(QUEUE_RETRY_DELAY).await;
                        }
                    }
                }
            }
            tracing::info!(queue = %queue, "Queue subscription stopped");
        });

        Ok(())
    }

    /// Subscribe to a topic with fan-out semantics.
    ///
    /// Every live subscriber receives every message. Subscription setup
    /// errors surface here, before the worker spawns.
    pub async fn subscribe_to_topic<F, Fut>(
        &self,
        topic: &str,
        consumer: &str,
        handler: F,
    ) -> Result<(), MessagingError>
    where
        F: Fn(Delivery) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.ensure_connected().await?;

        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(topic).await?;
        let mut stop = self.subscribe_stop()?;
        let topic = topic.to_string();
        let consumer = consumer.to_string();

        tokio::spawn(async move {
            tracing::info!(topic = %topic, consumer = %consumer, "Topic subscription started");
            let mut messages = pubsub.into_on_message();
            loop {
                tokio::select! {
                    _ = stop.recv() => break,
                    message = messages.next() => match message {
                        Some(message) => {
                            let delivery = Delivery::new(
                                message.get_channel_name(),
                                message.get_payload_bytes().to_vec(),
                            );
                            metrics::record_message_received(&topic);
                            handler(delivery).await;
                        }
                        None => {
                            tracing::warn!(topic = %topic, "Topic stream ended; broker connection lost");
                            break;
                        }
                    }
                }
            }
            tracing::info!(topic = %topic, "Topic subscription stopped");
        });

        Ok(())
    }

    /// Enqueue a message for a single competing consumer.
    pub async fn publish_to_queue(&self, queue: &str, body: &[u8]) -> Result<(), MessagingError> {
        let mut connection = self.shared_connection().await?;
        let _: () = connection.lpush(queue, body).await?;
        Ok(())
    }

    /// Broadcast a message to every live subscriber of `topic`.
    pub async fn publish_to_topic(&self, topic: &str, body: &[u8]) -> Result<(), MessagingError> {
        let mut connection = self.shared_connection().await?;
        let _: () = connection.publish(topic, body).await?;
        Ok(())
    }

    /// Broker liveness probe. False when unreachable, unconnected or closed.
    pub async fn ping(&self) -> bool {
        let Ok(mut connection) = self.shared_connection().await else {
            return false;
        };

        let pong: Result<String, redis::RedisError> =
            redis::cmd("PING").query_async(&mut connection).await;
        match pong {
            Ok(pong) => pong == "PONG",
            Err(error) => {
                tracing::debug!(%error, "Broker ping failed");
                false
            }
        }
    }

    /// Release the broker connection and stop all subscription workers.
    ///
    /// Safe to call from multiple tasks: only the first call performs the
    /// release and returns true, every later or concurrent call returns
    /// false without touching anything.
    pub async fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }

        let _ = self.stop.send(());
        let had_connection = self.connection.lock().await.take().is_some();
        tracing::info!(had_connection, "Messaging client closed");
        true
    }

    async fn ensure_connected(&self) -> Result<(), MessagingError> {
        if self.closed.load(Ordering::SeqCst) || self.connection.lock().await.is_none() {
            return Err(MessagingError::NotConnected);
        }
        Ok(())
    }

    /// Stop receiver for a new worker.
    ///
    /// Receiver first, flag second: a concurrent close is then either seen
    /// here or by the worker's select loop, never lost.
    fn subscribe_stop(&self) -> Result<broadcast::Receiver<()>, MessagingError> {
        let stop = self.stop.subscribe();
        if self.closed.load(Ordering::SeqCst) {
            return Err(MessagingError::NotConnected);
        }
        Ok(stop)
    }

    async fn shared_connection(&self) -> Result<MultiplexedConnection, MessagingError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(MessagingError::NotConnected);
        }
        self.connection
            .lock()
            .await
            .clone()
            .ok_or(MessagingError::NotConnected)
    }
}

impl std::fmt::Debug for MessagingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagingClient")
            .field("address", &self.address)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

/// One blocking pop with a short timeout. `None` means the poll timed out.
async fn queue_pop(
    connection: &mut MultiplexedConnection,
    queue: &str,
) -> Result<Option<Vec<u8>>, redis::RedisError> {
    let popped: Option<(String, Vec<u8>)> = connection.brpop(queue, QUEUE_POLL_SECS).await?;
    Ok(popped.map(|(_, body)| body))
}
