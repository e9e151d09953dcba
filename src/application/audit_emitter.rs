//! Fire-and-forget audit emission.
//!
//! `AuditEmitter::emit` serializes the event and pushes it onto a bounded
//! channel without waiting. An [`AuditWorker`] task drains the channel into
//! the [`AuditSink`]. Sink failures, a full channel and a stopped worker are
//! logged and counted; none of them reach the gateway's caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::domain::audit::AuditEvent;
use crate::domain::foundation::{EventEnvelope, SerializableDomainEvent};
use crate::ports::AuditSink;

/// Emitter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditEmitterConfig {
    /// Events buffered before new ones are dropped.
    pub channel_capacity: usize,
}

impl Default for AuditEmitterConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

enum Message {
    Event(EventEnvelope),
    Flush(oneshot::Sender<()>),
}

#[derive(Debug, Default)]
struct Counters {
    dropped: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Delivery counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditStats {
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
}

/// Cheap-to-clone handle used by the gateway to emit events.
#[derive(Clone)]
pub struct AuditEmitter {
    tx: mpsc::Sender<Message>,
    counters: Arc<Counters>,
}

impl AuditEmitter {
    /// Creates the emitter and the worker that must be run to deliver events.
    pub fn new(sink: Arc<dyn AuditSink>, config: AuditEmitterConfig) -> (Self, AuditWorker) {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let counters = Arc::new(Counters::default());
        (
            Self {
                tx,
                counters: counters.clone(),
            },
            AuditWorker { rx, sink, counters },
        )
    }

    /// Queues an event for delivery. Never blocks and never fails.
    pub fn emit(&self, event: &AuditEvent) {
        let envelope = match event.to_envelope() {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(
                    event_type = %event.event_type(),
                    tool = %event.tool_name,
                    error = %e,
                    "Failed to serialize audit event"
                );
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        if let Err(e) = self.tx.try_send(Message::Event(envelope)) {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            let reason = match e {
                TrySendError::Full(_) => "channel full",
                TrySendError::Closed(_) => "worker stopped",
            };
            tracing::warn!(
                event_type = %event.event_type(),
                tool = %event.tool_name,
                correlation_id = %event.correlation_id(),
                reason,
                "Dropping audit event"
            );
        }
    }

    /// Waits until every event queued before this call has been handed to
    /// the sink. Returns immediately if the worker is gone.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Message::Flush(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }

    pub fn stats(&self) -> AuditStats {
        AuditStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Background task delivering queued events to the sink.
pub struct AuditWorker {
    rx: mpsc::Receiver<Message>,
    sink: Arc<dyn AuditSink>,
    counters: Arc<Counters>,
}

impl AuditWorker {
    /// Runs until shutdown is signalled or every emitter is dropped.
    ///
    /// On shutdown, events already queued are delivered before returning.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.drain().await;
                        return;
                    }
                }
                message = self.rx.recv() => match message {
                    Some(message) => self.handle(message).await,
                    None => return,
                },
            }
        }
    }

    /// Spawns [`run`](Self::run) on the current runtime.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn drain(&mut self) {
        self.rx.close();
        while let Some(message) = self.rx.recv().await {
            self.handle(message).await;
        }
    }

    async fn handle(&self, message: Message) {
        match message {
            Message::Event(envelope) => self.deliver(envelope).await,
            Message::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }

    async fn deliver(&self, envelope: EventEnvelope) {
        let event_id = envelope.event_id.clone();
        let event_type = envelope.event_type.clone();
        match self.sink.emit(envelope).await {
            Ok(()) => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    event_id = %event_id,
                    event_type = %event_type,
                    error = %e,
                    "Audit sink rejected event"
                );
            }
        }
    }
}
