//! The connection hub.
//!
//! One task owns the registry of live connections and is the only code that
//! touches it. Everything else talks to it through a [`HubHandle`], which
//! wraps a bounded command queue. Each connection has its own bounded
//! outbound queue; the hub never waits on it. A connection whose queue is
//! full or closed is dropped on the spot and reported offline once.

use std::collections::HashMap;

use hive_types::SectorState;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::HubClosed;
use crate::presence::{PresenceChange, PresenceSender};
use crate::routing::{Affinity, RoutingPlan};

/// Default capacity of the hub command queue.
pub const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 512;

/// Default capacity of each connection's outbound queue.
pub const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Identifies one registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl core::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Queue sizes for the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Capacity of the command queue shared by all handles.
    pub command_queue_capacity: usize,
    /// Capacity of each connection's outbound queue.
    pub outbound_queue_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            command_queue_capacity: DEFAULT_COMMAND_QUEUE_CAPACITY,
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
        }
    }
}

/// A successful registration.
#[derive(Debug)]
pub struct Registration {
    /// The id to unregister with.
    pub id: ConnectionId,
    /// Messages routed to this connection. Closes when the hub drops it.
    pub outbound: mpsc::Receiver<String>,
}

/// Commands accepted by the hub task.
#[derive(Debug)]
pub enum HubCommand {
    /// Add a connection.
    Register {
        /// Its id.
        id: ConnectionId,
        /// The sector it speaks for.
        affinity: Affinity,
        /// Its outbound queue.
        outbound: mpsc::Sender<String>,
    },
    /// Remove a connection if it is still registered.
    Unregister {
        /// Its id.
        id: ConnectionId,
    },
    /// Route a dispatched event.
    Deliver {
        /// The sender.
        origin: Affinity,
        /// What to send where.
        plan: RoutingPlan,
    },
    /// Report the number of live connections.
    Count {
        /// Where to send the answer.
        reply: oneshot::Sender<usize>,
    },
    /// Close every connection and stop.
    Shutdown,
}

#[derive(Debug)]
struct ConnectionEntry {
    affinity: Affinity,
    outbound: mpsc::Sender<String>,
}

/// Cloneable front end of the hub task.
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
    outbound_queue_capacity: usize,
}

impl HubHandle {
    /// Register a connection for `affinity`.
    ///
    /// # Errors
    ///
    /// Returns [`HubClosed`] if the hub has stopped.
    pub async fn register(&self, affinity: Affinity) -> Result<Registration, HubClosed> {
        let id = ConnectionId::new();
        let (outbound, rx) = mpsc::channel(self.outbound_queue_capacity);
        self.commands
            .send(HubCommand::Register {
                id,
                affinity,
                outbound,
            })
            .await?;
        Ok(Registration { id, outbound: rx })
    }

    /// Remove a connection. Removing an unknown id is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`HubClosed`] if the hub has stopped.
    pub async fn unregister(&self, id: ConnectionId) -> Result<(), HubClosed> {
        self.commands.send(HubCommand::Unregister { id }).await?;
        Ok(())
    }

    /// Hand a routing plan to the hub. [`RoutingPlan::None`] is not sent.
    ///
    /// # Errors
    ///
    /// Returns [`HubClosed`] if the hub has stopped.
    pub async fn deliver(&self, origin: Affinity, plan: RoutingPlan) -> Result<(), HubClosed> {
        if plan.is_none() {
            return Ok(());
        }
        self.commands
            .send(HubCommand::Deliver { origin, plan })
            .await?;
        Ok(())
    }

    /// Number of live connections.
    ///
    /// # Errors
    ///
    /// Returns [`HubClosed`] if the hub has stopped.
    pub async fn connection_count(&self) -> Result<usize, HubClosed> {
        let (reply, rx) = oneshot::channel();
        self.commands.send(HubCommand::Count { reply }).await?;
        Ok(rx.await?)
    }

    /// Ask the hub to close every connection and stop.
    ///
    /// # Errors
    ///
    /// Returns [`HubClosed`] if the hub has already stopped.
    pub async fn shutdown(&self) -> Result<(), HubClosed> {
        self.commands.send(HubCommand::Shutdown).await?;
        Ok(())
    }
}

/// The hub task state.
#[derive(Debug)]
pub struct Hub {
    commands: mpsc::Receiver<HubCommand>,
    connections: HashMap<ConnectionId, ConnectionEntry>,
    presence: PresenceSender,
}

impl Hub {
    /// Create a hub and its handle. Nothing runs until [`Hub::run`].
    pub fn new(config: HubConfig, presence: PresenceSender) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(config.command_queue_capacity);
        let hub = Self {
            commands: rx,
            connections: HashMap::new(),
            presence,
        };
        let handle = HubHandle {
            commands: tx,
            outbound_queue_capacity: config.outbound_queue_capacity,
        };
        (hub, handle)
    }

    /// Create a hub and run it on the current runtime.
    pub fn spawn(config: HubConfig, presence: PresenceSender) -> (HubHandle, JoinHandle<()>) {
        let (hub, handle) = Self::new(config, presence);
        (handle, tokio::spawn(hub.run()))
    }

    /// Process commands until [`HubCommand::Shutdown`] or until every handle
    /// is dropped.
    pub async fn run(mut self) {
        tracing::info!("Connection hub started");

        while let Some(command) = self.commands.recv().await {
            match command {
                HubCommand::Register {
                    id,
                    affinity,
                    outbound,
                } => self.register(id, affinity, outbound),
                HubCommand::Unregister { id } => self.remove(id),
                HubCommand::Deliver { origin, plan } => self.deliver(origin, &plan),
                HubCommand::Count { reply } => {
                    // The asker may have given up; nothing to do then.
                    let _ = reply.send(self.connections.len());
                }
                HubCommand::Shutdown => break,
            }
        }

        let ids: Vec<ConnectionId> = self.connections.keys().copied().collect();
        for id in ids {
            self.remove(id);
        }
        tracing::info!("Connection hub stopped");
    }

    fn register(&mut self, id: ConnectionId, affinity: Affinity, outbound: mpsc::Sender<String>) {
        self.connections
            .insert(id, ConnectionEntry { affinity, outbound });
        tracing::info!(
            connection = %id,
            hive = %affinity.hive_id,
            sector = %affinity.sector_id,
            connections = self.connections.len(),
            "Sector connected"
        );
        self.report(affinity, SectorState::Booting);
    }

    fn remove(&mut self, id: ConnectionId) {
        let Some(entry) = self.connections.remove(&id) else {
            return;
        };
        tracing::info!(
            connection = %id,
            hive = %entry.affinity.hive_id,
            sector = %entry.affinity.sector_id,
            connections = self.connections.len(),
            "Sector disconnected"
        );
        // A reconnect may already hold the same affinity.
        let still_connected = self
            .connections
            .values()
            .any(|other| other.affinity == entry.affinity);
        if !still_connected {
            self.report(entry.affinity, SectorState::Offline);
        }
    }

    fn deliver(&mut self, origin: Affinity, plan: &RoutingPlan) {
        let mut failed = Vec::new();

        for (id, entry) in &self.connections {
            if entry.affinity.hive_id != origin.hive_id {
                continue;
            }
            let message = match plan {
                RoutingPlan::None => None,
                RoutingPlan::Broadcast(raw) => {
                    (entry.affinity.sector_id != origin.sector_id).then_some(raw)
                }
                RoutingPlan::Targeted(messages) => messages.get(&entry.affinity.sector_id),
            };
            let Some(message) = message else {
                continue;
            };
            if let Err(e) = entry.outbound.try_send(message.clone()) {
                tracing::warn!(
                    connection = %id,
                    sector = %entry.affinity.sector_id,
                    error = %e,
                    "Outbound queue rejected message, dropping connection"
                );
                failed.push(*id);
            }
        }

        for id in failed {
            self.remove(id);
        }
    }

    fn report(&self, affinity: Affinity, state: SectorState) {
        if self
            .presence
            .send(PresenceChange { affinity, state })
            .is_err()
        {
            tracing::debug!(sector = %affinity.sector_id, "Presence writer gone");
        }
    }
}
