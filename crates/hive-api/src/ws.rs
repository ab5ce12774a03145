//! The sector `WebSocket` endpoint.
//!
//! Each game server holds one connection at
//! `GET /ws/hive/{hive_id}/sector/{sector_id}`. The connection is split in
//! two pumps:
//!
//! - the write pump forwards the hub's outbound queue to the socket and
//!   pings the sector periodically;
//! - the read pump hands every text frame to the dispatcher, waits for the
//!   result, passes the routing plan to the hub, and only then reads the
//!   next frame.
//!
//! When the read side ends the connection unregisters from the hub, which
//! closes the outbound queue and lets the write pump finish.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use hive_relay::{Affinity, DispatchError, Registration};
use hive_types::{HiveId, SectorId};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::error::ApiError;
use crate::handlers::parse_uuid;
use crate::state::AppState;

/// Upgrade a sector's HTTP request to its relay connection.
///
/// # Route
///
/// `GET /ws/hive/{hive_id}/sector/{sector_id}`
///
/// Responds `404` if the sector is not registered in the hive.
pub async fn ws_sector(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<Arc<AppState>>,
    Path((hive_id, sector_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let affinity = Affinity::new(
        HiveId::from(parse_uuid(&hive_id)?),
        SectorId::from(parse_uuid(&sector_id)?),
    );

    if !state
        .store
        .sector_exists(affinity.hive_id, affinity.sector_id)
        .await?
    {
        return Err(ApiError::NotFound(format!(
            "sector {} in hive {}",
            affinity.sector_id, affinity.hive_id
        )));
    }

    let upgrade = upgrade.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let max_message_bytes = state.socket.max_message_bytes;

    Ok(upgrade
        .max_message_size(max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state, affinity))
        .into_response())
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, affinity: Affinity) {
    let Registration { id, outbound } = match state.hub.register(affinity).await {
        Ok(registration) => registration,
        Err(e) => {
            warn!(sector = %affinity.sector_id, error = %e, "Rejecting sector connection");
            return;
        }
    };

    let (sink, stream) = socket.split();
    let mut writer = tokio::spawn(write_pump(sink, outbound, state.socket.ping_interval));

    let writer_finished = read_pump(stream, &state, affinity, &mut writer).await;

    if let Err(e) = state.hub.unregister(id).await {
        debug!(connection = %id, error = %e, "Hub already stopped");
    }
    let writer_result = if writer_finished {
        Ok(())
    } else {
        writer.await
    };
    if let Err(e) = writer_result {
        warn!(connection = %id, error = %e, "Write pump panicked");
    }

    debug!(
        connection = %id,
        hive = %affinity.hive_id,
        sector = %affinity.sector_id,
        "Sector connection closed"
    );
}

/// Read frames until the sector goes away. Returns `true` if the loop ended
/// because the write pump finished first.
async fn read_pump(
    mut stream: SplitStream<WebSocket>,
    state: &AppState,
    affinity: Affinity,
    writer: &mut tokio::task::JoinHandle<()>,
) -> bool {
    loop {
        let frame = tokio::select! {
            frame = stream.next() => frame,
            _ = &mut *writer => {
                debug!(sector = %affinity.sector_id, "Write pump ended, closing connection");
                return true;
            }
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                match state.dispatcher.dispatch(affinity, text.as_str()).await {
                    Ok(plan) => {
                        if state.hub.deliver(affinity, plan).await.is_err() {
                            debug!("Hub stopped, closing connection");
                            return false;
                        }
                    }
                    Err(
                        e @ (DispatchError::NotFound(_)
                        | DispatchError::AlreadyExists(_)
                        | DispatchError::Invalid(_)),
                    ) => {
                        warn!(sector = %affinity.sector_id, error = %e, "Event rejected");
                    }
                    Err(e) => {
                        error!(sector = %affinity.sector_id, error = %e, "Event dispatch failed");
                    }
                }
            }
            Some(Ok(Message::Close(_))) | None => return false,
            Some(Ok(_)) => {
                // Binary frames carry nothing for us; pings are answered by
                // the socket itself.
            }
            Some(Err(e)) => {
                debug!(sector = %affinity.sector_id, "WebSocket error: {e}");
                return false;
            }
        }
    }
}

async fn write_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<String>,
    ping_interval: Duration,
) {
    let mut ping = tokio::time::interval(ping_interval.max(Duration::from_secs(1)));
    ping.tick().await;

    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(text) = message else {
                    // Unregistered or dropped by the hub.
                    let _ = sink.send(Message::Close(None)).await;
                    return;
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    debug!("Sector went away (send failed)");
                    return;
                }
            }
            _ = ping.tick() => {
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    debug!("Sector went away (ping failed)");
                    return;
                }
            }
        }
    }
}
