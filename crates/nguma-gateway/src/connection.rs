use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use nguma_db::Database;
use nguma_types::events::{GatewayCommand, GatewayEvent};

use crate::auth::verify_token;
use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle a WebSocket whose bearer token was already checked at upgrade time.
pub async fn handle_connection_authenticated(
    socket: WebSocket,
    dispatcher: Dispatcher,
    db: Arc<Database>,
    user_id: Uuid,
) {
    let (sender, receiver) = socket.split();
    start_session(sender, receiver, dispatcher, db, user_id).await;
}

/// Handle a WebSocket that must authenticate with an `Identify` command.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    db: Arc<Database>,
    jwt_secret: String,
) {
    let (sender, mut receiver) = socket.split();

    let user_id = match wait_for_identify(&mut receiver, &jwt_secret).await {
        Some(id) => id,
        None => {
            warn!("WebSocket client failed to identify, closing");
            return;
        }
    };

    start_session(sender, receiver, dispatcher, db, user_id).await;
}

async fn start_session(
    mut sender: SplitSink<WebSocket, Message>,
    receiver: SplitStream<WebSocket>,
    dispatcher: Dispatcher,
    db: Arc<Database>,
    user_id: Uuid,
) {
    let is_admin = {
        let db = db.clone();
        match tokio::task::spawn_blocking(move || db.is_admin(user_id)).await {
            Ok(Ok(is_admin)) => is_admin,
            Ok(Err(e)) => {
                warn!("Role lookup failed for {}: {}", user_id, e);
                return;
            }
            Err(e) => {
                warn!("Role lookup task failed for {}: {}", user_id, e);
                return;
            }
        }
    };

    info!("{} connected to gateway (admin: {})", user_id, is_admin);

    let ready = GatewayEvent::Ready { user_id, is_admin };
    if send_event(&mut sender, &ready).await.is_err() {
        return;
    }

    run_connection_loop(sender, receiver, dispatcher, db, user_id, is_admin).await;
}

async fn run_connection_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    dispatcher: Dispatcher,
    db: Arc<Database>,
    user_id: Uuid,
    is_admin: bool,
) {
    // Subscribe before anything else so no event between Ready and the loop is lost
    let mut broadcast_rx = dispatcher.subscribe();

    // Replies that only this connection should see (subscription acks)
    let (direct_tx, mut direct_rx) = mpsc::unbounded_channel::<GatewayEvent>();

    let subscriptions: Arc<RwLock<HashSet<Uuid>>> = Arc::new(RwLock::new(HashSet::new()));
    let send_subscriptions = subscriptions.clone();

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let dispatch = match result {
                        Ok(dispatch) => dispatch,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Broadcast receiver for {} lagged by {} events", user_id, n);
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    };

                    let wanted = send_subscriptions
                        .read()
                        .map(|subs| dispatch.audience.reaches(user_id, is_admin, &subs))
                        .unwrap_or(false);
                    if !wanted {
                        continue;
                    }

                    if sender.send(Message::Text(dispatch.json.to_string().into())).await.is_err() {
                        break;
                    }
                }
                direct = direct_rx.recv() => {
                    let Some(event) = direct else { break };
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!(
                                "Heartbeat timeout (missed {} pongs), dropping connection",
                                missed_heartbeats
                            );
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Default::default())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => {
                        handle_command(&db, user_id, is_admin, cmd, &subscriptions, &direct_tx)
                            .await;
                    }
                    Err(e) => {
                        warn!(
                            "{} bad command: {} -- raw: {}",
                            user_id,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("{} disconnected from gateway", user_id);
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &GatewayEvent,
) -> Result<(), ()> {
    let text = serde_json::to_string(event).map_err(|e| {
        warn!("Failed to serialize {}: {}", event.kind(), e);
    })?;
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}

async fn wait_for_identify(
    receiver: &mut SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<Uuid> {
    let identify = async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { token }) =
                    serde_json::from_str::<GatewayCommand>(&text)
                {
                    return verify_token(&token, jwt_secret).map(|claims| claims.sub);
                }
            }
        }
        None
    };

    tokio::time::timeout(IDENTIFY_TIMEOUT, identify).await.ok().flatten()
}

async fn handle_command(
    db: &Arc<Database>,
    user_id: Uuid,
    is_admin: bool,
    cmd: GatewayCommand,
    subscriptions: &Arc<RwLock<HashSet<Uuid>>>,
    direct_tx: &mpsc::UnboundedSender<GatewayEvent>,
) {
    match cmd {
        GatewayCommand::Identify { .. } => {} // Already handled

        GatewayCommand::Subscribe { conversation_ids } => {
            let requested = conversation_ids.len();
            let db = db.clone();
            let accepted = match tokio::task::spawn_blocking(move || {
                authorized_conversations(&db, user_id, is_admin, &conversation_ids)
            })
            .await
            {
                Ok(Ok(ids)) => ids,
                Ok(Err(e)) => {
                    warn!("Subscription lookup failed for {}: {}", user_id, e);
                    return;
                }
                Err(e) => {
                    warn!("Subscription task failed for {}: {}", user_id, e);
                    return;
                }
            };

            debug!(
                "{} subscribed to {}/{} conversations",
                user_id,
                accepted.len(),
                requested
            );

            if let Ok(mut subs) = subscriptions.write() {
                *subs = accepted.iter().copied().collect();
            }
            let _ = direct_tx.send(GatewayEvent::Subscribed {
                conversation_ids: accepted,
            });
        }
    }
}

/// Filter requested conversation ids down to the ones the caller may watch:
/// their own, or any existing conversation for admins.
pub fn authorized_conversations(
    db: &Database,
    user_id: Uuid,
    is_admin: bool,
    requested: &[Uuid],
) -> anyhow::Result<Vec<Uuid>> {
    let mut seen = HashSet::new();
    let mut accepted = Vec::new();
    for id in requested {
        if !seen.insert(*id) {
            continue;
        }
        if let Some(conversation) = db.get_conversation(*id)? {
            if is_admin || conversation.user_id == user_id {
                accepted.push(*id);
            }
        }
    }
    Ok(accepted)
}
