//! # Realtime Translation Relay
//!
//! Clients connect to `/ws/translate` and exchange JSON events over the
//! WebSocket. An inbound `send_message` event is translated via the
//! translation gateway and the result is broadcast as `receive_translation`
//! to every connected client — including the sender.
//!
//! ## Actor Model:
//! One `RelayServer` actor owns the set of connected clients; each WebSocket
//! connection is an independent `RelaySession` actor that registers itself on
//! start and deregisters on stop. Translation happens in a spawned task so a
//! slow upstream call never blocks the session's mailbox.
//!
//! ## Message Format:
//! - **Client → Server**: `{"type": "send_message", "text": ..., "target_language": ...}`
//! - **Server → Client**: `{"type": "receive_translation", "translated_text": ...}`
//!
//! There is no per-connection state beyond membership, and no delivery
//! guarantee beyond arrival order per connection.

use crate::gateways::translate::{TranslationGateway, DEFAULT_TARGET_LANGUAGE};
use crate::state::AppState;
use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// WebSocket event types for client-server communication.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelayEvent {
    /// Chat message from a client, to be translated and broadcast
    #[serde(rename = "send_message")]
    SendMessage {
        text: String,
        /// Defaults to `es` when omitted
        target_language: Option<String>,
    },

    /// Broadcast translation result from the server
    #[serde(rename = "receive_translation")]
    ReceiveTranslation { translated_text: String },

    /// Error event sent to the originating client only
    #[serde(rename = "error")]
    Error { code: String, message: String },

    /// Heartbeat from the server
    #[serde(rename = "ping")]
    Ping { timestamp: u64 },

    /// Heartbeat reply from a client
    #[serde(rename = "pong")]
    Pong { timestamp: u64 },
}

/// Raw outbound frame pushed to a session's WebSocket.
#[derive(Message)]
#[rtype(result = "()")]
pub struct OutboundText(pub String);

/// A session registering with the relay server. Returns the session id.
#[derive(Message)]
#[rtype(result = "usize")]
pub struct Connect {
    pub addr: Recipient<OutboundText>,
}

/// A session leaving the relay server.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub id: usize,
}

/// A finished translation to fan out to every connected client.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Broadcast {
    pub translated_text: String,
}

/// Owns the set of connected relay clients and fans broadcasts out to them.
#[derive(Default)]
pub struct RelayServer {
    sessions: HashMap<usize, Recipient<OutboundText>>,
    next_id: usize,
}

impl RelayServer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Actor for RelayServer {
    type Context = Context<Self>;
}

impl Handler<Connect> for RelayServer {
    type Result = usize;

    fn handle(&mut self, msg: Connect, _ctx: &mut Self::Context) -> Self::Result {
        self.next_id += 1;
        self.sessions.insert(self.next_id, msg.addr);
        info!("Relay client {} connected ({} total)", self.next_id, self.sessions.len());
        self.next_id
    }
}

impl Handler<Disconnect> for RelayServer {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _ctx: &mut Self::Context) {
        if self.sessions.remove(&msg.id).is_some() {
            info!("Relay client {} disconnected ({} left)", msg.id, self.sessions.len());
        }
    }
}

impl Handler<Broadcast> for RelayServer {
    type Result = ();

    fn handle(&mut self, msg: Broadcast, _ctx: &mut Self::Context) {
        let event = RelayEvent::ReceiveTranslation {
            translated_text: msg.translated_text,
        };
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize broadcast: {}", e);
                return;
            }
        };

        debug!("Broadcasting translation to {} clients", self.sessions.len());
        for recipient in self.sessions.values() {
            recipient.do_send(OutboundText(json.clone()));
        }
    }
}

/// One WebSocket connection to the relay.
pub struct RelaySession {
    /// Id assigned by the relay server on Connect
    id: usize,
    server: Addr<RelayServer>,
    translator: TranslationGateway,
    app_state: web::Data<AppState>,
    heartbeat_interval: Duration,
    client_timeout: Duration,
    last_heartbeat: Instant,
}

impl RelaySession {
    pub fn new(
        server: Addr<RelayServer>,
        translator: TranslationGateway,
        app_state: web::Data<AppState>,
    ) -> Self {
        let relay_config = app_state.get_config().relay;
        Self {
            id: 0,
            server,
            translator,
            app_state,
            heartbeat_interval: Duration::from_secs(relay_config.heartbeat_interval_secs),
            client_timeout: Duration::from_secs(relay_config.client_timeout_secs),
            last_heartbeat: Instant::now(),
        }
    }

    /// Translate the message off the actor thread, then hand the result to
    /// the relay server for broadcast. Failures go back to the sender only.
    fn handle_send_message(
        &self,
        text: String,
        target_language: Option<String>,
        ctx: &mut ws::WebsocketContext<Self>,
    ) {
        if text.trim().is_empty() {
            self.send_error(ctx, "empty_message", "Field 'text' must not be empty");
            return;
        }

        let target = target_language
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TARGET_LANGUAGE.to_string());

        let translator = self.translator.clone();
        let server = self.server.clone();
        let addr = ctx.address();

        tokio::spawn(async move {
            match translator.translate(&text, &target).await {
                Ok(translated_text) => {
                    server.do_send(Broadcast { translated_text });
                }
                Err(err) => {
                    warn!("Relay translation failed: {}", err);
                    let event = RelayEvent::Error {
                        code: "translation_error".to_string(),
                        message: err.to_string(),
                    };
                    if let Ok(json) = serde_json::to_string(&event) {
                        addr.do_send(OutboundText(json));
                    }
                }
            }
        });
    }

    /// Any inbound frame proves the peer is alive, not just heartbeat
    /// replies. A chatting client that never answers the JSON ping must not
    /// be timed out.
    fn mark_client_alive(&mut self) {
        self.last_heartbeat = Instant::now();
    }

    fn client_timed_out(&self) -> bool {
        Instant::now().duration_since(self.last_heartbeat) > self.client_timeout
    }

    fn send_error(&self, ctx: &mut ws::WebsocketContext<Self>, code: &str, message: &str) {
        let event = RelayEvent::Error {
            code: code.to_string(),
            message: message.to_string(),
        };
        if let Ok(json) = serde_json::to_string(&event) {
            ctx.text(json);
        }
        warn!("Relay error {}: {}", code, message);
    }
}

impl Actor for RelaySession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.app_state.increment_active_connections();

        // Heartbeat: ping on the configured interval, drop unresponsive peers
        ctx.run_interval(self.heartbeat_interval, move |act, ctx| {
            if act.client_timed_out() {
                warn!("Relay heartbeat timeout, closing connection");
                ctx.stop();
                return;
            }
            let ping = RelayEvent::Ping {
                timestamp: chrono::Utc::now().timestamp_millis() as u64,
            };
            if let Ok(json) = serde_json::to_string(&ping) {
                ctx.text(json);
            }
        });

        // Register with the relay server and remember the assigned id
        self.server
            .send(Connect {
                addr: ctx.address().recipient(),
            })
            .into_actor(self)
            .then(|res, act, ctx| {
                match res {
                    Ok(id) => act.id = id,
                    Err(_) => ctx.stop(),
                }
                fut::ready(())
            })
            .wait(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.server.do_send(Disconnect { id: self.id });
        self.app_state.decrement_active_connections();
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for RelaySession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        let frame = match msg {
            Ok(frame) => frame,
            Err(err) => {
                error!("Relay protocol error: {}", err);
                ctx.stop();
                return;
            }
        };

        self.mark_client_alive();

        match frame {
            ws::Message::Text(text) => match serde_json::from_str::<RelayEvent>(&text) {
                Ok(RelayEvent::SendMessage {
                    text,
                    target_language,
                }) => {
                    self.handle_send_message(text, target_language, ctx);
                }
                Ok(RelayEvent::Pong { .. }) => {}
                Ok(_) => {
                    warn!("Received unexpected relay event from client");
                }
                Err(err) => {
                    self.send_error(ctx, "invalid_json", &format!("Invalid JSON: {}", err));
                }
            },
            ws::Message::Ping(data) => {
                ctx.pong(&data);
            }
            ws::Message::Pong(_) => {}
            ws::Message::Close(reason) => {
                info!("Relay connection closed: {:?}", reason);
                ctx.stop();
            }
            ws::Message::Binary(_) => {
                self.send_error(ctx, "binary_unsupported", "The relay accepts text frames only");
            }
            ws::Message::Continuation(_) | ws::Message::Nop => {}
        }
    }
}

impl Handler<OutboundText> for RelaySession {
    type Result = ();

    fn handle(&mut self, msg: OutboundText, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

/// `GET /ws/translate` — upgrade the HTTP request to a relay session.
pub async fn translate_relay(
    req: HttpRequest,
    stream: web::Payload,
    server: web::Data<Addr<RelayServer>>,
    translator: web::Data<TranslationGateway>,
    app_state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    info!(
        "New relay connection from: {:?}",
        req.connection_info().peer_addr()
    );

    let session = RelaySession::new(
        server.get_ref().clone(),
        translator.get_ref().clone(),
        app_state,
    );
    ws::start(session, &req, stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Test actor that records every frame the relay server pushes to it.
    struct CaptureClient {
        received: Arc<Mutex<Vec<String>>>,
    }

    impl Actor for CaptureClient {
        type Context = Context<Self>;
    }

    impl Handler<OutboundText> for CaptureClient {
        type Result = ();

        fn handle(&mut self, msg: OutboundText, _ctx: &mut Self::Context) {
            self.received.lock().unwrap().push(msg.0);
        }
    }

    fn spawn_capture() -> (Arc<Mutex<Vec<String>>>, Recipient<OutboundText>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let addr = CaptureClient {
            received: received.clone(),
        }
        .start();
        (received, addr.recipient())
    }

    #[actix_web::test]
    async fn broadcast_reaches_every_connected_client_exactly_once() {
        let server = RelayServer::new().start();

        let (received_a, client_a) = spawn_capture();
        let (received_b, client_b) = spawn_capture();
        server.send(Connect { addr: client_a }).await.unwrap();
        server.send(Connect { addr: client_b }).await.unwrap();

        server
            .send(Broadcast {
                translated_text: "salut".to_string(),
            })
            .await
            .unwrap();

        // Let the capture actors drain their mailboxes
        tokio::time::sleep(Duration::from_millis(50)).await;

        for received in [&received_a, &received_b] {
            let frames = received.lock().unwrap();
            assert_eq!(frames.len(), 1);
            let event: RelayEvent = serde_json::from_str(&frames[0]).unwrap();
            match event {
                RelayEvent::ReceiveTranslation { translated_text } => {
                    assert_eq!(translated_text, "salut");
                }
                other => panic!("Unexpected event: {:?}", other),
            }
        }
    }

    #[actix_web::test]
    async fn disconnected_client_stops_receiving_broadcasts() {
        let server = RelayServer::new().start();

        let (received_a, client_a) = spawn_capture();
        let (received_b, client_b) = spawn_capture();
        let id_a = server.send(Connect { addr: client_a }).await.unwrap();
        server.send(Connect { addr: client_b }).await.unwrap();

        server.send(Disconnect { id: id_a }).await.unwrap();
        server
            .send(Broadcast {
                translated_text: "hola".to_string(),
            })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(received_a.lock().unwrap().is_empty());
        assert_eq!(received_b.lock().unwrap().len(), 1);
    }

    fn test_session(server: Addr<RelayServer>) -> RelaySession {
        let config = crate::config::AppConfig::default();
        RelaySession::new(
            server,
            TranslationGateway::new(reqwest::Client::new(), &config.google),
            web::Data::new(AppState::new(config)),
        )
    }

    #[actix_web::test]
    async fn inbound_activity_resets_the_liveness_clock() {
        let server = RelayServer::new().start();
        let mut session = test_session(server);

        // Backdate past the timeout, as if the client never sent a pong
        session.last_heartbeat = Instant::now()
            .checked_sub(session.client_timeout * 2)
            .unwrap();
        assert!(session.client_timed_out());

        // Any frame the stream handler sees counts as activity
        session.mark_client_alive();
        assert!(!session.client_timed_out());
    }

    #[test]
    fn send_message_event_deserializes_with_optional_target() {
        let event: RelayEvent = serde_json::from_str(
            r#"{"type": "send_message", "text": "hi", "target_language": "fr"}"#,
        )
        .unwrap();
        match event {
            RelayEvent::SendMessage {
                text,
                target_language,
            } => {
                assert_eq!(text, "hi");
                assert_eq!(target_language.as_deref(), Some("fr"));
            }
            other => panic!("Unexpected event: {:?}", other),
        }

        let event: RelayEvent =
            serde_json::from_str(r#"{"type": "send_message", "text": "hi"}"#).unwrap();
        assert!(matches!(
            event,
            RelayEvent::SendMessage {
                target_language: None,
                ..
            }
        ));
    }

    #[test]
    fn receive_translation_event_serializes_with_expected_tag() {
        let json = serde_json::to_string(&RelayEvent::ReceiveTranslation {
            translated_text: "bonjour".into(),
        })
        .unwrap();
        assert!(json.contains(r#""type":"receive_translation""#));
        assert!(json.contains(r#""translated_text":"bonjour""#));
    }
}
