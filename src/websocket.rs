/// WebSocket session for one browser tab
use actix::prelude::*;
use actix_web::web;
use actix_web_actors::ws;
use std::time::{Duration, Instant};

use crate::dashboard::{AnalysisKind, Dashboard};
use crate::error::DashError;
use crate::messages::{ClientMessage, ServerMessage};
use crate::search::SearchOutcome;

/// How often heartbeat pings are sent
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
/// How long before lack of client response causes a timeout
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// WebSocket connection actor.
///
/// The segment selection lives here, per session; the dashboard it reads
/// from is shared and immutable.
pub struct DashboardSocket {
    hb: Instant,
    dashboard: web::Data<Dashboard>,
    segments: Vec<String>,
}

impl DashboardSocket {
    pub fn new(dashboard: web::Data<Dashboard>) -> Self {
        Self {
            hb: Instant::now(),
            dashboard,
            segments: Vec::new(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                log::warn!("websocket client heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn render(&self) -> ServerMessage {
        match self.dashboard.render(&self.segments) {
            Ok(view) => ServerMessage::Dashboard { view },
            Err(e) => error_message(&e),
        }
    }

    /// Answer one client message. Every failure becomes an `Error` reply.
    pub fn respond(&mut self, msg: ClientMessage) -> ServerMessage {
        match msg {
            ClientMessage::SetSegments { segments } => {
                self.segments = segments;
                self.render()
            }

            ClientMessage::Search { query } => match self.dashboard.search(&query) {
                Ok(SearchOutcome::Matches { products, total }) => ServerMessage::Suggestions {
                    query,
                    products,
                    total,
                },
                Ok(SearchOutcome::Idle) => ServerMessage::Suggestions {
                    query,
                    products: Vec::new(),
                    total: 0,
                },
                Ok(SearchOutcome::NoMatch { query, message }) => ServerMessage::NoMatch { query, message },
                Err(e) => error_message(&e),
            },

            ClientMessage::SelectProduct { product } => match self.dashboard.product_detail(&product) {
                Ok(detail) => ServerMessage::ProductDetail { detail },
                Err(e) => error_message(&e),
            },

            ClientMessage::RunAnalysis { analysis } => {
                match analysis
                    .parse::<AnalysisKind>()
                    .and_then(|kind| self.dashboard.purchase_analysis(kind))
                {
                    Ok(result) => ServerMessage::Analysis { result },
                    Err(e) => error_message(&e),
                }
            }
        }
    }

    fn send(ctx: &mut ws::WebsocketContext<Self>, msg: &ServerMessage) {
        match serde_json::to_string(msg) {
            Ok(text) => ctx.text(text),
            Err(e) => log::error!("failed to encode server message: {}", e),
        }
    }
}

fn error_message(err: &DashError) -> ServerMessage {
    log::debug!("websocket request failed: {}", err);
    ServerMessage::from(err)
}

impl Actor for DashboardSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);
        let initial = self.render();
        Self::send(ctx, &initial);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for DashboardSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                let reply = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => self.respond(client_msg),
                    Err(e) => ServerMessage::Error {
                        kind: "invalid_message".to_string(),
                        message: format!("Invalid message format: {}", e),
                    },
                };
                Self::send(ctx, &reply);
            }
            Ok(ws::Message::Binary(_)) => {
                log::warn!("unexpected binary websocket message");
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            _ => ctx.stop(),
        }
    }
}
