use actix::{Actor, ActorContext, AsyncContext, Handler, Message, Recipient};
use actix_web::{Error, HttpRequest, HttpResponse, web};
use actix_web_actors::ws;
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use serde_urlencoded;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::AppState;

static NEXT_SESSION_ID: AtomicUsize = AtomicUsize::new(1);

#[derive(Message)]
#[rtype(result = "()")]
struct WsMessage(pub String);

#[derive(Message)]
#[rtype(result = "()")]
struct Connect {
    session_id: usize,
    addr: Recipient<WsMessage>,
}

#[derive(Message)]
#[rtype(result = "()")]
struct Disconnect {
    session_id: usize,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct PublishAnalysis {
    pub event: AnalysisEvent,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnalysisEvent {
    pub event: &'static str,
    pub data: AnalysisEventData,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnalysisEventData {
    pub id: i32,
    pub title: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Хаб ленты: рассылает событие о новой публикации всем подключённым сессиям.
pub struct FeedHub {
    sessions: HashMap<usize, Recipient<WsMessage>>,
}

impl FeedHub {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }
}

impl Default for FeedHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Actor for FeedHub {
    type Context = actix::Context<Self>;
}

impl Handler<Connect> for FeedHub {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Self::Context) -> Self::Result {
        self.sessions.insert(msg.session_id, msg.addr);
    }
}

impl Handler<Disconnect> for FeedHub {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Self::Context) -> Self::Result {
        self.sessions.remove(&msg.session_id);
    }
}

impl Handler<PublishAnalysis> for FeedHub {
    type Result = ();

    fn handle(&mut self, msg: PublishAnalysis, _: &mut Self::Context) -> Self::Result {
        if let Ok(payload) = serde_json::to_string(&msg.event) {
            for addr in self.sessions.values() {
                let _ = addr.do_send(WsMessage(payload.clone()));
            }
        }
    }
}

struct FeedSession {
    session_id: usize,
    hub: actix::Addr<FeedHub>,
}

impl FeedSession {
    fn new(hub: actix::Addr<FeedHub>) -> Self {
        Self {
            session_id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            hub,
        }
    }
}

impl Actor for FeedSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hub.do_send(Connect {
            session_id: self.session_id,
            addr: ctx.address().recipient(),
        });
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        self.hub.do_send(Disconnect {
            session_id: self.session_id,
        });
    }
}

impl Handler<WsMessage> for FeedSession {
    type Result = ();

    fn handle(&mut self, msg: WsMessage, ctx: &mut Self::Context) -> Self::Result {
        ctx.text(msg.0);
    }
}

impl actix::StreamHandler<Result<ws::Message, ws::ProtocolError>> for FeedSession {
    fn handle(&mut self, item: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match item {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Text(_)) => {}
            Ok(ws::Message::Binary(_)) => {}
            Ok(ws::Message::Continuation(_)) => {}
            Ok(ws::Message::Nop) => {}
            Err(_) => ctx.stop(),
        }
    }
}

#[derive(Deserialize)]
struct WsQuery {
    token: String,
}

#[derive(Deserialize)]
struct Claims {
    #[allow(dead_code)]
    sub: i32,
    #[allow(dead_code)]
    exp: usize,
}

pub async fn feed_ws(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let token = serde_urlencoded::from_str::<WsQuery>(req.query_string())
        .ok()
        .map(|q| q.token)
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        return Err(actix_web::error::ErrorUnauthorized("Missing token"));
    };

    verify_token(&token, &state.jwt_secret)?;
    ws::start(FeedSession::new(state.feed_hub.clone()), &req, stream)
}

fn verify_token(token: &str, secret: &str) -> Result<(), Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|_| ())
    .map_err(|_| actix_web::error::ErrorUnauthorized("Invalid token"))
}

/// Отправляет событие о новой публикации в ленту. Ошибки рассылки
/// не влияют на сам insert.
pub fn notify_analysis(hub: &actix::Addr<FeedHub>, analysis: &crate::models::Analysis) {
    hub.do_send(PublishAnalysis {
        event: AnalysisEvent {
            event: "analysis.published",
            data: AnalysisEventData {
                id: analysis.id,
                title: analysis.title.clone(),
                created_at: analysis.created_at,
            },
        },
    });
}
