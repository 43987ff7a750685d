use crate::engine::{self, Report, RequestKind, ResponseKind};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, State, WebSocketUpgrade,
    },
    http::Method,
    response::IntoResponse,
    routing::get,
};
use axum_extra::{headers, TypedHeader};
use futures::{stream::SplitSink, Future, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::{broadcast, Mutex};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct SharedState {
    pub clients: Clients,
    pub requester: engine::Requester,
}

pub async fn run<F, Fut>(
    http_port: u16,
    state: SharedState,
    req_handler: F,
) -> Result<(), std::io::Error>
where
    F: FnMut(SocketAddr, ClientMessageKind) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = ServerMessageKind> + Send + 'static,
{
    let cors = CorsLayer::new()
        .allow_methods(vec![Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_origin(tower_http::cors::Any);

    let app = axum::Router::new()
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state((state, req_handler));

    info!("Starting server on ws://localhost:{http_port}/ws");

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{http_port}")).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

async fn ws_handler<F, Fut>(
    ws: WebSocketUpgrade,
    user_agent: Option<TypedHeader<headers::UserAgent>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State((state, req_handler)): State<(SharedState, F)>,
) -> impl IntoResponse
where
    F: FnMut(SocketAddr, ClientMessageKind) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = ServerMessageKind> + Send + 'static,
{
    let user_agent = user_agent
        .map(|TypedHeader(user_agent)| user_agent.to_string())
        .unwrap_or_else(|| String::from("Unknown client"));
    info!(
        "New connection from {addr} ({user_agent}). (clients connected: {})",
        state.clients.len().await + 1
    );
    ws.on_upgrade(move |socket| handle_socket(socket, addr, state, req_handler))
}

async fn handle_socket<F, Fut>(
    socket: WebSocket,
    addr: SocketAddr,
    state: SharedState,
    mut req_handler: F,
) where
    F: FnMut(SocketAddr, ClientMessageKind) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = ServerMessageKind> + Send + 'static,
{
    let (tx, mut rx) = socket.split();
    let mut brd_rx = state.clients.tx.subscribe();
    let mut clients = state.clients;
    clients.push(Client { addr }).await;
    let tx = Arc::new(Mutex::new(tx));
    let tx2 = Arc::clone(&tx);

    // A fresh client starts from the current selections and the catalog.
    if let Some(response) = engine::send_request(&state.requester, RequestKind::GetState).await {
        send_broadcast(
            &mut *tx.lock().await,
            ServerMessageKind::EngineResponse(response),
        )
        .await;
    }

    tokio::select! {
        _ = async move {
            while let Ok(msg) = brd_rx.recv().await {
                send_raw_msg(&mut *tx.lock().await, msg).await;
            }
        } => {},
        _ = async move {
            while let Some(Ok(msg)) = rx.next().await {
                match msg {
                    Message::Text(msg) => {
                        if let Ok(msg) = serde_json::from_str::<ClientMessage>(&msg) {
                            let payload = req_handler(addr, msg.payload).await;
                            send_msg(&mut *tx2.lock().await, ServerMessage {
                                id: msg.id,
                                response: true,
                                payload,
                            }).await;
                        } else {
                            warn!("Invalid message from {addr}: {msg}");
                        }
                    }
                    Message::Close(_) => {
                        break;
                    }
                    _ => {}
                }
            }
        } => {},
    };

    clients.remove(addr).await;
    info!(
        "Client at {addr} disconnected. (clients connected: {})",
        clients.len().await
    );
}

#[derive(Debug)]
pub struct Client {
    pub addr: SocketAddr,
}

pub async fn send_raw_msg(tx: &mut SplitSink<WebSocket, Message>, msg: Message) {
    tx.send(msg)
        .await
        .unwrap_or_else(|e| error!("Send error: {e}"));
}

pub async fn send_msg(tx: &mut SplitSink<WebSocket, Message>, msg: ServerMessage) {
    match serde_json::to_string(&msg) {
        Ok(msg) => send_raw_msg(tx, Message::Text(msg)).await,
        Err(e) => error!("Failed to serialize server message: {e}"),
    }
}

pub async fn send_broadcast(tx: &mut SplitSink<WebSocket, Message>, msg: ServerMessageKind) {
    let msg = ServerMessage {
        id: 0,
        response: false,
        payload: msg,
    };
    send_msg(tx, msg).await;
}

#[derive(Debug, Clone)]
pub struct Clients {
    // thread safe struct of Clients, can be cloned
    clients: Arc<Mutex<Vec<Client>>>,
    tx: broadcast::Sender<Message>,
}

impl Clients {
    pub fn new(broadcast_channel_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel::<Message>(broadcast_channel_capacity);
        Self {
            clients: Default::default(),
            tx,
        }
    }

    pub async fn len(&self) -> usize {
        let clients = self.clients.lock().await;
        clients.len()
    }

    pub async fn push(&mut self, client: Client) {
        let mut clients = self.clients.lock().await;
        clients.push(client);
    }

    pub async fn remove(&mut self, addr: SocketAddr) {
        let mut clients = self.clients.lock().await;
        clients.retain(|c| c.addr != addr);
    }

    pub fn broadcast(&mut self, payload: ServerMessageKind) {
        if self.tx.receiver_count() == 0 {
            return;
        }

        let msg = ServerMessage {
            id: 0,
            response: false,
            payload,
        };
        let msg = match serde_json::to_string(&msg) {
            Ok(msg) => Message::Text(msg),
            Err(e) => {
                error!("Failed to serialize server message: {e}");
                return;
            }
        };

        self.tx.send(msg).unwrap_or_else(|e| {
            error!("Broadcast error: {e}");
            0
        });
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum ServerMessageKind {
    Pong,
    Ack,
    Nak,
    EngineResponse(ResponseKind),
    EngineReport(Report),
}

#[derive(Debug, Serialize)]
pub struct ServerMessage {
    id: usize,
    response: bool,
    payload: ServerMessageKind,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum ClientMessageKind {
    Ping,
    Report(String),
    Engine(RequestKind),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClientMessage {
    id: usize,
    request: bool,
    payload: ClientMessageKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::Instrument;

    #[test]
    fn parse_engine_request() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"id": 3, "request": true, "payload": {"Engine": {"SelectInstrument": 129}}}"#,
        )
        .unwrap();
        assert_eq!(msg.id, 3);
        assert!(matches!(
            msg.payload,
            ClientMessageKind::Engine(RequestKind::SelectInstrument(Some(Instrument(129))))
        ));
    }

    #[test]
    fn parse_nrpn_without_lsb() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"id": 1, "request": true, "payload": {"Engine": {"SendNrpn": {"msb": 55, "lsb": null, "value": 64}}}}"#,
        )
        .unwrap();
        assert!(matches!(
            msg.payload,
            ClientMessageKind::Engine(RequestKind::SendNrpn {
                msb: Some(55),
                lsb: None,
                value: Some(64)
            })
        ));
    }

    #[test]
    fn serialize_malformed_report() {
        let msg = ServerMessage {
            id: 0,
            response: false,
            payload: ServerMessageKind::EngineReport(Report::Malformed(vec![0xF8])),
        };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"id":0,"response":false,"payload":{"EngineReport":{"Malformed":[248]}}}"#
        );
    }

    #[test]
    fn serialize_report() {
        let msg = ServerMessage {
            id: 0,
            response: false,
            payload: ServerMessageKind::EngineReport(Report::NoDevicesFound),
        };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"id":0,"response":false,"payload":{"EngineReport":"NoDevicesFound"}}"#
        );
    }
}
