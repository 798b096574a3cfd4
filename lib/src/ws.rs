// Copyright (c) 2022-2023 The MobileCoin Foundation

//! WebSocket transport
//!
//! Each WebSocket is owned by a single I/O task bridging it to a
//! channel-backed [Socket], frames are carried as binary messages or as
//! base64 text messages depending on the negotiated sub-protocol.

use futures::{SinkExt, StreamExt};
use log::{debug, warn};
use strum::{Display, EnumIter, EnumString};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::{
    accept_hdr_async, connect_async,
    tungstenite::{
        client::IntoClientRequest,
        handshake::server::{ErrorResponse, Request, Response},
        http::{HeaderValue, StatusCode},
        protocol::{frame::coding::CloseCode, CloseFrame},
        Message,
    },
    WebSocketStream,
};
use url::Url;

use mwa_proto::{
    encoding::{b64_decode, b64_encode},
    WS_PROTOCOL_BASE64, WS_PROTOCOL_BINARY,
};

use crate::{
    socket::{Frame, Socket, CLOSE_NORMAL},
    Error,
};

const PROTOCOL_HEADER: &str = "Sec-WebSocket-Protocol";

/// Frame encoding, selected by WebSocket sub-protocol
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumIter, clap::ValueEnum)]
#[strum(serialize_all = "snake_case")]
pub enum Encoding {
    /// Binary messages
    Binary,
    /// Base64 encoded text messages, for relays unable to carry binary
    Base64,
}

impl Encoding {
    /// Fetch the sub-protocol name for this encoding
    pub fn protocol(&self) -> &'static str {
        match self {
            Encoding::Binary => WS_PROTOCOL_BINARY,
            Encoding::Base64 => WS_PROTOCOL_BASE64,
        }
    }

    /// Resolve an encoding from a sub-protocol name
    pub fn from_protocol(p: &str) -> Option<Self> {
        match p.trim() {
            WS_PROTOCOL_BINARY => Some(Encoding::Binary),
            WS_PROTOCOL_BASE64 => Some(Encoding::Base64),
            _ => None,
        }
    }

    fn encode(&self, data: Vec<u8>) -> Message {
        match self {
            Encoding::Binary => Message::Binary(data),
            Encoding::Base64 => Message::Text(b64_encode(data)),
        }
    }

    /// Decode a message, `None` for control messages
    fn decode(&self, m: Message) -> Result<Option<Vec<u8>>, Error> {
        match (self, m) {
            (_, Message::Binary(b)) => Ok(Some(b)),
            (Encoding::Base64, Message::Text(t)) => Ok(Some(b64_decode(&t)?)),
            (Encoding::Binary, Message::Text(_)) => {
                Err(Error::Transport("text frame on binary socket".to_string()))
            }
            _ => Ok(None),
        }
    }
}

/// Connect to a WebSocket endpoint, offering the provided encodings
/// in order of preference
pub async fn connect(url: &Url, encodings: &[Encoding]) -> Result<Socket, Error> {
    debug!("connecting to {}", url);

    let mut req = url.as_str().into_client_request()?;

    let protocols = encodings
        .iter()
        .map(|e| e.protocol())
        .collect::<Vec<_>>()
        .join(", ");
    let v = HeaderValue::from_str(&protocols).map_err(|e| Error::Transport(e.to_string()))?;
    req.headers_mut().insert(PROTOCOL_HEADER, v);

    let (ws, rsp) = connect_async(req).await?;

    let encoding = match rsp.headers().get(PROTOCOL_HEADER).map(|v| v.to_str()) {
        None => Encoding::Binary,
        Some(Ok(p)) => match Encoding::from_protocol(p) {
            Some(e) if encodings.contains(&e) => e,
            _ => return Err(Error::UnsupportedSubprotocol(p.to_string())),
        },
        Some(Err(_)) => return Err(Error::UnsupportedSubprotocol("<invalid>".to_string())),
    };

    debug!("connected to {} ({} encoding)", url, encoding);

    Ok(spawn(ws, encoding))
}

/// Accept a WebSocket connection, selecting the first supported encoding
/// requested by the client and rejecting requests for other paths
pub async fn accept<S>(stream: S, path: &str, encodings: &[Encoding]) -> Result<Socket, Error>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut selected = None;

    let callback = |req: &Request, mut rsp: Response| {
        if req.uri().path() != path {
            return Err(error_response(StatusCode::NOT_FOUND, "unknown path"));
        }

        let requested = req
            .headers()
            .get(PROTOCOL_HEADER)
            .and_then(|v| v.to_str().ok());

        // Clients without sub-protocol support use binary frames
        let encoding = match requested {
            None => Encoding::Binary,
            Some(r) => {
                let e = r
                    .split(',')
                    .filter_map(Encoding::from_protocol)
                    .find(|e| encodings.contains(e));

                match e {
                    Some(e) => {
                        rsp.headers_mut()
                            .insert(PROTOCOL_HEADER, HeaderValue::from_static(e.protocol()));
                        e
                    }
                    None => {
                        return Err(error_response(
                            StatusCode::BAD_REQUEST,
                            "unsupported sub-protocol",
                        ))
                    }
                }
            }
        };

        selected = Some(encoding);
        Ok(rsp)
    };

    let ws = accept_hdr_async(stream, callback).await?;

    let encoding = selected.unwrap_or(Encoding::Binary);
    debug!("accepted connection ({} encoding)", encoding);

    Ok(spawn(ws, encoding))
}

fn error_response(status: StatusCode, reason: &str) -> ErrorResponse {
    let mut r = ErrorResponse::new(Some(reason.to_string()));
    *r.status_mut() = status;
    r
}

/// Spawn an I/O task bridging a WebSocket to a [Socket]
pub fn spawn<S>(ws: WebSocketStream<S>, encoding: Encoding) -> Socket
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (socket, in_tx, mut out_rx) = Socket::channel();

    tokio::spawn(async move {
        let (mut sink, mut stream) = ws.split();

        let closed = loop {
            tokio::select! {
                f = out_rx.recv() => {
                    let code = match f {
                        Some(Frame::Data(d)) => {
                            if let Err(e) = sink.send(encoding.encode(d)).await {
                                debug!("websocket send failed: {:?}", e);
                                break Frame::Closed { clean: false, code: None };
                            }
                            continue;
                        }
                        Some(Frame::Closed { code, .. }) => code,
                        None => None,
                    };

                    // Local close, nobody left to notify
                    let frame = CloseFrame {
                        code: CloseCode::from(code.unwrap_or(CLOSE_NORMAL)),
                        reason: "".into(),
                    };
                    let _ = sink.send(Message::Close(Some(frame))).await;
                    return;
                }
                m = stream.next() => match m {
                    Some(Ok(Message::Close(c))) => {
                        break Frame::Closed { clean: true, code: c.map(|c| u16::from(c.code)) };
                    }
                    Some(Ok(m)) => match encoding.decode(m) {
                        Ok(Some(d)) => {
                            if in_tx.send(Frame::Data(d)).await.is_err() {
                                return;
                            }
                        }
                        Ok(None) => (),
                        Err(e) => {
                            warn!("dropping connection: {}", e);
                            break Frame::Closed { clean: false, code: None };
                        }
                    },
                    Some(Err(e)) => {
                        debug!("websocket receive failed: {:?}", e);
                        break Frame::Closed { clean: false, code: None };
                    }
                    None => break Frame::Closed { clean: false, code: None },
                },
            }
        };

        let _ = in_tx.send(closed).await;
    });

    socket
}
