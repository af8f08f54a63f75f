//! `/ws` upgrade and the liveness echo session.

use std::io::{Read, Write};
use std::thread;

use tiny_http::{Header, Request, Response, StatusCode};
use tracing::{debug, warn};
use tungstenite::handshake::derive_accept_key;
use tungstenite::protocol::Role;
use tungstenite::{Message, WebSocket};

use super::ApiResponse;
use crate::error::ApiError;

pub const WS_PATH: &str = "/ws";

/// Sent back for every text or binary frame.
pub const WS_REPLY: &str = "Hello from the websocket!";

/// Sessions get their own thread: the upgraded tiny_http stream only blocks.
pub(super) fn upgrade(request: Request) {
    let key = request
        .headers()
        .iter()
        .find(|header| header.field.equiv("Sec-WebSocket-Key"))
        .map(|header| header.value.as_str().to_string());
    let Some(key) = key else {
        let response = ApiResponse::error(&ApiError::invalid("Missing Sec-WebSocket-Key header"));
        let _ = request.respond(response.into_response());
        return;
    };

    let mut response = Response::empty(StatusCode(101));
    for (name, value) in [
        ("Upgrade", "websocket".to_string()),
        ("Connection", "Upgrade".to_string()),
        ("Sec-WebSocket-Accept", derive_accept_key(key.as_bytes())),
    ] {
        if let Ok(header) = Header::from_bytes(name, value) {
            response.add_header(header);
        }
    }
    let stream = request.upgrade("websocket", response);
    debug!("client upgraded to websocket");

    let spawned = thread::Builder::new()
        .name("nora-ws".into())
        .spawn(move || serve_session(stream));
    if let Err(err) = spawned {
        warn!(error = %err, "failed to start websocket session");
    }
}

/// Answers every data frame with [`WS_REPLY`] until the peer goes away.
pub fn serve_session<S: Read + Write>(stream: S) {
    let mut socket = WebSocket::from_raw_socket(stream, Role::Server, None);
    loop {
        match socket.read() {
            Ok(Message::Text(_) | Message::Binary(_)) => {
                debug!("received websocket message");
                if let Err(err) = socket.send(Message::text(WS_REPLY)) {
                    debug!(error = %err, "websocket send failed");
                    break;
                }
            }
            // Close replies are queued by tungstenite and flushed on the next read.
            Ok(_) => {}
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => break,
            Err(err) => {
                debug!(error = %err, "websocket session ended");
                break;
            }
        }
    }
}
