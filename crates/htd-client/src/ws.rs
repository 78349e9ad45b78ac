//! WebSocket transport
//!
//! Each socket is a task that owns the stream. The handle returned to the
//! connection manager only queues frames for that task; everything the
//! task sees comes back to the event loop as a [`SocketEvent`].

use futures::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use htd_core::error::ConnectionError;
use htd_core::ConnectionId;

use crate::event::{Event, EventSender, SocketEvent, SocketEventKind};
use crate::transport::{Socket, Transport};

#[derive(Debug)]
enum Outgoing {
    Text(String),
    Close,
}

/// Opens terminal sockets with tokio-tungstenite
pub struct WsTransport {
    events: EventSender,
}

impl WsTransport {
    /// Socket events will be posted to `events`
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }
}

impl Transport for WsTransport {
    fn open(&mut self, id: ConnectionId, url: &Url) -> Result<Box<dyn Socket>, ConnectionError> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(id, url.clone(), rx, self.events.clone()));
        Ok(Box::new(WsSocket { tx, closed: false }))
    }
}

struct WsSocket {
    tx: mpsc::UnboundedSender<Outgoing>,
    closed: bool,
}

impl Socket for WsSocket {
    fn send(&mut self, text: String) -> Result<(), ConnectionError> {
        if self.closed {
            return Err(ConnectionError::Closed);
        }
        self.tx
            .send(Outgoing::Text(text))
            .map_err(|_| ConnectionError::Closed)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let _ = self.tx.send(Outgoing::Close);
        }
    }
}

fn post(events: &EventSender, id: ConnectionId, kind: SocketEventKind) {
    let _ = events.send(Event::Socket(SocketEvent::new(id, kind)));
}

async fn run_socket(
    id: ConnectionId,
    url: Url,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
    events: EventSender,
) {
    // Redact the token from logs
    let mut shown = url.clone();
    shown.set_query(None);
    tracing::debug!(connection = %id, url = %shown, "Opening socket");

    let connected = tokio::select! {
        result = connect_async(url.as_str()) => result,
        _ = wait_for_close(&mut outgoing) => {
            tracing::debug!(connection = %id, "Socket closed before the handshake finished");
            post(&events, id, SocketEventKind::Closed);
            return;
        }
    };

    let stream = match connected {
        Ok((stream, _response)) => stream,
        Err(e) => {
            tracing::warn!(connection = %id, url = %shown, "Socket handshake failed: {}", e);
            let kind = if is_unauthorized(&e) {
                SocketEventKind::Unauthorized
            } else {
                SocketEventKind::Error(e.to_string())
            };
            post(&events, id, kind);
            post(&events, id, SocketEventKind::Closed);
            return;
        }
    };

    post(&events, id, SocketEventKind::Opened);
    let (mut writer, mut reader) = stream.split();

    loop {
        tokio::select! {
            frame = outgoing.recv() => match frame {
                Some(Outgoing::Text(text)) => {
                    if let Err(e) = writer.send(Message::Text(text.into())).await {
                        post(&events, id, SocketEventKind::Error(e.to_string()));
                        break;
                    }
                }
                Some(Outgoing::Close) | None => {
                    let _ = writer.send(Message::Close(None)).await;
                    break;
                }
            },
            message = reader.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    post(&events, id, SocketEventKind::Message(text.to_string()));
                }
                Some(Ok(Message::Binary(data))) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    post(&events, id, SocketEventKind::Message(text));
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(connection = %id, "Socket read failed: {}", e);
                    post(&events, id, SocketEventKind::Error(e.to_string()));
                    break;
                }
            },
        }
    }

    post(&events, id, SocketEventKind::Closed);
}

fn is_unauthorized(error: &WsError) -> bool {
    matches!(error, WsError::Http(response) if response.status().as_u16() == 401)
}

async fn wait_for_close(outgoing: &mut mpsc::UnboundedReceiver<Outgoing>) {
    loop {
        match outgoing.recv().await {
            Some(Outgoing::Close) | None => return,
            // Nothing is sent before the open event; drop it
            Some(Outgoing::Text(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::channel;

    #[tokio::test]
    async fn test_refused_handshake_reports_error_then_close() {
        let (tx, mut rx) = channel();
        let mut transport = WsTransport::new(tx);
        let url = Url::parse("ws://127.0.0.1:9/ws/terminal/m1").unwrap();

        let _socket = transport.open(ConnectionId(7), &url).unwrap();

        let Some(Event::Socket(first)) = rx.recv().await else {
            panic!("expected a socket event");
        };
        assert_eq!(first.connection, ConnectionId(7));
        assert!(matches!(first.kind, SocketEventKind::Error(_)));

        let Some(Event::Socket(second)) = rx.recv().await else {
            panic!("expected a socket event");
        };
        assert_eq!(second.kind, SocketEventKind::Closed);
    }

    #[tokio::test]
    async fn test_rejected_token_reports_unauthorized() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream
                .write_all(b"HTTP/1.1 401 Unauthorized\r\nContent-Length: 0\r\n\r\n")
                .await
                .unwrap();
        });

        let (tx, mut rx) = channel();
        let mut transport = WsTransport::new(tx);
        let url = Url::parse(&format!("ws://127.0.0.1:{}/ws/terminal/m1?token=bad", port)).unwrap();
        let _socket = transport.open(ConnectionId(3), &url).unwrap();

        let Some(Event::Socket(first)) = rx.recv().await else {
            panic!("expected a socket event");
        };
        assert_eq!(first, SocketEvent::new(ConnectionId(3), SocketEventKind::Unauthorized));

        let Some(Event::Socket(second)) = rx.recv().await else {
            panic!("expected a socket event");
        };
        assert_eq!(second.kind, SocketEventKind::Closed);
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (tx, _rx) = channel();
        let mut transport = WsTransport::new(tx);
        let url = Url::parse("ws://127.0.0.1:9/").unwrap();

        let mut socket = transport.open(ConnectionId(1), &url).unwrap();
        socket.close();
        socket.close();
        assert!(matches!(
            socket.send("x".to_string()),
            Err(ConnectionError::Closed)
        ));
    }
}
