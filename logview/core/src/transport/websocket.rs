//! WebSocket Transport
//!
//! Opens the duplex log stream with `tokio-tungstenite`. Each connection is
//! a spawned task that connects, forwards every server message as a
//! [`TransportEventKind::Frame`], and ends on close, EOF, error or a
//! shutdown signal from [`WebSocketConnection::close`].

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;

use crate::config::LogviewConfig;
use crate::target::StreamQuery;

use super::{EventSender, Generation, LogConnection, LogTransport, TransportError, TransportEvent};

/// How long to wait for our close frame to go out during teardown
const CLOSE_GRACE: Duration = Duration::from_millis(500);

/// Transport for the streaming endpoint
#[derive(Clone, Debug)]
pub struct WebSocketTransport {
    endpoint: String,
    connect_timeout: Duration,
}

impl WebSocketTransport {
    /// Create a transport for `endpoint` (a `ws://` or `wss://` URL)
    #[must_use]
    pub fn new(endpoint: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout,
        }
    }

    /// Create a transport from loaded configuration
    #[must_use]
    pub fn from_config(config: &LogviewConfig) -> Self {
        Self::new(config.endpoint.clone(), config.connect_timeout)
    }

    /// The configured endpoint
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl LogTransport for WebSocketTransport {
    fn open(
        &self,
        query: &StreamQuery,
        generation: Generation,
        events: EventSender,
    ) -> Box<dyn LogConnection> {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let connection = Box::new(WebSocketConnection {
            generation,
            shutdown: Some(shutdown_tx),
        });

        let url = match query.to_url(&self.endpoint) {
            Ok(url) => url,
            Err(e) => {
                fail(&events, generation, &e);
                return connection;
            }
        };

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            fail(
                &events,
                generation,
                &TransportError::Connect("no async runtime available".to_string()),
            );
            return connection;
        };

        tracing::debug!(%generation, url = %url, "opening log stream");
        handle.spawn(run_stream(
            url.to_string(),
            self.connect_timeout,
            generation,
            events,
            shutdown_rx,
        ));

        connection
    }
}

fn fail(events: &EventSender, generation: Generation, error: &TransportError) {
    tracing::warn!(%generation, error = %error, "log stream failed");
    let _ = events.send(TransportEvent::error(generation, error.to_string()));
    let _ = events.send(TransportEvent::closed(generation));
}

async fn run_stream(
    url: String,
    connect_timeout: Duration,
    generation: Generation,
    events: EventSender,
    mut shutdown: oneshot::Receiver<()>,
) {
    let connect = tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(url.as_str()));

    let stream = tokio::select! {
        _ = &mut shutdown => {
            tracing::debug!(%generation, "stream closed while connecting");
            return;
        }
        result = connect => match result {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(e)) => {
                fail(&events, generation, &TransportError::Connect(e.to_string()));
                return;
            }
            Err(_) => {
                fail(&events, generation, &TransportError::ConnectTimeout(connect_timeout));
                return;
            }
        }
    };

    if events.send(TransportEvent::opened(generation)).is_err() {
        return;
    }

    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                let _ = tokio::time::timeout(CLOSE_GRACE, sink.send(Message::Close(None))).await;
                tracing::debug!(%generation, "log stream closed by client");
                return;
            }
            message = source.next() => {
                let event = match message {
                    Some(Ok(Message::Text(text))) => Some(TransportEvent::frame(generation, text)),
                    Some(Ok(Message::Binary(data))) => Some(TransportEvent::frame(
                        generation,
                        String::from_utf8_lossy(&data).into_owned(),
                    )),
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(%generation, "log stream closed by server");
                        let _ = events.send(TransportEvent::closed(generation));
                        return;
                    }
                    // ping/pong are answered by tungstenite
                    Some(Ok(_)) => None,
                    Some(Err(e)) => {
                        fail(&events, generation, &TransportError::Protocol(e.to_string()));
                        return;
                    }
                };
                if let Some(event) = event {
                    if events.send(event).is_err() {
                        return;
                    }
                }
            }
        }
    }
}

/// Handle to a running WebSocket stream task
pub struct WebSocketConnection {
    generation: Generation,
    shutdown: Option<oneshot::Sender<()>>,
}

impl LogConnection for WebSocketConnection {
    fn close(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }

    fn generation(&self) -> Generation {
        self.generation
    }
}

impl Drop for WebSocketConnection {
    fn drop(&mut self) {
        self.close();
    }
}
