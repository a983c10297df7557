//! Live poll-results subscription.
//!
//! One persistent connection keeps the shared [`ResultsMap`] in sync with
//! server-pushed tallies. The feed activates only when both an auth token
//! and a non-empty poll list exist; any change to either tears the
//! connection down and rebuilds it from scratch (no subscription diffing).

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{Error, Result};
use crate::stomp::{self, Frame};
use crate::types::{OptionCounts, Poll, PollId, ResultsMap};

/// Text-frame transport under the STOMP session. Abstracted so the feed
/// logic can be driven without a network.
#[async_trait]
pub trait Transport: Send + 'static {
    async fn send(&mut self, text: String) -> Result<()>;
    /// Next inbound text frame; `None` once the peer has closed.
    async fn recv(&mut self) -> Option<Result<String>>;
    async fn close(&mut self);
}

/// The real transport: a tokio-tungstenite WebSocket client.
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTransport {
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _response) = connect_async(url).await?;
        Ok(Self { stream })
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(Error::from)
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        // Skip control frames; only text carries STOMP.
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(Error::from(e))),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}

/// Owner of the single live connection.
pub struct ResultsFeed {
    ws_url: String,
    conn: Option<Connection>,
}

struct Connection {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ResultsFeed {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            conn: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.conn
            .as_ref()
            .map(|conn| !conn.task.is_finished())
            .unwrap_or(false)
    }

    /// Reconcile the feed with the current token and poll list. The prior
    /// connection (if any) is torn down first; a new one is opened only
    /// when both a token and at least one poll are available. A failed
    /// connect leaves the feed dormant; there is no automatic retry.
    pub async fn sync(&mut self, token: &str, polls: &[Poll], results: Arc<RwLock<ResultsMap>>) {
        self.disconnect().await;

        if token.is_empty() || polls.is_empty() {
            tracing::debug!("results feed dormant (no token or no polls)");
            return;
        }

        match WsTransport::connect(&self.ws_url).await {
            Ok(transport) => {
                let poll_ids = polls.iter().map(|poll| poll.id).collect();
                self.attach(transport, poll_ids, results).await;
            }
            Err(e) => {
                tracing::error!("live results connection failed: {e}");
            }
        }
    }

    /// Drive a subscription over an already-connected transport. Any prior
    /// connection is released first, so at most one is ever live.
    pub async fn attach(
        &mut self,
        transport: impl Transport,
        poll_ids: Vec<PollId>,
        results: Arc<RwLock<ResultsMap>>,
    ) {
        self.disconnect().await;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(feed_loop(transport, poll_ids, results, shutdown_rx));
        self.conn = Some(Connection {
            shutdown: shutdown_tx,
            task,
        });
    }

    /// Release the connection; closing it unsubscribes all topics. Waits
    /// for the background task to finish so no connection can leak past
    /// this call.
    pub async fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            let _ = conn.shutdown.send(());
            let _ = conn.task.await;
        }
    }
}

/// STOMP session: handshake, one SUBSCRIBE per poll, then merge MESSAGE
/// frames until shutdown or the peer goes away.
async fn feed_loop(
    mut transport: impl Transport,
    poll_ids: Vec<PollId>,
    results: Arc<RwLock<ResultsMap>>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    if let Err(e) = transport.send(Frame::connect().encode()).await {
        tracing::error!("live results connect failed: {e}");
        return;
    }

    // Wait for CONNECTED before subscribing.
    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                transport.close().await;
                return;
            }
            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => match Frame::parse(&text) {
                        Ok(frame) if frame.command == "CONNECTED" => break,
                        Ok(frame) => {
                            tracing::error!("live results handshake rejected with {} frame", frame.command);
                            transport.close().await;
                            return;
                        }
                        Err(e) => {
                            tracing::warn!("dropping unparseable frame during handshake: {e}");
                        }
                    },
                    Some(Err(e)) => {
                        tracing::error!("live results connection failed: {e}");
                        return;
                    }
                    None => {
                        tracing::error!("live results channel closed during handshake");
                        return;
                    }
                }
            }
        }
    }

    for id in &poll_ids {
        let frame = Frame::subscribe(&format!("sub-{id}"), &stomp::results_topic(*id));
        if let Err(e) = transport.send(frame.encode()).await {
            tracing::error!("subscribe for poll {id} failed: {e}");
            transport.close().await;
            return;
        }
    }
    tracing::info!("live results feed subscribed to {} polls", poll_ids.len());

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                transport.close().await;
                tracing::debug!("live results feed shut down");
                return;
            }
            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => handle_frame(&text, &results).await,
                    Some(Err(e)) => {
                        tracing::error!("live results receive error: {e}");
                        return;
                    }
                    None => {
                        tracing::info!("live results channel closed by server");
                        return;
                    }
                }
            }
        }
    }
}

/// Merge one inbound frame into the results map. Malformed input is
/// dropped with a log line; the subscription stays up.
async fn handle_frame(text: &str, results: &Arc<RwLock<ResultsMap>>) {
    let frame = match Frame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!("dropping unparseable frame: {e}");
            return;
        }
    };

    match frame.command.as_str() {
        "MESSAGE" => {
            let Some(destination) = frame.header("destination") else {
                tracing::warn!("dropping MESSAGE without destination");
                return;
            };
            let Some(poll_id) = stomp::poll_id_from_topic(destination) else {
                tracing::warn!("dropping MESSAGE for foreign destination {destination}");
                return;
            };
            match serde_json::from_str::<OptionCounts>(&frame.body) {
                Ok(counts) => {
                    // Wholesale replacement: the entry always equals the
                    // most recent message for this poll.
                    results.write().await.insert(poll_id, counts);
                }
                Err(e) => {
                    tracing::warn!("dropping malformed results body for poll {poll_id}: {e}");
                }
            }
        }
        "ERROR" => {
            tracing::error!("broker error frame: {}", frame.body);
        }
        other => {
            tracing::debug!("ignoring {other} frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct MockTransport {
        incoming: mpsc::UnboundedReceiver<String>,
        sent: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    struct MockHandles {
        incoming: mpsc::UnboundedSender<String>,
        sent: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    fn mock_transport() -> (MockTransport, MockHandles) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = MockTransport {
            incoming: rx,
            sent: sent.clone(),
            closed: closed.clone(),
        };
        let handles = MockHandles {
            incoming: tx,
            sent,
            closed,
        };
        (transport, handles)
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, text: String) -> Result<()> {
            self.sent.lock().unwrap().push(text);
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<String>> {
            self.incoming.recv().await.map(Ok)
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn connected() -> String {
        Frame::new("CONNECTED").with_header("version", "1.2").encode()
    }

    fn message(poll_id: PollId, body: &str) -> String {
        let mut frame = Frame::new("MESSAGE")
            .with_header("destination", &stomp::results_topic(poll_id))
            .with_header("subscription", &format!("sub-{poll_id}"));
        frame.body = body.to_string();
        frame.encode()
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..400 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not met within 2s");
    }

    async fn wait_for_entry(
        results: &Arc<RwLock<ResultsMap>>,
        poll_id: PollId,
        expected: &OptionCounts,
    ) {
        for _ in 0..400 {
            if results.read().await.get(&poll_id) == Some(expected) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("results entry for poll {poll_id} never matched {expected:?}");
    }

    #[tokio::test]
    async fn test_handshake_subscribes_every_poll() {
        let (transport, handles) = mock_transport();
        handles.incoming.send(connected()).unwrap();

        let results = Arc::new(RwLock::new(HashMap::new()));
        let mut feed = ResultsFeed::new("ws://unused");
        feed.attach(transport, vec![1, 2], results).await;

        wait_until(|| handles.sent.lock().unwrap().len() == 3).await;
        let sent = handles.sent.lock().unwrap().clone();
        assert!(sent[0].starts_with("CONNECT\n"));
        assert!(sent[1].contains("destination:/topic/results/1"));
        assert!(sent[2].contains("destination:/topic/results/2"));

        feed.disconnect().await;
        assert!(handles.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_message_replaces_entry_wholesale() {
        let (transport, handles) = mock_transport();
        handles.incoming.send(connected()).unwrap();

        let results = Arc::new(RwLock::new(HashMap::new()));
        let mut feed = ResultsFeed::new("ws://unused");
        feed.attach(transport, vec![1], results.clone()).await;

        handles
            .incoming
            .send(message(1, r#"{"Red":3,"Blue":1}"#))
            .unwrap();
        let expected = OptionCounts::from([("Red".to_string(), 3), ("Blue".to_string(), 1)]);
        wait_for_entry(&results, 1, &expected).await;

        // A later message replaces the whole entry; "Blue" must vanish,
        // not survive a merge.
        handles.incoming.send(message(1, r#"{"Red":5}"#)).unwrap();
        let expected = OptionCounts::from([("Red".to_string(), 5)]);
        wait_for_entry(&results, 1, &expected).await;

        feed.disconnect().await;
    }

    #[tokio::test]
    async fn test_malformed_body_dropped_feed_stays_up() {
        let (transport, handles) = mock_transport();
        handles.incoming.send(connected()).unwrap();

        let results = Arc::new(RwLock::new(HashMap::new()));
        let mut feed = ResultsFeed::new("ws://unused");
        feed.attach(transport, vec![1], results.clone()).await;

        handles.incoming.send(message(1, "not json")).unwrap();
        handles
            .incoming
            .send("complete garbage, not a frame".to_string())
            .unwrap();
        handles.incoming.send(message(1, r#"{"Red":2}"#)).unwrap();

        let expected = OptionCounts::from([("Red".to_string(), 2)]);
        wait_for_entry(&results, 1, &expected).await;
        assert!(feed.is_active());

        feed.disconnect().await;
    }

    #[tokio::test]
    async fn test_foreign_destination_ignored() {
        let (transport, handles) = mock_transport();
        handles.incoming.send(connected()).unwrap();

        let results = Arc::new(RwLock::new(HashMap::new()));
        let mut feed = ResultsFeed::new("ws://unused");
        feed.attach(transport, vec![1], results.clone()).await;

        let mut frame = Frame::new("MESSAGE").with_header("destination", "/queue/other");
        frame.body = r#"{"Red":9}"#.to_string();
        handles.incoming.send(frame.encode()).unwrap();
        handles.incoming.send(message(1, r#"{"Red":1}"#)).unwrap();

        let expected = OptionCounts::from([("Red".to_string(), 1)]);
        wait_for_entry(&results, 1, &expected).await;
        assert_eq!(results.read().await.len(), 1);

        feed.disconnect().await;
    }

    #[tokio::test]
    async fn test_at_most_one_connection() {
        let (first, first_handles) = mock_transport();
        first_handles.incoming.send(connected()).unwrap();
        let (second, second_handles) = mock_transport();
        second_handles.incoming.send(connected()).unwrap();

        let results = Arc::new(RwLock::new(HashMap::new()));
        let mut feed = ResultsFeed::new("ws://unused");

        feed.attach(first, vec![1], results.clone()).await;
        feed.attach(second, vec![1, 2], results).await;

        // attach awaits the old task, so the first transport is closed by
        // the time the second is live.
        assert!(first_handles.closed.load(Ordering::SeqCst));
        assert!(!second_handles.closed.load(Ordering::SeqCst));

        wait_until(|| second_handles.sent.lock().unwrap().len() == 3).await;
        feed.disconnect().await;
    }

    #[tokio::test]
    async fn test_handshake_error_frame_ends_feed() {
        let (transport, handles) = mock_transport();
        let mut error = Frame::new("ERROR");
        error.body = "no".to_string();
        handles.incoming.send(error.encode()).unwrap();

        let results = Arc::new(RwLock::new(HashMap::new()));
        let mut feed = ResultsFeed::new("ws://unused");
        feed.attach(transport, vec![1], results).await;

        wait_until(|| handles.closed.load(Ordering::SeqCst)).await;
        wait_until(|| !feed.is_active()).await;
    }

    #[tokio::test]
    async fn test_sync_dormant_without_token_or_polls() {
        let results = Arc::new(RwLock::new(HashMap::new()));
        let mut feed = ResultsFeed::new("ws://127.0.0.1:9");

        let poll: Poll = serde_json::from_str(
            r#"{"id":1,"question":"Q","options":{},"active":true,"expiresAt":"2026-09-01T12:00:00Z"}"#,
        )
        .unwrap();

        feed.sync("", &[poll.clone()], results.clone()).await;
        assert!(!feed.is_active());

        feed.sync("tok", &[], results).await;
        assert!(!feed.is_active());
    }

    #[tokio::test]
    async fn test_sync_connect_failure_stays_dormant() {
        // A port nothing listens on: connect fails, feed must not retry.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let results = Arc::new(RwLock::new(HashMap::new()));
        let mut feed = ResultsFeed::new(format!("ws://127.0.0.1:{port}"));

        let poll: Poll = serde_json::from_str(
            r#"{"id":1,"question":"Q","options":{},"active":true,"expiresAt":"2026-09-01T12:00:00Z"}"#,
        )
        .unwrap();

        feed.sync("tok", &[poll], results).await;
        assert!(!feed.is_active());
    }
}
