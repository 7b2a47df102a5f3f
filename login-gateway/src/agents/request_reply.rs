//! Request-reply helpers for agents answering web handlers
//!
//! Handlers and middleware send a message carrying a [`ResponseChannel`] and
//! await the paired receiver, usually under a timeout. The sender is wrapped
//! so the message stays `Clone`, and it can be taken exactly once.

use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

/// Response channel carried inside agent messages
pub type ResponseChannel<T> = Arc<Mutex<Option<oneshot::Sender<T>>>>;

/// Create a request-reply pair
#[must_use]
pub fn create_request_reply<T>() -> (ResponseChannel<T>, oneshot::Receiver<T>) {
    let (tx, rx) = oneshot::channel();
    (Arc::new(Mutex::new(Some(tx))), rx)
}

/// Send a response through a response channel
///
/// # Errors
///
/// Returns `Err(value)` if the receiver was dropped (the handler timed out or
/// the client disconnected) or the channel was already used
pub async fn send_response<T>(response_tx: ResponseChannel<T>, value: T) -> Result<(), T> {
    let tx = response_tx.lock().await.take();
    match tx {
        Some(tx) => tx.send(value),
        None => Err(value),
    }
}
