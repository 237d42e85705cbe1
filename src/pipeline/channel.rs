use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub type Sender<T> = mpsc::Sender<T>;
pub type Receiver<T> = mpsc::Receiver<T>;

/// Create a bounded channel with the specified buffer size
pub fn create_channel<T>(buffer_size: usize) -> (Sender<T>, Receiver<T>) {
    mpsc::channel(buffer_size)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// The receiving stage is gone
    Closed,
    Cancelled,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RecvOutcome<T> {
    Item(T),
    /// Every sender has been dropped and the buffer is drained
    Closed,
    Cancelled,
}

/// Send, or give up as soon as the token is cancelled.
///
/// Cancellation wins over a send that could complete at the same time.
pub async fn send_or_cancel<T>(output: &Sender<T>, item: T, ct: &CancellationToken) -> SendOutcome {
    tokio::select! {
        biased;
        _ = ct.cancelled() => SendOutcome::Cancelled,
        result = output.send(item) => match result {
            Ok(()) => SendOutcome::Sent,
            Err(_) => SendOutcome::Closed,
        },
    }
}

/// Receive, or give up as soon as the token is cancelled.
pub async fn recv_or_cancel<T>(input: &mut Receiver<T>, ct: &CancellationToken) -> RecvOutcome<T> {
    tokio::select! {
        biased;
        _ = ct.cancelled() => RecvOutcome::Cancelled,
        item = input.recv() => match item {
            Some(item) => RecvOutcome::Item(item),
            None => RecvOutcome::Closed,
        },
    }
}
