//! Command input sources

use futures::future::{BoxFuture, FutureExt};
use tokio::{
    io::{self, AsyncBufRead, AsyncBufReadExt, BufReader, Stdin},
    sync::mpsc,
};

use crate::error::InputError;

/// Yields one raw command line at a time.
///
/// The returned future must be cancel-safe: the command loop drops it when a
/// shutdown is requested.
pub trait CommandSource: Send + 'static {
    fn next_command(&mut self) -> BoxFuture<'_, Result<String, InputError>>;
}

/// Reads newline-terminated commands from a byte stream.
///
/// Lines are decoded lossily, so bytes that are not valid UTF-8 come through
/// as an unrecognized command instead of ending the input.
pub struct LineSource<R> {
    reader: R,
    /// Bytes of the current line read so far; survives a dropped read
    pending: Vec<u8>,
}

/// Commands typed on the terminal
pub type StdinSource = LineSource<BufReader<Stdin>>;

impl<R> LineSource<R> {
    /// Wrap an already buffered reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::new(),
        }
    }
}

impl StdinSource {
    /// Read commands from standard input
    pub fn stdin() -> Self {
        Self::new(BufReader::new(io::stdin()))
    }
}

impl<R> CommandSource for LineSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    fn next_command(&mut self) -> BoxFuture<'_, Result<String, InputError>> {
        async move {
            let read = match self.reader.read_until(b'\n', &mut self.pending).await {
                Ok(read) => read,
                Err(e) => return Err(InputError::from(e)),
            };
            if read == 0 && self.pending.is_empty() {
                return Err(InputError::EndOfInput);
            }

            let line = String::from_utf8_lossy(&self.pending)
                .trim_end_matches(['\n', '\r'])
                .to_string();
            self.pending.clear();
            Ok(line)
        }
        .boxed()
    }
}

/// Commands fed through a channel; closing the sender ends the input
pub struct ChannelSource {
    rx: mpsc::Receiver<String>,
}

impl ChannelSource {
    pub fn new(capacity: usize) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self { rx })
    }
}

impl CommandSource for ChannelSource {
    fn next_command(&mut self) -> BoxFuture<'_, Result<String, InputError>> {
        async move { self.rx.recv().await.ok_or(InputError::EndOfInput) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_source_ends_when_sender_dropped() {
        let (tx, mut source) = ChannelSource::new(4);
        tx.send("pause".to_string()).await.unwrap();
        drop(tx);

        assert_eq!(source.next_command().await.unwrap(), "pause");
        assert!(matches!(source.next_command().await, Err(InputError::EndOfInput)));
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_read_lossily() {
        let mut source = LineSource::new(&b"start\n\xff\xfe\r\nstatus"[..]);

        assert_eq!(source.next_command().await.unwrap(), "start");
        assert_eq!(source.next_command().await.unwrap(), "\u{FFFD}\u{FFFD}");
        assert_eq!(source.next_command().await.unwrap(), "status");
        assert!(matches!(source.next_command().await, Err(InputError::EndOfInput)));
    }
}
