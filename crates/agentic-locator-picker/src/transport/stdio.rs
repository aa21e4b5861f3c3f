//! Stdio transport — reads commands from stdin, writes events to stdout.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::protocol::CommandHandler;
use crate::types::{Event, PickerError, PickerResult};

use super::framing;

/// Newline-delimited JSON transport.
pub struct StdioTransport {
    handler: CommandHandler,
    events: mpsc::UnboundedReceiver<Event>,
}

impl StdioTransport {
    /// `events` must be the receiving end of the handler's event sink.
    pub fn new(handler: CommandHandler, events: mpsc::UnboundedReceiver<Event>) -> Self {
        Self { handler, events }
    }

    /// Run the transport loop on stdin and stdout.
    pub async fn run(self) -> PickerResult<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.run_with(stdin, tokio::io::stdout()).await?;
        Ok(())
    }

    /// Run the transport loop on arbitrary streams and return the writer.
    ///
    /// On end of input the loop stops reading; searches still in flight run
    /// to completion and their events are written before this returns.
    pub async fn run_with<R, W>(self, mut reader: R, writer: W) -> PickerResult<W>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let Self { handler, events } = self;
        let writer_task = tokio::spawn(write_events(events, writer));
        let mut line = String::new();

        tracing::info!("Stdio transport started");

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await.map_err(PickerError::Io)?;

            if bytes_read == 0 {
                tracing::info!("EOF on input, shutting down");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            handler.handle_line(trimmed).await;
        }

        drop(handler);
        writer_task
            .await
            .map_err(|e| PickerError::Transport(e.to_string()))?
    }
}

/// Drain the event channel into `out` until every sender is gone.
async fn write_events<W>(mut events: mpsc::UnboundedReceiver<Event>, mut out: W) -> PickerResult<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(event) = events.recv().await {
        let framed = framing::frame_event(&event)?;
        out.write_all(framed.as_bytes()).await.map_err(PickerError::Io)?;
        out.flush().await.map_err(PickerError::Io)?;
    }
    Ok(out)
}
