//! Manual signaling: local parameters are published as one JSON line and
//! the remote peer's document is read back one line at a time.

use std::io::Write;

use log::{trace, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::parameters::codec::PARAMETERS_MAX_LENGTH;
use shared::error::Result;

/// Most bytes buffered for one line: the longest document plus `\r\n`.
const LINE_MAX_LENGTH: usize = PARAMETERS_MAX_LENGTH + 2;

/// Where the local parameter document is published for the remote peer.
pub trait SignalingChannel {
    fn publish(&mut self, document: &str) -> Result<()>;
}

/// Publishes each document as a single line on a writer, usually stdout.
pub struct WriterSignaling<W: Write> {
    writer: W,
}

impl<W: Write> WriterSignaling<W> {
    pub fn new(writer: W) -> Self {
        WriterSignaling { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SignalingChannel for WriterSignaling<W> {
    fn publish(&mut self, document: &str) -> Result<()> {
        writeln!(self.writer, "{document}")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// A line holding only a line terminator asks the session to end.
pub fn is_end_marker(line: &[u8]) -> bool {
    line == b"\n" || line == b"\r\n"
}

/// Reads the next signaling line as raw bytes, terminator included. `None`
/// means the input was closed.
///
/// At most `PARAMETERS_MAX_LENGTH + 2` bytes of a line are kept. The rest of
/// a longer line is skipped and the truncated head is returned, which the
/// codec then rejects as too long.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let n = (&mut *reader)
        .take(LINE_MAX_LENGTH as u64)
        .read_until(b'\n', &mut line)
        .await?;
    if n == 0 {
        return Ok(None);
    }
    if n == LINE_MAX_LENGTH && !line.ends_with(b"\n") {
        let skipped = skip_line(reader).await?;
        warn!("signaling: line longer than {PARAMETERS_MAX_LENGTH} bytes, skipped {skipped} more");
    }
    trace!("signaling: read {n} bytes");
    Ok(Some(line))
}

/// Consumes input up to and including the next `\n` without buffering it.
async fn skip_line<R>(reader: &mut R) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut skipped = 0;
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            return Ok(skipped);
        }
        match buf.iter().position(|&b| b == b'\n') {
            Some(i) => {
                reader.consume(i + 1);
                return Ok(skipped + i + 1);
            }
            None => {
                let len = buf.len();
                reader.consume(len);
                skipped += len;
            }
        }
    }
}
