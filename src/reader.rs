//! Line decoding for the output of a follow process.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Reads newline-terminated lines from a byte stream.
///
/// Bytes are decoded as UTF-8 with invalid sequences replaced, and trailing
/// whitespace (including `\r\n`) is trimmed.
pub(crate) struct LineReader<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            buf: Vec::new(),
        }
    }

    /// Returns the next line, or `None` once the stream has ended.
    ///
    /// A final line without a trailing newline is still returned.
    pub(crate) async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.buf.clear();
        let read = self.inner.read_until(b'\n', &mut self.buf).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(decode_line(&self.buf)))
    }
}

/// Decode raw line bytes, never failing on malformed UTF-8.
pub(crate) fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end().to_string()
}
