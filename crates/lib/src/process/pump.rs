//! Stream pumps.
//!
//! A pump drains one child stream line by line into a sink until end-of-file.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{trace, warn};

use super::sink::OutputSink;
use super::types::StreamKind;

/// Drain `reader` into `sink`, returning the number of lines delivered.
///
/// Lines end at `\n`; a preceding `\r` is dropped too. A final line without a
/// terminator is still delivered. Bytes that are not valid UTF-8 are replaced.
/// End-of-file is the normal exit; any other read failure is returned.
pub async fn pump<R>(reader: R, sink: Arc<dyn OutputSink>, stream: StreamKind) -> io::Result<u64>
where
  R: AsyncRead + Unpin,
{
  let mut reader = BufReader::new(reader);
  let mut buf = Vec::new();
  let mut lines = 0u64;

  loop {
    buf.clear();
    if reader.read_until(b'\n', &mut buf).await? == 0 {
      break;
    }

    let line = String::from_utf8_lossy(strip_line_ending(&buf));
    deliver(sink.as_ref(), &line, stream);
    lines += 1;
  }

  trace!(%stream, lines, "stream reached end of file");
  Ok(lines)
}

fn strip_line_ending(buf: &[u8]) -> &[u8] {
  let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
  buf.strip_suffix(b"\r").unwrap_or(buf)
}

/// Hand one line to the sink, surviving a panicking sink.
fn deliver(sink: &dyn OutputSink, line: &str, stream: StreamKind) {
  if panic::catch_unwind(AssertUnwindSafe(|| sink.consume_line(line))).is_err() {
    warn!(%stream, "output sink panicked, line dropped");
  }
}
