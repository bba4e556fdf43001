//! Splitting of the received byte stream into protocol lines.

use std::io::{self, BufRead, BufReader, Read};

use hexplay::HexViewBuilder;
use log::{log_enabled, trace, Level::Trace};

/// Reads `\n` terminated lines from a serial reader, keeping the bytes of an
/// incomplete line across read timeouts.
pub(crate) struct LineReader<R> {
    inner: BufReader<R>,
    pending: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        LineReader {
            inner: BufReader::new(reader),
            pending: Vec::new(),
        }
    }

    /// Returns the next line with its terminator and any trailing `\r`
    /// stripped, `Ok(None)` at end of stream.
    ///
    /// A serial read timeout surfaces as an `Err` of kind `TimedOut`; the
    /// partially received line is kept and completed by the next call.
    pub(crate) fn next_line(&mut self) -> io::Result<Option<String>> {
        let read = self.inner.read_until(b'\n', &mut self.pending)?;
        if read == 0 && self.pending.is_empty() {
            return Ok(None);
        }

        let bytes = std::mem::take(&mut self.pending);
        if log_enabled!(Trace) {
            let view = HexViewBuilder::new(&bytes)
                .address_offset(0)
                .row_width(16)
                .finish();
            trace!("received {} bytes\n{}", bytes.len(), view);
        }

        let line = String::from_utf8_lossy(&bytes);
        Ok(Some(
            line.trim_end_matches('\n').trim_end_matches('\r').to_owned(),
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out its chunks one per `read`, then times out once before the
    /// next chunk, like a serial port with a short read timeout.
    struct Chunked {
        chunks: Vec<&'static [u8]>,
        timed_out: bool,
    }

    impl Read for Chunked {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.chunks.is_empty() {
                return Ok(0);
            }
            if !self.timed_out {
                self.timed_out = true;
                return Err(io::Error::new(io::ErrorKind::TimedOut, "timed out"));
            }
            self.timed_out = false;
            let chunk = self.chunks.remove(0);
            buf[..chunk.len()].copy_from_slice(chunk);
            Ok(chunk.len())
        }
    }

    #[test]
    fn strips_carriage_returns() {
        let mut reader = LineReader::new(&b"GET name=pad\r\nGET END\r\n"[..]);
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("GET name=pad"));
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("GET END"));
        assert_eq!(reader.next_line().unwrap(), None);
    }

    #[test]
    fn keeps_partial_lines_across_timeouts() {
        let mut reader = LineReader::new(Chunked {
            chunks: vec![b"OUT hk", b"ey1=100 50\r", b"\n"],
            timed_out: false,
        });

        let mut lines = Vec::new();
        let mut timeouts = 0;
        loop {
            match reader.next_line() {
                Ok(Some(line)) => lines.push(line),
                Ok(None) => break,
                Err(e) => {
                    assert_eq!(e.kind(), io::ErrorKind::TimedOut);
                    timeouts += 1;
                }
            }
        }
        assert_eq!(lines, vec!["OUT hkey1=100 50".to_owned()]);
        assert_eq!(timeouts, 3);
    }

    #[test]
    fn unterminated_tail_is_delivered_at_end_of_stream() {
        let mut reader = LineReader::new(&b"save\nGET E"[..]);
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("save"));
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("GET E"));
        assert_eq!(reader.next_line().unwrap(), None);
    }
}
