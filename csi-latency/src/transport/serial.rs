//! Serial line source implementation

use crate::clock::now_epoch_us;
use crate::core::source::{FaultKind, LineSource, Poll};
use crate::core::types::RawLine;
use crate::error::Result;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Port-level read timeout; bounds how long a Ctrl-C goes unnoticed
const PORT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Longest line kept before the partial buffer is discarded
const MAX_LINE_LEN: usize = 64 * 1024;

/// Reassembles newline-terminated lines from arbitrary read chunks
#[derive(Debug, Default)]
struct LineSplitter {
    partial: Vec<u8>,
    ready: VecDeque<(Vec<u8>, i64)>,
    /// Dropping the tail of an overlong line until its newline
    discarding: bool,
}

impl LineSplitter {
    /// Append a chunk; lines completed by it are stamped with `arrival_us`
    fn push(&mut self, bytes: &[u8], arrival_us: i64) {
        for &b in bytes {
            if b == b'\n' {
                if self.discarding {
                    self.discarding = false;
                    continue;
                }
                let mut line = std::mem::take(&mut self.partial);
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                self.ready.push_back((line, arrival_us));
            } else if self.discarding {
                continue;
            } else if self.partial.len() < MAX_LINE_LEN {
                self.partial.push(b);
            } else {
                log::warn!("Line exceeds {} bytes without newline, discarding", MAX_LINE_LEN);
                self.partial.clear();
                self.discarding = true;
            }
        }
    }

    fn pop(&mut self) -> Option<(Vec<u8>, i64)> {
        self.ready.pop_front()
    }
}

/// Polling loop over any byte reader
///
/// Turns read chunks into lines and I/O errors into faults. Timeouts reported
/// by the reader are retried until `read_timeout` has elapsed.
struct LineReader<R> {
    inner: R,
    splitter: LineSplitter,
    read_timeout: Duration,
    running: Arc<AtomicBool>,
}

impl<R: Read> LineReader<R> {
    fn new(inner: R, read_timeout: Duration, running: Arc<AtomicBool>) -> Self {
        Self {
            inner,
            splitter: LineSplitter::default(),
            read_timeout,
            running,
        }
    }

    fn decode(bytes: Vec<u8>, arrival_us: i64) -> Poll {
        match String::from_utf8(bytes) {
            Ok(text) => Poll::Line(RawLine::new(text, arrival_us)),
            Err(e) => {
                log::debug!("Invalid UTF-8 at byte {}", e.utf8_error().valid_up_to());
                Poll::Fault(FaultKind::DecodeInvalid)
            }
        }
    }

    fn next_line(&mut self) -> Poll {
        let deadline = Instant::now() + self.read_timeout;
        let mut buffer = [0u8; 1024];

        loop {
            if !self.running.load(Ordering::Relaxed) {
                return Poll::Fault(FaultKind::Interrupted);
            }

            if let Some((bytes, arrival_us)) = self.splitter.pop() {
                return Self::decode(bytes, arrival_us);
            }

            match self.inner.read(&mut buffer) {
                Ok(0) => {}
                Ok(n) => {
                    let arrival_us = now_epoch_us();
                    self.splitter.push(&buffer[..n], arrival_us);
                    continue;
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) => {}
                Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                    log::error!("Permission denied reading serial port: {}", e);
                    return Poll::Fault(FaultKind::PermissionDenied);
                }
                Err(e) => {
                    log::error!("Serial read error: {}", e);
                    return Poll::Fault(FaultKind::Disconnected);
                }
            }

            if Instant::now() >= deadline {
                return Poll::Empty;
            }
        }
    }
}

/// Reads newline-terminated lines from a UART
///
/// Each completed line is stamped with the host epoch time of the read that
/// delivered its terminating newline.
pub struct SerialLineSource {
    reader: LineReader<Box<dyn SerialPort>>,
}

impl SerialLineSource {
    /// Open a serial port
    ///
    /// # Arguments
    /// * `path` - Serial port path (e.g., "/dev/ttyUSB0")
    /// * `baud_rate` - Baud rate (e.g., 921600)
    /// * `read_timeout` - How long [`LineSource::next_line`] waits before reporting an empty poll
    /// * `running` - Cleared by the Ctrl-C handler to request shutdown
    pub fn open(
        path: &str,
        baud_rate: u32,
        read_timeout: Duration,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(PORT_POLL_INTERVAL)
            .open()?;

        // Drop whatever the device printed before we attached
        port.clear(ClearBuffer::Input)?;

        log::info!("Opened serial port: {} at {} baud", path, baud_rate);

        Ok(Self::from_port(port, read_timeout, running))
    }

    /// Wrap an already-open port
    pub fn from_port(
        port: Box<dyn SerialPort>,
        read_timeout: Duration,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            reader: LineReader::new(port, read_timeout, running),
        }
    }
}

impl LineSource for SerialLineSource {
    fn next_line(&mut self) -> Poll {
        self.reader.next_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Byte reader replaying scripted read results, then timing out forever
    struct ScriptedPort {
        reads: VecDeque<io::Result<Vec<u8>>>,
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                Some(Ok(bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::from(ErrorKind::TimedOut)),
            }
        }
    }

    fn scripted(
        reads: Vec<io::Result<Vec<u8>>>,
        read_timeout: Duration,
    ) -> (LineReader<ScriptedPort>, Arc<AtomicBool>) {
        let running = Arc::new(AtomicBool::new(true));
        let port = ScriptedPort {
            reads: reads.into(),
        };
        (
            LineReader::new(port, read_timeout, Arc::clone(&running)),
            running,
        )
    }

    fn err(kind: ErrorKind) -> io::Result<Vec<u8>> {
        Err(io::Error::from(kind))
    }

    #[test]
    fn test_lines_split_across_chunks() {
        let mut splitter = LineSplitter::default();
        splitter.push(b"CSI_DA", 100);
        assert!(splitter.pop().is_none());

        splitter.push(b"TA,1\r\ntype,", 200);
        assert_eq!(splitter.pop(), Some((b"CSI_DATA,1".to_vec(), 200)));
        assert!(splitter.pop().is_none());

        splitter.push(b"esp_epoch_us\n\n", 300);
        assert_eq!(splitter.pop(), Some((b"type,esp_epoch_us".to_vec(), 300)));
        assert_eq!(splitter.pop(), Some((Vec::new(), 300)));
    }

    #[test]
    fn test_overlong_line_dropped_up_to_newline() {
        let mut splitter = LineSplitter::default();
        splitter.push(&vec![b'x'; MAX_LINE_LEN + 10], 1);
        splitter.push(b"yyy\nCSI_DATA,2\n", 2);

        assert_eq!(splitter.pop(), Some((b"CSI_DATA,2".to_vec(), 2)));
        assert!(splitter.pop().is_none());
    }

    #[test]
    fn test_line_is_stamped_on_arrival() {
        let before = now_epoch_us();
        let (mut reader, _) = scripted(vec![Ok(b"CSI_DATA,1\n".to_vec())], Duration::ZERO);

        match reader.next_line() {
            Poll::Line(line) => {
                assert_eq!(line.text, "CSI_DATA,1");
                assert!(line.host_arrival_us >= before);
            }
            other => panic!("expected a line, got {:?}", other),
        }
    }

    #[test]
    fn test_transient_errors_keep_polling() {
        let (mut reader, _) = scripted(
            vec![
                err(ErrorKind::TimedOut),
                err(ErrorKind::WouldBlock),
                err(ErrorKind::Interrupted),
                Ok(b"ok\n".to_vec()),
            ],
            Duration::from_secs(5),
        );

        assert!(matches!(reader.next_line(), Poll::Line(line) if line.text == "ok"));
    }

    #[test]
    fn test_silence_until_deadline_is_empty_poll() {
        let (mut reader, _) = scripted(Vec::new(), Duration::from_millis(20));
        assert_eq!(reader.next_line(), Poll::Empty);
    }

    #[test]
    fn test_permission_denied_fault() {
        let (mut reader, _) = scripted(vec![err(ErrorKind::PermissionDenied)], Duration::ZERO);
        assert_eq!(reader.next_line(), Poll::Fault(FaultKind::PermissionDenied));
    }

    #[test]
    fn test_other_io_errors_are_disconnects() {
        for kind in [ErrorKind::BrokenPipe, ErrorKind::NotFound, ErrorKind::Other] {
            let (mut reader, _) = scripted(vec![err(kind)], Duration::ZERO);
            assert_eq!(reader.next_line(), Poll::Fault(FaultKind::Disconnected));
        }
    }

    #[test]
    fn test_cleared_flag_interrupts_before_buffered_lines() {
        let (mut reader, running) = scripted(vec![Ok(b"a\nb\n".to_vec())], Duration::ZERO);
        assert!(matches!(reader.next_line(), Poll::Line(line) if line.text == "a"));

        running.store(false, Ordering::Relaxed);
        assert_eq!(reader.next_line(), Poll::Fault(FaultKind::Interrupted));
    }

    #[test]
    fn test_invalid_utf8_is_decode_fault() {
        let (mut reader, _) = scripted(
            vec![Ok(vec![0xff, 0xfe, b'a', b'\n']), Ok(b"CSI_DATA\n".to_vec())],
            Duration::ZERO,
        );

        assert_eq!(reader.next_line(), Poll::Fault(FaultKind::DecodeInvalid));
        assert!(matches!(reader.next_line(), Poll::Line(line) if line.text == "CSI_DATA"));
    }
}
