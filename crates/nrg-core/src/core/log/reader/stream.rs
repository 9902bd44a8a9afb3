use super::{Batch, LogReader, ReadError};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use std::io::{self, BufRead, BufReader, Read};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

enum Chunk {
    Line(String),
    Failed(io::Error),
}

/// Reads engine output delivered through pipes.
///
/// One pump thread per source forwards complete lines into a shared channel.
/// The stream ends once every pump has hit end of file. A fragment left
/// without a trailing newline when its pipe closes is dropped.
pub struct StreamReader {
    receiver: Receiver<Chunk>,
    poll_interval: Duration,
    pending_failure: Option<io::Error>,
    finished: bool,
}

impl StreamReader {
    pub fn spawn(sources: Vec<Box<dyn Read + Send>>, poll_interval: Duration) -> io::Result<Self> {
        let (sender, receiver) = unbounded();
        for (index, source) in sources.into_iter().enumerate() {
            let sender = sender.clone();
            thread::Builder::new()
                .name(format!("nrg-pump-{index}"))
                .spawn(move || pump(source, sender))?;
        }

        Ok(Self {
            receiver,
            poll_interval,
            pending_failure: None,
            finished: false,
        })
    }

    pub fn from_reader(source: impl Read + Send + 'static, poll_interval: Duration) -> io::Result<Self> {
        Self::spawn(vec![Box::new(source)], poll_interval)
    }
}

fn pump(source: Box<dyn Read + Send>, sender: Sender<Chunk>) {
    let mut reader = BufReader::new(source);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let Some(body) = buf.strip_suffix(b"\n") else {
                    debug!("Dropping unterminated fragment of {} byte(s) at end of stream", buf.len());
                    break;
                };
                let body = body.strip_suffix(b"\r").unwrap_or(body);
                let line = String::from_utf8_lossy(body).into_owned();
                if sender.send(Chunk::Line(line)).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = sender.send(Chunk::Failed(e));
                break;
            }
        }
    }
}

impl LogReader for StreamReader {
    fn next_batch(&mut self) -> Result<Batch, ReadError> {
        if let Some(e) = self.pending_failure.take() {
            return Err(ReadError::Stream(e));
        }
        if self.finished {
            return Ok(Batch::EndOfStream);
        }

        let first = match self.receiver.recv_timeout(self.poll_interval) {
            Ok(chunk) => chunk,
            Err(RecvTimeoutError::Timeout) => return Ok(Batch::Lines(Vec::new())),
            Err(RecvTimeoutError::Disconnected) => {
                self.finished = true;
                return Ok(Batch::EndOfStream);
            }
        };

        let mut lines = Vec::new();
        let mut next = Some(first);
        while let Some(chunk) = next {
            match chunk {
                Chunk::Line(line) => lines.push(line),
                Chunk::Failed(e) => {
                    if lines.is_empty() {
                        return Err(ReadError::Stream(e));
                    }
                    warn!("Engine output stream failed after {} line(s): {}", lines.len(), e);
                    self.pending_failure = Some(e);
                    break;
                }
            }
            next = match self.receiver.try_recv() {
                Ok(chunk) => Some(chunk),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => {
                    self.finished = true;
                    None
                }
            };
        }

        Ok(Batch::Lines(lines))
    }

    fn reports_end_of_stream(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const POLL: Duration = Duration::from_millis(50);

    fn drain(reader: &mut StreamReader) -> Vec<String> {
        let mut all = Vec::new();
        loop {
            match reader.next_batch().unwrap() {
                Batch::Lines(lines) => all.extend(lines),
                Batch::EndOfStream => return all,
            }
        }
    }

    struct FailingRead;

    impl Read for FailingRead {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }
    }

    #[test]
    fn delivers_lines_in_order_then_ends() {
        let source = Cursor::new("Generation: 0\r\nbest by energy\nDone.\n");
        let mut reader = StreamReader::from_reader(source, POLL).unwrap();

        assert_eq!(
            drain(&mut reader),
            vec!["Generation: 0", "best by energy", "Done."]
        );
        assert_eq!(reader.next_batch().unwrap(), Batch::EndOfStream);
    }

    #[test]
    fn unterminated_tail_is_dropped() {
        let source = Cursor::new("Generation: 3\n 0 (  1.0");
        let mut reader = StreamReader::from_reader(source, POLL).unwrap();
        assert_eq!(drain(&mut reader), vec!["Generation: 3"]);
    }

    #[test]
    fn merges_multiple_sources_until_all_close() {
        let stdout: Box<dyn Read + Send> = Box::new(Cursor::new("a\nb\n"));
        let stderr: Box<dyn Read + Send> = Box::new(Cursor::new("ERROR: bad\n"));
        let mut reader = StreamReader::spawn(vec![stdout, stderr], POLL).unwrap();

        let mut lines = drain(&mut reader);
        lines.sort();
        assert_eq!(lines, vec!["ERROR: bad", "a", "b"]);
    }

    #[test]
    fn read_failure_is_reported() {
        let mut reader = StreamReader::from_reader(FailingRead, POLL).unwrap();
        let err = loop {
            match reader.next_batch() {
                Ok(Batch::Lines(lines)) => assert!(lines.is_empty()),
                Ok(Batch::EndOfStream) => panic!("failure was swallowed"),
                Err(e) => break e,
            }
        };
        assert!(matches!(err, ReadError::Stream(_)));
    }

    #[test]
    fn quiet_producer_yields_empty_batch() {
        let (_keep_open, rx) = std::sync::mpsc::channel::<()>();
        struct Blocking(std::sync::mpsc::Receiver<()>);
        impl Read for Blocking {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                let _ = self.0.recv();
                Ok(0)
            }
        }

        let mut reader = StreamReader::from_reader(Blocking(rx), Duration::from_millis(10)).unwrap();
        assert_eq!(reader.next_batch().unwrap(), Batch::Lines(Vec::new()));
    }
}
