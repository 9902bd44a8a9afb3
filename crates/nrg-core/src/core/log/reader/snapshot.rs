use super::{Batch, LogReader, LogSource, ReadError, complete_lines, retry_within};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Tails a file that another process appends to by polling private copies.
///
/// Each poll copies the current source to `scratch`, reads the copy in full and
/// returns the complete lines past the per-source offset. Offsets are counted
/// in lines and remembered per path, so switching back to a source that was
/// already read resumes where it stopped.
///
/// A failed copy yields an empty batch and is retried on the next call; the
/// reader only gives up once copies of the same source have kept failing for
/// the whole timeout. A missing update file is not a failure: the engine has
/// simply not written the next one yet.
#[derive(Debug)]
pub struct SnapshotReader {
    initial: PathBuf,
    update: Option<PathBuf>,
    scratch: PathBuf,
    current: LogSource,
    consumed: HashMap<PathBuf, usize>,
    poll_interval: Duration,
    timeout: Duration,
    failing_since: Option<Instant>,
}

impl SnapshotReader {
    pub fn new(
        initial: impl Into<PathBuf>,
        scratch: impl Into<PathBuf>,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            initial: initial.into(),
            update: None,
            scratch: scratch.into(),
            current: LogSource::InitialLog,
            consumed: HashMap::new(),
            poll_interval,
            timeout,
            failing_since: None,
        }
    }

    pub fn with_update_file(mut self, update: impl Into<PathBuf>) -> Self {
        self.update = Some(update.into());
        self
    }

    pub fn current_source(&self) -> LogSource {
        self.current
    }

    pub fn current_path(&self) -> &Path {
        self.path_of(self.current).unwrap_or(&self.initial)
    }

    /// Number of complete lines already delivered from `source`.
    pub fn consumed(&self, source: LogSource) -> usize {
        self.path_of(source)
            .and_then(|path| self.consumed.get(path))
            .copied()
            .unwrap_or(0)
    }

    fn path_of(&self, source: LogSource) -> Option<&Path> {
        match source {
            LogSource::InitialLog => Some(&self.initial),
            LogSource::UpdateFile => self.update.as_deref(),
        }
    }

    fn prepare_scratch(&self) -> Result<(), ReadError> {
        match self.scratch.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|e| ReadError::Scratch {
                    path: self.scratch.clone(),
                    source: e,
                })
            }
            _ => Ok(()),
        }
    }

    fn snapshot(&self, source: &Path) -> io::Result<String> {
        fs::copy(source, &self.scratch)?;
        let bytes = fs::read(&self.scratch)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Waits one poll after a failed copy, or reports the failure once it has
    /// outlasted the timeout.
    fn copy_failed(&mut self, path: PathBuf, err: io::Error) -> Result<Batch, ReadError> {
        let since = *self.failing_since.get_or_insert_with(Instant::now);
        let waited = since.elapsed();
        if waited >= self.timeout {
            self.failing_since = None;
            return Err(ReadError::Timeout {
                path,
                waited,
                source: err,
            });
        }
        trace!("Transient I/O failure on {:?}, retrying: {}", path, err);
        thread::sleep(self.poll_interval);
        Ok(Batch::Lines(Vec::new()))
    }
}

impl LogReader for SnapshotReader {
    fn next_batch(&mut self) -> Result<Batch, ReadError> {
        self.prepare_scratch()?;
        let path = self.current_path().to_path_buf();
        let text = match self.snapshot(&path) {
            Ok(text) => text,
            Err(e)
                if e.kind() == io::ErrorKind::NotFound
                    && self.current == LogSource::UpdateFile =>
            {
                trace!("No update file yet.");
                self.failing_since = None;
                thread::sleep(self.poll_interval);
                return Ok(Batch::Lines(Vec::new()));
            }
            Err(e) => return self.copy_failed(path, e),
        };
        self.failing_since = None;
        let lines = complete_lines(&text);

        let offset = self.consumed.entry(path).or_insert(0);
        if lines.len() < *offset {
            warn!(
                "Log source shrank from {} to {} complete lines; reading it from the start.",
                *offset,
                lines.len()
            );
            *offset = 0;
        }
        let fresh: Vec<String> = lines[*offset..].iter().map(|l| l.to_string()).collect();
        *offset = lines.len();

        if fresh.is_empty() {
            thread::sleep(self.poll_interval);
        } else {
            trace!("Read {} new line(s) from {:?}", fresh.len(), self.current);
        }
        Ok(Batch::Lines(fresh))
    }

    fn follow(&mut self, source: LogSource) -> Result<(), ReadError> {
        let Some(path) = self.path_of(source).map(Path::to_path_buf) else {
            warn!("No file is configured for {:?}; staying on {:?}.", source, self.current);
            return Ok(());
        };
        self.current = source;
        self.failing_since = None;
        let offset = *self.consumed.entry(path).or_insert(0);
        debug!("Now following {:?}, resuming after {} line(s).", source, offset);
        Ok(())
    }

    fn recycle(&mut self) -> Result<(), ReadError> {
        let Some(update) = self.update.clone() else {
            return Ok(());
        };

        retry_within(self.poll_interval, self.timeout, || {
            match fs::remove_file(&update) {
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                other => other,
            }
        })
        .map_err(|(source, waited)| ReadError::RecycleTimeout {
            path: update.clone(),
            waited,
            source,
        })?;

        self.consumed.insert(update, 0);
        debug!("Recycled the update file.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::time::Instant;

    const POLL: Duration = Duration::from_millis(5);
    const TIMEOUT: Duration = Duration::from_millis(200);

    fn append(path: &Path, text: &str) {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    fn lines(batch: Batch) -> Vec<String> {
        match batch {
            Batch::Lines(lines) => lines,
            Batch::EndOfStream => panic!("snapshot reader never ends the stream"),
        }
    }

    #[test]
    fn returns_only_unread_complete_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.txt");
        let mut reader = SnapshotReader::new(&log, dir.path().join(".read"), POLL, TIMEOUT);

        append(&log, "Generation: 0\nbest by ener");
        assert_eq!(lines(reader.next_batch().unwrap()), vec!["Generation: 0"]);

        append(&log, "gy\n 0 (  1.0 ) value= 1.0 fitnes= 2.0\n");
        assert_eq!(
            lines(reader.next_batch().unwrap()),
            vec!["best by energy", " 0 (  1.0 ) value= 1.0 fitnes= 2.0"]
        );

        assert!(lines(reader.next_batch().unwrap()).is_empty());
        assert_eq!(reader.consumed(LogSource::InitialLog), 3);
    }

    #[test]
    fn follow_keeps_offsets_of_sources_already_read() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.txt");
        let update = dir.path().join(".update");
        let mut reader = SnapshotReader::new(&log, dir.path().join(".read"), POLL, TIMEOUT)
            .with_update_file(&update);

        append(&log, "a\nSIGMA_SHARE\n");
        assert_eq!(lines(reader.next_batch().unwrap()).len(), 2);

        reader.follow(LogSource::UpdateFile).unwrap();
        append(&update, "Generation: 1\n");
        assert_eq!(lines(reader.next_batch().unwrap()), vec!["Generation: 1"]);

        append(&log, "clustering all individuals\n");
        reader.follow(LogSource::InitialLog).unwrap();
        assert_eq!(
            lines(reader.next_batch().unwrap()),
            vec!["clustering all individuals"]
        );
    }

    #[test]
    fn follow_without_update_file_stays_on_initial_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.txt");
        let mut reader = SnapshotReader::new(&log, dir.path().join(".read"), POLL, TIMEOUT);

        reader.follow(LogSource::UpdateFile).unwrap();
        assert_eq!(reader.current_source(), LogSource::InitialLog);
        assert_eq!(reader.current_path(), log.as_path());
    }

    #[test]
    fn recycle_removes_update_file_and_restarts_it() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.txt");
        let update = dir.path().join(".update");
        let mut reader = SnapshotReader::new(&log, dir.path().join(".read"), POLL, TIMEOUT)
            .with_update_file(&update);
        reader.follow(LogSource::UpdateFile).unwrap();

        append(&update, "Generation: 1\n");
        assert_eq!(lines(reader.next_batch().unwrap()).len(), 1);

        reader.recycle().unwrap();
        assert!(!update.exists());
        assert_eq!(reader.consumed(LogSource::UpdateFile), 0);

        append(&update, "Generation: 2\n");
        assert_eq!(lines(reader.next_batch().unwrap()), vec!["Generation: 2"]);
    }

    #[test]
    fn truncated_source_is_read_from_the_start() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.txt");
        let mut reader = SnapshotReader::new(&log, dir.path().join(".read"), POLL, TIMEOUT);

        append(&log, "one\ntwo\nthree\n");
        assert_eq!(lines(reader.next_batch().unwrap()).len(), 3);

        fs::write(&log, "fresh\n").unwrap();
        assert_eq!(lines(reader.next_batch().unwrap()), vec!["fresh"]);
    }

    #[test]
    fn unreadable_source_fails_after_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("never").join("log.txt");
        let mut reader = SnapshotReader::new(
            &missing,
            dir.path().join(".read"),
            Duration::from_millis(100),
            Duration::from_secs(1),
        );

        let started = Instant::now();
        let mut empty_batches = 0;
        let err = loop {
            match reader.next_batch() {
                Ok(batch) => {
                    assert!(lines(batch).is_empty());
                    empty_batches += 1;
                }
                Err(err) => break err,
            }
        };
        let elapsed = started.elapsed();

        assert!(matches!(err, ReadError::Timeout { .. }));
        assert!(empty_batches >= 9, "only {empty_batches} poll(s) before giving up");
        assert!(elapsed >= Duration::from_millis(900), "gave up after {elapsed:?}");
        assert!(elapsed < Duration::from_millis(1200), "gave up after {elapsed:?}");
    }

    #[test]
    fn source_appearing_late_is_picked_up_within_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.txt");
        let mut reader = SnapshotReader::new(
            &log,
            dir.path().join(".read"),
            Duration::from_millis(10),
            Duration::from_secs(2),
        );

        let writer_path = log.clone();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            fs::write(writer_path, "SIGMA_SHARE\n").unwrap();
        });

        let mut seen = Vec::new();
        while seen.is_empty() {
            seen = lines(reader.next_batch().unwrap());
        }
        assert_eq!(seen, vec!["SIGMA_SHARE"]);
        writer.join().unwrap();
    }

    #[test]
    fn each_failed_copy_returns_within_one_poll() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = SnapshotReader::new(
            dir.path().join("missing.txt"),
            dir.path().join(".read"),
            Duration::from_millis(10),
            Duration::from_secs(60),
        );

        let started = Instant::now();
        assert!(lines(reader.next_batch().unwrap()).is_empty());
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn missing_update_file_means_no_new_lines() {
        let dir = tempfile::tempdir().unwrap();
        let update = dir.path().join(".update");
        let mut reader = SnapshotReader::new(
            dir.path().join("log.txt"),
            dir.path().join(".read"),
            Duration::from_millis(10),
            Duration::from_millis(50),
        )
        .with_update_file(&update);
        reader.follow(LogSource::UpdateFile).unwrap();

        // Well past the timeout, and still not an error.
        let started = Instant::now();
        while started.elapsed() < Duration::from_millis(200) {
            assert!(lines(reader.next_batch().unwrap()).is_empty());
        }

        append(&update, "Generation: 3\n");
        assert_eq!(lines(reader.next_batch().unwrap()), vec!["Generation: 3"]);
    }
}
