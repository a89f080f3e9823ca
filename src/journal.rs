//! Append-only, checksum-framed JSON-lines files
//!
//! Every line is `<crc32 as 8 lowercase hex> <json>\n`. Each append is
//! written with a single `write_all` and followed by an fsync; a line is
//! acknowledged only after the fsync returns. Reading verifies every
//! checksum and reports the 1-based line number of the first bad line.
//!
//! A failed append is rolled back by truncating the file to the length it
//! had before the write, so the caller may retry without leaving a torn or
//! duplicated line behind. If the rollback itself fails the journal refuses
//! every later append until it is reopened.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crc32fast::Hasher;

/// Computes a CRC32 (IEEE) checksum.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Frames one JSON document as a journal line, including the newline.
pub fn frame_line(json: &str) -> String {
    format!("{:08x} {}\n", compute_checksum(json.as_bytes()), json)
}

/// Why a journal line was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineFault {
    /// Missing separator or unparsable checksum
    Malformed,
    /// Checksum does not match the payload
    ChecksumMismatch,
}

impl LineFault {
    pub fn describe(&self) -> &'static str {
        match self {
            LineFault::Malformed => "malformed journal line",
            LineFault::ChecksumMismatch => "checksum mismatch",
        }
    }
}

/// Splits a line (without its newline) and verifies its checksum.
pub fn parse_line(line: &str) -> Result<&str, LineFault> {
    let (crc, json) = line.split_once(' ').ok_or(LineFault::Malformed)?;
    if crc.len() != 8 {
        return Err(LineFault::Malformed);
    }
    let expected = u32::from_str_radix(crc, 16).map_err(|_| LineFault::Malformed)?;
    if compute_checksum(json.as_bytes()) != expected {
        return Err(LineFault::ChecksumMismatch);
    }
    Ok(json)
}

/// A journal line that failed verification
#[derive(Debug)]
pub enum ReadFault {
    /// Underlying read failed
    Io(io::Error),
    /// Line `line` (1-based) did not verify
    Line { line: usize, fault: LineFault },
}

/// Why an append did not land
#[derive(Debug)]
pub enum AppendFault {
    /// The write or fsync failed and the file was truncated back to its
    /// previous length. Nothing from this append remains; retrying is safe.
    RolledBack(io::Error),
    /// A rollback failed earlier; the tail of the file is unknown
    Unusable(String),
}

impl fmt::Display for AppendFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppendFault::RolledBack(e) => write!(f, "append rolled back: {}", e),
            AppendFault::Unusable(reason) => write!(f, "journal unusable: {}", reason),
        }
    }
}

/// The writable side of a journal
///
/// Implemented for `File`; other implementations let tests inject
/// short writes and failing fsyncs.
pub trait JournalFile: Write + Send + fmt::Debug {
    /// Current length in bytes
    fn size(&self) -> io::Result<u64>;

    /// Cuts the file back to `len` bytes
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;

    /// Flushes data and metadata to stable storage
    fn sync(&mut self) -> io::Result<()>;
}

impl JournalFile for File {
    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Handle on one journal file
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    file: Box<dyn JournalFile>,
    unusable: Option<String>,
}

impl Journal {
    /// Opens or creates the journal, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = open_append(&path)?;
        Ok(Self::with_file(path, Box::new(file)))
    }

    /// Wraps an already-open writer for `path`. Reads still go to `path`.
    pub fn with_file(path: impl Into<PathBuf>, file: Box<dyn JournalFile>) -> Self {
        Self {
            path: path.into(),
            file,
            unusable: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_usable(&self) -> bool {
        self.unusable.is_none()
    }

    /// Appends one JSON document and fsyncs.
    ///
    /// On failure the partial line is truncated away before returning.
    pub fn append(&mut self, json: &str) -> Result<(), AppendFault> {
        if let Some(reason) = &self.unusable {
            return Err(AppendFault::Unusable(reason.clone()));
        }

        let start = self.file.size().map_err(AppendFault::RolledBack)?;
        let line = frame_line(json);
        let written = self
            .file
            .write_all(line.as_bytes())
            .and_then(|()| self.file.sync());

        let Err(cause) = written else {
            return Ok(());
        };

        let rollback = self
            .file
            .truncate_to(start)
            .and_then(|()| self.file.sync());
        match rollback {
            Ok(()) => Err(AppendFault::RolledBack(cause)),
            Err(rollback_err) => {
                let reason = format!(
                    "append failed ({}) and truncating back to {} bytes failed ({})",
                    cause, start, rollback_err
                );
                self.unusable = Some(reason.clone());
                Err(AppendFault::Unusable(reason))
            }
        }
    }

    /// Reads every verified payload in file order.
    ///
    /// A final line without a trailing newline is a torn write and is
    /// reported like any other corrupt line.
    pub fn read_all(&self) -> Result<Vec<String>, ReadFault> {
        let file = File::open(&self.path).map_err(ReadFault::Io)?;
        let mut reader = BufReader::new(file);
        let mut payloads = Vec::new();
        let mut buffer = String::new();
        let mut line_no = 0;

        loop {
            buffer.clear();
            let read = reader.read_line(&mut buffer).map_err(ReadFault::Io)?;
            if read == 0 {
                break;
            }
            line_no += 1;

            let Some(line) = buffer.strip_suffix('\n') else {
                return Err(ReadFault::Line {
                    line: line_no,
                    fault: LineFault::Malformed,
                });
            };
            let payload = parse_line(line).map_err(|fault| ReadFault::Line {
                line: line_no,
                fault,
            })?;
            payloads.push(payload.to_string());
        }

        Ok(payloads)
    }
}

/// Opens `path` for appending, creating it and its parent directories.
pub fn open_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
}

/// A journal file whose writes, fsyncs and truncations can be told to fail
#[cfg(test)]
pub(crate) mod faulty {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Shared failure budget; each counter is the number of upcoming
    /// operations of that kind that will fail
    #[derive(Debug, Default)]
    pub(crate) struct Faults {
        pub(crate) tear_writes: AtomicUsize,
        pub(crate) fail_syncs: AtomicUsize,
        pub(crate) fail_truncates: AtomicUsize,
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    #[derive(Debug)]
    pub(crate) struct FaultyFile {
        inner: File,
        faults: Arc<Faults>,
    }

    impl FaultyFile {
        pub(crate) fn journal(path: &Path, faults: Arc<Faults>) -> Journal {
            let inner = open_append(path).unwrap();
            Journal::with_file(path, Box::new(FaultyFile { inner, faults }))
        }
    }

    impl Write for FaultyFile {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if take(&self.faults.tear_writes) {
                // Half the line reaches the disk, then the device gives up
                let half = buf.len() / 2;
                self.inner.write_all(&buf[..half])?;
                return Err(io::Error::new(io::ErrorKind::Other, "no space left on device"));
            }
            self.inner.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    impl JournalFile for FaultyFile {
        fn size(&self) -> io::Result<u64> {
            self.inner.size()
        }

        fn truncate_to(&mut self, len: u64) -> io::Result<()> {
            if take(&self.faults.fail_truncates) {
                return Err(io::Error::new(io::ErrorKind::Other, "truncate refused"));
            }
            self.inner.truncate_to(len)
        }

        fn sync(&mut self) -> io::Result<()> {
            if take(&self.faults.fail_syncs) {
                return Err(io::Error::new(io::ErrorKind::Other, "fsync failed"));
            }
            self.inner.sync()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::faulty::{FaultyFile, Faults};
    use super::*;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_frame_and_parse() {
        let line = frame_line(r#"{"a":1}"#);
        assert!(line.ends_with('\n'));
        assert_eq!(parse_line(line.trim_end_matches('\n')), Ok(r#"{"a":1}"#));
    }

    #[test]
    fn test_parse_detects_bit_flip() {
        let line = frame_line(r#"{"a":1}"#).replace("\"a\":1", "\"a\":2");
        assert_eq!(
            parse_line(line.trim_end_matches('\n')),
            Err(LineFault::ChecksumMismatch)
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(parse_line("nochecksum"), Err(LineFault::Malformed));
        assert_eq!(parse_line("zz {}"), Err(LineFault::Malformed));
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("j.log");
        let mut journal = Journal::open(&path).unwrap();
        journal.append(r#"{"n":1}"#).unwrap();
        journal.append(r#"{"n":2}"#).unwrap();

        let reopened = Journal::open(&path).unwrap();
        assert_eq!(reopened.read_all().unwrap(), vec![r#"{"n":1}"#, r#"{"n":2}"#]);
    }

    #[test]
    fn test_torn_final_line_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("j.log");
        let mut journal = Journal::open(&path).unwrap();
        journal.append(r#"{"n":1}"#).unwrap();
        {
            let mut raw = OpenOptions::new().append(true).open(&path).unwrap();
            raw.write_all(b"0000abcd {\"n\"").unwrap();
        }
        match journal.read_all() {
            Err(ReadFault::Line { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected torn line fault, got {:?}", other),
        }
    }

    #[test]
    fn test_torn_write_is_truncated_away() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("j.log");
        let faults = Arc::new(Faults::default());
        let mut journal = FaultyFile::journal(&path, faults.clone());
        journal.append(r#"{"n":1}"#).unwrap();

        faults.tear_writes.store(1, Ordering::SeqCst);
        match journal.append(r#"{"n":2}"#) {
            Err(AppendFault::RolledBack(_)) => {}
            other => panic!("expected rollback, got {:?}", other),
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), frame_line(r#"{"n":1}"#));

        journal.append(r#"{"n":2}"#).unwrap();
        assert_eq!(journal.read_all().unwrap(), vec![r#"{"n":1}"#, r#"{"n":2}"#]);
    }

    #[test]
    fn test_failed_fsync_leaves_no_line_to_duplicate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("j.log");
        let faults = Arc::new(Faults::default());
        let mut journal = FaultyFile::journal(&path, faults.clone());

        faults.fail_syncs.store(1, Ordering::SeqCst);
        assert!(matches!(
            journal.append(r#"{"n":1}"#),
            Err(AppendFault::RolledBack(_))
        ));
        journal.append(r#"{"n":1}"#).unwrap();

        assert_eq!(journal.read_all().unwrap(), vec![r#"{"n":1}"#]);
    }

    #[test]
    fn test_failed_rollback_makes_journal_unusable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("j.log");
        let faults = Arc::new(Faults::default());
        let mut journal = FaultyFile::journal(&path, faults.clone());

        faults.tear_writes.store(1, Ordering::SeqCst);
        faults.fail_truncates.store(1, Ordering::SeqCst);
        assert!(matches!(
            journal.append(r#"{"n":1}"#),
            Err(AppendFault::Unusable(_))
        ));
        assert!(!journal.is_usable());

        // Later appends are refused even though the device recovered
        match journal.append(r#"{"n":2}"#) {
            Err(AppendFault::Unusable(reason)) => assert!(reason.contains("truncate refused")),
            other => panic!("expected unusable journal, got {:?}", other),
        }
    }
}
