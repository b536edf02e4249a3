use super::RequestLogStorage;
use crate::error::StorageError;
use crate::record::{NewRequestLog, RequestLogRecord};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Append-only JSON-lines file: one record per line.
///
/// Ids continue from the number of records already in the file, so reopening
/// an existing log keeps them unique. A failed write is rolled back to the
/// previous end of file; if that rollback fails too, the store refuses
/// further inserts until it is reopened.
#[derive(Debug)]
pub struct JsonLinesStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    file: Box<dyn LogFile>,
    next_id: u64,
    damaged: bool,
}

/// The file operations an insert needs.
trait LogFile: Send + fmt::Debug {
    fn len(&self) -> io::Result<u64>;
    fn append(&mut self, bytes: &[u8]) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl LogFile for File {
    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

impl JsonLinesStore {
    /// Open (or create) the log file, creating missing parent directories.
    ///
    /// A trailing line without a newline, left by an interrupted write, is cut
    /// off before appending resumes.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let existing = match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(mut file) => recover(&mut file, &path)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::debug!(path = %path.display(), existing, "Opened request log file");

        Ok(Self::from_parts(path, Box::new(file), existing + 1))
    }

    fn from_parts(path: PathBuf, file: Box<dyn LogFile>, next_id: u64) -> Self {
        Self {
            path,
            inner: Mutex::new(Inner {
                file,
                next_id,
                damaged: false,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record in the file at `path`, oldest first.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<RequestLogRecord>, StorageError> {
        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

impl RequestLogStorage for JsonLinesStore {
    fn insert(&self, log: NewRequestLog) -> Result<RequestLogRecord, StorageError> {
        log.validate()?;
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| StorageError::Unavailable("request log file lock poisoned".to_string()))?;
        let inner = &mut *guard;

        if inner.damaged {
            return Err(StorageError::Unavailable(
                "request log file has an unrecovered partial write".to_string(),
            ));
        }

        let record = RequestLogRecord::new(inner.next_id, log);
        // Serialize the whole line first so a failure never leaves a fragment.
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let start = inner.file.len()?;
        if let Err(e) = write_line(&mut *inner.file, line.as_bytes()) {
            // Nothing unacknowledged may stay behind, not even a complete line.
            if let Err(rollback) = inner.file.truncate(start) {
                tracing::error!(
                    path = %self.path.display(),
                    "Request log file rollback failed: {rollback}"
                );
                inner.damaged = true;
            }
            return Err(e.into());
        }
        inner.next_id += 1;

        Ok(record)
    }
}

fn write_line(file: &mut dyn LogFile, bytes: &[u8]) -> io::Result<()> {
    file.append(bytes)?;
    file.sync()
}

/// Count the complete records in `file`, truncating any incomplete last line.
fn recover(file: &mut File, path: &Path) -> Result<u64, StorageError> {
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;

    let complete = contents
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1);
    if complete < contents.len() {
        tracing::warn!(
            path = %path.display(),
            dropped_bytes = contents.len() - complete,
            "Truncating incomplete trailing request log line"
        );
        file.set_len(complete as u64)?;
    }

    let count = contents[..complete]
        .split(|&b| b == b'\n')
        .filter(|line| !line.trim_ascii().is_empty())
        .count();
    Ok(count as u64)
}
