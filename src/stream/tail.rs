use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Tracks byte offsets for append-only stream logs so each read returns only
/// complete lines written since the previous read.
///
/// A trailing line without its newline is left unread until the writer
/// finishes it, so NDJSON records are never split across reads.
#[derive(Debug, Clone, Default)]
pub struct TailState {
    offsets: HashMap<PathBuf, u64>,
}

impl TailState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current offset for a file (0 if never read)
    pub fn get_offset(&self, path: &Path) -> u64 {
        self.offsets.get(path).copied().unwrap_or(0)
    }

    pub fn set_offset(&mut self, path: PathBuf, offset: u64) {
        self.offsets.insert(path, offset);
    }

    /// Read complete lines appended since the last read.
    ///
    /// # Imperative Shell
    /// Performs file I/O. Updates internal offset state.
    ///
    /// # Truncation Detection
    /// If the file shrank below the stored offset it was truncated or
    /// rotated; reading restarts from the beginning.
    pub fn read_new_lines(&mut self, path: &Path) -> io::Result<String> {
        let mut file = File::open(path)?;
        let current_offset = self.get_offset(path);
        let file_len = file.metadata()?.len();

        let read_offset = if file_len < current_offset {
            tracing::debug!(path = %path.display(), "stream log truncated, rereading");
            self.set_offset(path.to_path_buf(), 0);
            0
        } else {
            current_offset
        };

        file.seek(SeekFrom::Start(read_offset))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        // Only hand out up to the last newline.
        let complete = match bytes.iter().rposition(|b| *b == b'\n') {
            Some(idx) => idx + 1,
            None => return Ok(String::new()),
        };
        bytes.truncate(complete);
        self.set_offset(path.to_path_buf(), read_offset + complete as u64);

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
