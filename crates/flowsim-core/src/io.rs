//! Lenient text input
//!
//! G-code exports and captured serial logs regularly contain bytes that are not
//! valid UTF-8 (binary thumbnails, line noise on the UART). Both readers in this
//! workspace go through [`LossyLines`], which drops invalid sequences instead
//! of failing the whole read.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{InputError, Result};

/// Buffer size for reading large files (256 KB)
const READ_BUFFER_SIZE: usize = 256 * 1024;

/// A validated, readable source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    file_size: u64,
}

impl SourceFile {
    /// Check that `path` names an existing regular file
    ///
    /// # Errors
    /// Returns [`InputError::SourceNotFound`] when the path does not exist and
    /// [`InputError::NotAFile`] when it names a directory or similar.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(InputError::SourceNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        if !path.is_file() {
            return Err(InputError::NotAFile {
                path: path.display().to_string(),
            }
            .into());
        }

        let file_size = fs::metadata(&path)?.len();
        tracing::debug!(path = %path.display(), file_size, "Resolved source file");

        Ok(Self { path, file_size })
    }

    /// Get file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get file size in bytes
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// File name without directory or extension, used to name derived outputs
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string())
    }

    /// Open the file as a buffered reader
    pub fn open(&self) -> Result<BufReader<File>> {
        let file = File::open(&self.path).map_err(|e| InputError::Unreadable {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(BufReader::with_capacity(READ_BUFFER_SIZE, file))
    }

    /// Open the file and iterate its lines leniently
    pub fn lines(&self) -> Result<LossyLines<BufReader<File>>> {
        Ok(LossyLines::new(self.open()?))
    }
}

/// Line iterator that tolerates invalid UTF-8
///
/// Yields each line with its `\n` or `\r\n` terminator removed. Only genuine
/// I/O failures surface as `Err`.
pub struct LossyLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LossyLines<R> {
    /// Wrap a buffered reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(256),
        }
    }
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                let mut line = String::with_capacity(self.buf.len());
                for chunk in self.buf.utf8_chunks() {
                    line.push_str(chunk.valid());
                }
                Some(Ok(line))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_lines_strip_terminators() {
        let input = Cursor::new(b"G1 E1\r\nG1 E2\nG1 E3".to_vec());
        let lines: Vec<String> = LossyLines::new(input).map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["G1 E1", "G1 E2", "G1 E3"]);
    }

    #[test]
    fn test_invalid_utf8_is_dropped() {
        let input = Cursor::new(b"G1 \xff\xfe E4\nG1 E1\xff2\nM83\n".to_vec());
        let lines: Vec<String> = LossyLines::new(input).map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["G1  E4", "G1 E12", "M83"]);
    }

    #[test]
    fn test_empty_lines_are_kept() {
        let input = Cursor::new(b"\n\nG1 E1\n".to_vec());
        let count = LossyLines::new(input).count();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_missing_source() {
        let err = SourceFile::new("/definitely/not/here.gcode").unwrap_err();
        assert!(err.is_input_absent());
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let dir = std::env::temp_dir();
        let err = SourceFile::new(&dir).unwrap_err();
        assert!(err.is_input_absent());
    }
}
