//! Streaming catalog decoder
//!
//! A decoded catalog looks like:
//! ```text
//! 01.dat
//! scripts\plugin.mymod.main.pck 1234
//! t\440001-L044.pck 56789
//! ```
//! The first line names the data file; every following line is a virtual path
//! and the entry's size. Entries are stored back to back in the data file, so
//! offsets are the running sum of the sizes before them.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};

use super::crypto::catalog_key;
use super::error::CatalogError;

/// One file stored in a catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Virtual path as written in the catalog (`\` separated)
    pub path: String,
    /// Pack-file index of the owning catalog
    pub catalog: u32,
    /// Byte offset in the data file
    pub offset: u64,
    /// Stored size in bytes
    pub length: u64,
    /// Whether the payload is a PCK (gzip) stream
    pub compressed: bool,
}

/// A shared catalog handle read at a private position
///
/// Clones of the locked handle share the OS file cursor, so reads are positional
/// and readers never disturb each other. Reading through the lock owner's handle
/// also keeps Windows from refusing the read while the exclusive lock is held.
#[derive(Debug)]
pub(crate) struct PositionedFile {
    file: File,
    position: u64,
}

impl PositionedFile {
    pub(crate) fn new(file: File) -> Self {
        Self { file, position: 0 }
    }
}

impl Read for PositionedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = read_at(&self.file, buf, self.position)?;
        self.position += n as u64;
        Ok(n)
    }
}

#[cfg(unix)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    std::os::unix::fs::FileExt::read_at(file, buf, offset)
}

#[cfg(windows)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    std::os::windows::fs::FileExt::seek_read(file, buf, offset)
}

#[cfg(not(any(unix, windows)))]
fn read_at(mut file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::io::{Seek, SeekFrom};
    file.seek(SeekFrom::Start(offset))?;
    file.read(buf)
}

/// Lazily decodes the entry table of one catalog
///
/// Yields entries in catalog order. After the first error the iterator is
/// exhausted.
#[derive(Debug)]
pub struct CatalogReader {
    stream: BufReader<PositionedFile>,
    catalog: u32,
    data_file: String,
    position: u64,
    data_offset: u64,
    done: bool,
}

impl CatalogReader {
    /// Start decoding a catalog handle from its first byte; reads the header line
    pub(crate) fn new(file: File, catalog: u32) -> Result<Self, CatalogError> {
        let mut reader = Self {
            stream: BufReader::new(PositionedFile::new(file)),
            catalog,
            data_file: String::new(),
            position: 0,
            data_offset: 0,
            done: false,
        };

        match reader.read_line()? {
            Some((_, header)) if !header.trim().is_empty() => {
                reader.data_file = header.trim().to_string();
            }
            _ => {
                return Err(CatalogError::FileFormat {
                    offset: 0,
                    message: "missing data file name".to_string(),
                })
            }
        }
        Ok(reader)
    }

    /// Data file name from the catalog header (normally `NN.dat`)
    pub fn data_file(&self) -> &str {
        &self.data_file
    }

    /// Pack-file index of the catalog being read
    pub fn catalog(&self) -> u32 {
        self.catalog
    }

    /// Read and decode one line; returns its start offset and text without the line break
    fn read_line(&mut self) -> io::Result<Option<(u64, String)>> {
        let start = self.position;
        let mut line = Vec::new();
        loop {
            let buf = self.stream.fill_buf()?;
            if buf.is_empty() {
                return Ok(if line.is_empty() {
                    None
                } else {
                    Some((start, decode_line(&line)))
                });
            }

            let mut used = 0;
            let mut complete = false;
            for &b in buf {
                let c = b ^ catalog_key(self.position + used as u64);
                used += 1;
                if c == b'\n' {
                    complete = true;
                    break;
                }
                line.push(c);
            }
            self.stream.consume(used);
            self.position += used as u64;

            if complete {
                return Ok(Some((start, decode_line(&line))));
            }
        }
    }

    fn parse_record(&mut self, offset: u64, line: &str) -> Result<CatalogEntry, CatalogError> {
        let (path, size) = line.rsplit_once(' ').ok_or_else(|| CatalogError::FileFormat {
            offset,
            message: format!("missing size in '{}'", line),
        })?;
        let length: u64 = size.trim().parse().map_err(|_| CatalogError::FileFormat {
            offset,
            message: format!("invalid size '{}'", size),
        })?;
        let path = path.trim();
        if path.is_empty() {
            return Err(CatalogError::FileFormat {
                offset,
                message: "missing path".to_string(),
            });
        }

        let next_offset = self.data_offset.checked_add(length).ok_or_else(|| CatalogError::FileFormat {
            offset,
            message: "entry offset overflows".to_string(),
        })?;
        let entry = CatalogEntry {
            path: path.to_string(),
            catalog: self.catalog,
            offset: self.data_offset,
            length,
            compressed: path.to_ascii_lowercase().ends_with(".pck"),
        };
        self.data_offset = next_offset;
        Ok(entry)
    }
}

impl Iterator for CatalogReader {
    type Item = Result<CatalogEntry, CatalogError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let (offset, line) = match self.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let result = self.parse_record(offset, &line);
            if result.is_err() {
                self.done = true;
            }
            return Some(result);
        }
    }
}

/// Catalog text is single-byte; map bytes straight to code points and drop a trailing `\r`
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    bytes.iter().map(|&b| b as char).collect()
}
