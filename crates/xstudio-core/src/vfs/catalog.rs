//! Locked catalog handle
//!
//! An [`XCatalog`] holds an exclusive lock on its `.cat` file from construction
//! until it is dropped. A second open of the same catalog fails fast with
//! [`CatalogError::Locked`] instead of waiting. All reads of the catalog go
//! through clones of the locked handle, since Windows denies reads through any
//! other handle while an exclusive lock is held.

use std::fs::{File, TryLockError};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::crypto::{apply_data_cipher, decode_pck};
use super::error::CatalogError;
use super::reader::{CatalogEntry, CatalogReader};

/// An open, locked catalog
#[derive(Debug)]
pub struct XCatalog {
    path: PathBuf,
    index: u32,
    data_file: String,
    lock: File,
}

impl XCatalog {
    /// Open and lock a catalog
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref().to_path_buf();
        let lock = File::open(&path)?;
        match lock.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => return Err(CatalogError::Locked(path)),
            Err(TryLockError::Error(e)) => return Err(CatalogError::Io(e)),
        }

        // The lock handle is dropped (and released) if the header is bad
        let index = catalog_index(&path);
        let data_file = CatalogReader::new(lock.try_clone()?, index)?
            .data_file()
            .to_string();

        tracing::debug!("Opened catalog {} (data file {})", path.display(), data_file);
        Ok(Self {
            path,
            index,
            data_file,
            lock,
        })
    }

    /// Catalog file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pack-file index, taken from the numeric file name (`03.cat` is 3)
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Data file name from the catalog header
    pub fn data_file(&self) -> &str {
        &self.data_file
    }

    /// Full path of the data file next to the catalog
    pub fn dat_path(&self) -> PathBuf {
        let folder = self.path.parent().unwrap_or_else(|| Path::new(""));
        let named = folder.join(&self.data_file);
        if named.exists() {
            return named;
        }
        // Some installs ship catalogs whose header names a file with different case
        self.path.with_extension("dat")
    }

    /// A fresh reader positioned at the first entry
    ///
    /// Each reader keeps its own read position, so readers are independent.
    pub fn get_reader(&self) -> Result<CatalogReader, CatalogError> {
        CatalogReader::new(self.lock.try_clone()?, self.index)
    }

    /// Read an entry's bytes from the data file, decrypted and unpacked
    pub fn read_entry(&self, entry: &CatalogEntry) -> Result<Vec<u8>, CatalogError> {
        self.read_range(&entry.path, entry.offset, entry.length, entry.compressed)
    }

    pub(crate) fn read_range(
        &self,
        virtual_path: &str,
        offset: u64,
        length: u64,
        compressed: bool,
    ) -> Result<Vec<u8>, CatalogError> {
        let mut data = File::open(self.dat_path())?;
        let available = data.metadata()?.len();
        let end = offset.checked_add(length).filter(|&end| end <= available);
        let size = end.and_then(|_| usize::try_from(length).ok()).ok_or_else(|| {
            CatalogError::FileFormat {
                offset,
                message: format!(
                    "entry '{}' ({} bytes) extends past the end of {} ({} bytes)",
                    virtual_path,
                    length,
                    self.data_file,
                    available
                ),
            }
        })?;

        data.seek(SeekFrom::Start(offset))?;
        let mut bytes = vec![0u8; size];
        data.read_exact(&mut bytes)?;
        apply_data_cipher(&mut bytes);

        if !compressed {
            return Ok(bytes);
        }
        decode_pck(&bytes).map_err(|e| CatalogError::Decompress {
            path: virtual_path.to_string(),
            message: e.to_string(),
        })
    }
}

impl Drop for XCatalog {
    fn drop(&mut self) {
        if let Err(e) = self.lock.unlock() {
            tracing::warn!("Failed to unlock catalog {}: {}", self.path.display(), e);
        }
        tracing::debug!("Closed catalog {}", self.path.display());
    }
}

/// Numeric stem of a catalog file name, 0 if the stem is not a number
pub fn catalog_index(path: &Path) -> u32 {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::vfs::crypto::{apply_catalog_cipher, encode_pck, DATA_KEY};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    /// Write an obfuscated `NN.cat`/`NN.dat` pair; `.pck` entries are packed
    pub(crate) fn write_catalog(folder: &Path, index: u32, files: &[(&str, &[u8])]) -> PathBuf {
        let dat_name = format!("{:02}.dat", index);
        let mut table = format!("{}\n", dat_name);
        let mut data = Vec::new();
        for (path, content) in files {
            let stored = if path.to_ascii_lowercase().ends_with(".pck") {
                encode_pck(content, 0x7E).unwrap()
            } else {
                content.to_vec()
            };
            table.push_str(&format!("{} {}\n", path, stored.len()));
            data.extend(stored.iter().map(|b| b ^ DATA_KEY));
        }

        let mut table = table.into_bytes();
        apply_catalog_cipher(&mut table, 0);
        let cat_path = folder.join(format!("{:02}.cat", index));
        fs::write(&cat_path, table).unwrap();
        fs::write(folder.join(dat_name), data).unwrap();
        cat_path
    }

    /// Write a catalog from raw decoded text
    pub(crate) fn write_raw_catalog(path: &Path, text: &str) {
        let mut bytes = text.as_bytes().to_vec();
        apply_catalog_cipher(&mut bytes, 0);
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_entries_and_offsets() {
        let temp = TempDir::new().unwrap();
        let path = write_catalog(
            temp.path(),
            3,
            &[
                ("types\\TShips.txt", b"ships"),
                ("scripts\\my script.xml", b"<script/>"),
                ("t\\0001-L044.pck", b"<language/>"),
            ],
        );

        let catalog = XCatalog::open(&path).unwrap();
        assert_eq!(catalog.index(), 3);
        assert_eq!(catalog.data_file(), "03.dat");

        let entries: Vec<CatalogEntry> = catalog
            .get_reader()
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].offset, 0);
        assert_eq!(entries[0].length, 5);
        assert_eq!(entries[1].path, "scripts\\my script.xml");
        assert_eq!(entries[1].offset, 5);
        assert!(!entries[1].compressed);
        assert!(entries[2].compressed);
        assert_eq!(entries[2].offset, 14);

        assert_eq!(catalog.read_entry(&entries[0]).unwrap(), b"ships");
        assert_eq!(catalog.read_entry(&entries[2]).unwrap(), b"<language/>");
    }

    #[test]
    fn test_readers_are_independent() {
        let temp = TempDir::new().unwrap();
        let path = write_catalog(temp.path(), 1, &[("a.txt", b"a"), ("b.txt", b"b")]);
        let catalog = XCatalog::open(&path).unwrap();

        let mut first = catalog.get_reader().unwrap();
        assert_eq!(first.next().unwrap().unwrap().path, "a.txt");

        let mut second = catalog.get_reader().unwrap();
        assert_eq!(second.next().unwrap().unwrap().path, "a.txt");
        assert_eq!(first.next().unwrap().unwrap().path, "b.txt");
        assert!(first.next().is_none());
    }

    #[test]
    fn test_second_open_is_locked() {
        let temp = TempDir::new().unwrap();
        let path = write_catalog(temp.path(), 1, &[("a.txt", b"a")]);

        let first = XCatalog::open(&path).unwrap();
        assert!(matches!(XCatalog::open(&path), Err(CatalogError::Locked(_))));
        assert_eq!(first.get_reader().unwrap().count(), 1);

        drop(first);
        assert!(XCatalog::open(&path).is_ok());
    }

    #[test]
    fn test_bad_record_reports_offset_and_stops() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("01.cat");
        write_raw_catalog(&path, "01.dat\r\na.txt 4\r\n\r\nbroken-record\nc.txt 2\n");

        let catalog = XCatalog::open(&path).unwrap();
        let mut reader = catalog.get_reader().unwrap();
        assert_eq!(reader.next().unwrap().unwrap().length, 4);
        match reader.next() {
            Some(Err(CatalogError::FileFormat { offset, .. })) => assert_eq!(offset, 19),
            other => panic!("expected a format error, got {:?}", other),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_offset_overflow_is_format_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("01.cat");
        write_raw_catalog(
            &path,
            "01.dat\na.txt 18446744073709551615\nb.txt 18446744073709551615\n",
        );

        let catalog = XCatalog::open(&path).unwrap();
        let mut reader = catalog.get_reader().unwrap();
        assert_eq!(reader.next().unwrap().unwrap().offset, 0);
        match reader.next() {
            Some(Err(CatalogError::FileFormat { offset, message })) => {
                assert_eq!(offset, 34);
                assert_eq!(message, "entry offset overflows");
            }
            other => panic!("expected a format error, got {:?}", other),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_oversized_entry_is_rejected_before_reading() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("01.cat");
        write_raw_catalog(&path, "01.dat\na.txt 18446744073709551615\nb.txt 4\n");
        fs::write(temp.path().join("01.dat"), [DATA_KEY; 8]).unwrap();

        let catalog = XCatalog::open(&path).unwrap();
        let huge = catalog.get_reader().unwrap().next().unwrap().unwrap();
        assert!(matches!(
            catalog.read_entry(&huge),
            Err(CatalogError::FileFormat { offset: 0, .. })
        ));

        let past_end = CatalogEntry {
            path: "c.txt".to_string(),
            catalog: 1,
            offset: 6,
            length: 4,
            compressed: false,
        };
        assert!(matches!(
            catalog.read_entry(&past_end),
            Err(CatalogError::FileFormat { offset: 6, .. })
        ));

        let last = CatalogEntry { offset: 4, ..past_end };
        assert_eq!(catalog.read_entry(&last).unwrap(), vec![0u8; 4]);
    }

    #[test]
    fn test_readers_survive_interleaved_reads() {
        let temp = TempDir::new().unwrap();
        let names: Vec<String> = (0..2000).map(|i| format!("scripts\\plugin.entry.{:04}.xml", i)).collect();
        let files: Vec<(&str, &[u8])> = names.iter().map(|n| (n.as_str(), &b"x"[..])).collect();
        let path = write_catalog(temp.path(), 1, &files);
        let catalog = XCatalog::open(&path).unwrap();

        let mut first = catalog.get_reader().unwrap();
        let mut second = catalog.get_reader().unwrap();
        for (i, name) in names.iter().enumerate() {
            let a = first.next().unwrap().unwrap();
            let b = second.next().unwrap().unwrap();
            assert_eq!(&a.path, name);
            assert_eq!(a, b);
            assert_eq!(a.offset, i as u64);
        }
        assert!(first.next().is_none());
        assert!(second.next().is_none());
    }

    #[test]
    fn test_empty_catalog_is_format_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("02.cat");
        fs::write(&path, b"").unwrap();
        assert!(matches!(
            XCatalog::open(&path),
            Err(CatalogError::FileFormat { offset: 0, .. })
        ));
        // Lock was released with the failed handle
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_catalog_index() {
        assert_eq!(catalog_index(Path::new("/game/03.cat")), 3);
        assert_eq!(catalog_index(Path::new("/game/addon/12.cat")), 12);
        assert_eq!(catalog_index(Path::new("/game/mod.cat")), 0);
    }
}
