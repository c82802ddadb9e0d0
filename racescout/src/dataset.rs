use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::config::EncodingMode;
use crate::errors::{SearchError, SearchResult};

// Constants for dataset loading
const BUFFER_CAPACITY: usize = 65536;
pub(crate) const SMALL_FILE_THRESHOLD: u64 = 32 * 1024; // 32KB
pub(crate) const LARGE_FILE_THRESHOLD: u64 = 10 * 1024 * 1024; // 10MB

/// An immutable, ordered sequence of lines shared read-only by every worker
pub type Dataset = Arc<[String]>;

/// How a dataset file was read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    Whole,
    Buffered,
    Mapped,
}

impl LoadStrategy {
    pub fn for_size(size: u64) -> Self {
        if size < SMALL_FILE_THRESHOLD {
            LoadStrategy::Whole
        } else if size >= LARGE_FILE_THRESHOLD {
            LoadStrategy::Mapped
        } else {
            LoadStrategy::Buffered
        }
    }
}

/// Decodes raw bytes according to the encoding mode
fn decode_bytes(bytes: &[u8], path: &Path, encoding_mode: EncodingMode) -> SearchResult<String> {
    match encoding_mode {
        EncodingMode::FailFast => match std::str::from_utf8(bytes) {
            Ok(valid) => Ok(valid.to_owned()),
            Err(_) => {
                // Rebuild through String::from_utf8 to get an owned FromUtf8Error
                let err = match String::from_utf8(bytes.to_vec()) {
                    Ok(_) => unreachable!("bytes were already rejected as UTF-8"),
                    Err(e) => e,
                };
                Err(SearchError::encoding_error(path, err))
            }
        },
        EncodingMode::Lossy => {
            let cow = String::from_utf8_lossy(bytes);
            if let std::borrow::Cow::Owned(_) = cow {
                warn!("Invalid UTF-8 replaced in dataset: {}", path.display());
            }
            Ok(cow.into_owned())
        }
    }
}

/// Splits decoded text into dataset lines.
///
/// `\n` and `\r\n` terminators are stripped. A trailing terminator does not
/// produce an extra empty line; a final line without one is kept.
pub fn split_lines(contents: &str) -> Vec<String> {
    contents.lines().map(str::to_owned).collect()
}

fn open(path: &Path) -> SearchResult<File> {
    File::open(path).map_err(|e| SearchError::from_io(path, e))
}

fn read_bytes(path: &Path, strategy: LoadStrategy, encoding: EncodingMode) -> SearchResult<String> {
    match strategy {
        LoadStrategy::Whole => {
            trace!("Reading dataset in one call: {}", path.display());
            let bytes = std::fs::read(path).map_err(|e| SearchError::from_io(path, e))?;
            decode_bytes(&bytes, path, encoding)
        }
        LoadStrategy::Buffered => {
            trace!("Reading dataset through a buffer: {}", path.display());
            let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, open(path)?);
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes)?;
            decode_bytes(&bytes, path, encoding)
        }
        LoadStrategy::Mapped => {
            trace!("Memory-mapping dataset: {}", path.display());
            let file = open(path)?;
            // The map is dropped before this function returns and the file is only read.
            let mmap = unsafe { Mmap::map(&file) }?;
            decode_bytes(&mmap, path, encoding)
        }
    }
}

/// Loads a line-oriented text file into an ordered dataset.
///
/// An empty file yields an empty dataset; callers decide what that means.
pub fn load_dataset(path: &Path, encoding: EncodingMode) -> SearchResult<Vec<String>> {
    let metadata = std::fs::metadata(path).map_err(|e| SearchError::from_io(path, e))?;
    if metadata.is_dir() {
        return Err(SearchError::IoError(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is a directory", path.display()),
        )));
    }

    let strategy = LoadStrategy::for_size(metadata.len());
    let contents = read_bytes(path, strategy, encoding)?;
    let lines = split_lines(&contents);

    debug!(
        "Loaded {} lines ({} bytes, {:?}) from {}",
        lines.len(),
        metadata.len(),
        strategy,
        path.display()
    );
    Ok(lines)
}
