// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::checksum::{Checksum, ChecksummedReader, ChecksummedWriter};
use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use crate::format_version::FormatVersion;
use crate::query::GappedIndex;
use crate::succinct::IntVec;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// File name of the bit-compressed text inside a collection
pub const TEXT_FILE: &str = "text.gm";

const TMP_DIR: &str = "tmp";
const INDEX_DIR: &str = "index";
const PATTERNS_DIR: &str = "patterns";
const RESULTS_DIR: &str = "results";

/// An on-disk collection: one bit-compressed text plus staging, index
/// cache, pattern and result directories
///
/// The layout is created once and never mutated afterwards; index caches
/// are written atomically through the staging directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Collection {
    path: PathBuf,
}

fn write_payload<P: AsRef<Path>, T: Encode>(path: P, item: &T) -> crate::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);

    FormatVersion::V1.write_file_header(&mut writer)?;

    let mut writer = ChecksummedWriter::new(writer);
    item.encode_into(&mut writer)?;

    let checksum = writer.checksum();
    let inner = writer.inner_mut();
    inner
        .write_u128::<BigEndian>(checksum.into_u128())
        .map_err(EncodeError::from)?;
    inner.flush()?;

    Ok(())
}

fn read_payload<P: AsRef<Path>, T: Decode>(path: P) -> crate::Result<T> {
    let file = std::fs::File::open(path)?;
    let mut reader = BufReader::new(file);

    FormatVersion::parse_file_header(&mut reader)?;

    let mut reader = ChecksummedReader::new(reader);
    let item = T::decode_from(&mut reader)?;

    let computed = reader.checksum();
    let stored = Checksum::from_raw(
        reader
            .inner_mut()
            .read_u128::<BigEndian>()
            .map_err(DecodeError::from)?,
    );

    computed.check(stored)?;

    Ok(item)
}

impl Collection {
    /// Creates the collection layout and stores the bit-compressed text.
    pub fn create<P: AsRef<Path>>(dir: P, input: &[u8]) -> crate::Result<Self> {
        let path = dir.as_ref().to_path_buf();

        std::fs::create_dir_all(&path)?;
        std::fs::create_dir_all(path.join(TMP_DIR))?;
        std::fs::create_dir_all(path.join(INDEX_DIR))?;
        std::fs::create_dir_all(path.join(PATTERNS_DIR))?;
        std::fs::create_dir_all(path.join(RESULTS_DIR))?;

        let text = IntVec::from_slice(&input.iter().map(|&b| u64::from(b)).collect::<Vec<_>>());

        log::info!(
            "creating collection at {path:?}, num_syms={}, width={}",
            text.len(),
            text.width(),
        );

        write_payload(path.join(TEXT_FILE), &text)?;

        Ok(Self { path })
    }

    /// Opens an existing collection.
    pub fn open<P: AsRef<Path>>(dir: P) -> crate::Result<Self> {
        let path = dir.as_ref().to_path_buf();

        if !path.join(TEXT_FILE).try_exists()? {
            return Err(crate::Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "collection text file not found",
            )));
        }

        Ok(Self { path })
    }

    /// Collection directory
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding pattern files
    #[must_use]
    pub fn patterns_dir(&self) -> PathBuf {
        self.path.join(PATTERNS_DIR)
    }

    /// Directory holding result files
    #[must_use]
    pub fn results_dir(&self) -> PathBuf {
        self.path.join(RESULTS_DIR)
    }

    /// Loads the bit-compressed text.
    pub fn load_text(&self) -> crate::Result<IntVec> {
        read_payload(self.path.join(TEXT_FILE))
    }

    fn index_path(&self, name: &str) -> PathBuf {
        self.path.join(INDEX_DIR).join(format!("{name}.idx"))
    }

    /// Caches a built index under the given name, atomically.
    pub fn store_index(&self, name: &str, index: &GappedIndex) -> crate::Result<PathBuf> {
        let staging = self.path.join(TMP_DIR).join(format!("{name}.idx"));

        {
            let file = std::fs::File::create(&staging)?;
            let mut writer = BufWriter::new(file);
            index.save_into(&mut writer)?;
            writer.flush()?;
        }

        let target = self.index_path(name);
        std::fs::rename(&staging, &target)?;

        log::info!("cached index {name:?} at {target:?}");

        Ok(target)
    }

    /// Loads a cached index; `Ok(None)` when it was never stored.
    pub fn load_index(&self, name: &str) -> crate::Result<Option<GappedIndex>> {
        let path = self.index_path(name);

        if !path.try_exists()? {
            return Ok(None);
        }

        let file = std::fs::File::open(path)?;
        let mut reader = BufReader::new(file);

        GappedIndex::load_from(&mut reader).map(Some)
    }
}
