// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

pub const MAGIC_BYTES: [u8; 4] = *b"GAPM";

/// Disk format version
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FormatVersion {
    /// Version for 0.x.x releases
    V1,
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

impl From<FormatVersion> for u8 {
    fn from(value: FormatVersion) -> Self {
        match value {
            FormatVersion::V1 => 1,
        }
    }
}

impl TryFrom<u8> for FormatVersion {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::V1),
            _ => Err(()),
        }
    }
}

impl FormatVersion {
    /// Writes the magic bytes followed by the version byte.
    pub fn write_file_header<W: Write>(self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&MAGIC_BYTES)?;
        writer.write_u8(u8::from(self))?;
        Ok(())
    }

    /// Reads and validates a file header, returning the version.
    pub fn parse_file_header<R: Read>(reader: &mut R) -> crate::Result<Self> {
        let mut magic = [0u8; MAGIC_BYTES.len()];
        reader.read_exact(&mut magic)?;

        if magic != MAGIC_BYTES {
            return Err(crate::Error::Decode(
                crate::coding::DecodeError::InvalidHeader("FormatVersion"),
            ));
        }

        let version = reader.read_u8()?;

        Self::try_from(version).map_err(|()| {
            crate::Error::Decode(crate::coding::DecodeError::InvalidTag(("FormatVersion", version)))
        })
    }
}
