//! Object identifier (SHA-1 digest)
//!
//! Object ids are 40-character lowercase hexadecimal strings naming the
//! digest of an object's canonical encoding. Content addressing means equal
//! content always produces an equal id; two objects with the same id are
//! assumed bit-identical.
//!
//! ## Format
//!
//! - Full: 40 hex characters
//! - Short: first 7 characters by default, display only
//!
//! ## Storage
//!
//! Loose objects live at `objects/<first-2-chars>/<remaining-38-chars>`.

use crate::artifacts::objects::{OBJECT_ID_LENGTH, SHORT_OID_LENGTH};
use crate::errors::{Error, Result};
use std::io;
use std::path::PathBuf;

/// Content digest identifying an object
///
/// Totally ordered and hashable so it can key maps and sets. Immutable once
/// created; parsing is the only constructor besides hashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate an object id from a string
    ///
    /// Fails with [`Error::InvalidFormat`] unless the input is exactly 40
    /// hexadecimal characters. Uppercase digits are folded to the canonical
    /// lowercase form.
    pub fn try_parse(id: impl Into<String>) -> Result<Self> {
        let id: String = id.into();

        if id.len() != OBJECT_ID_LENGTH {
            return Err(Error::InvalidFormat(format!(
                "object id must be {OBJECT_ID_LENGTH} hex characters, got {}",
                id.len()
            )));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidFormat(format!(
                "object id contains non-hex characters: {id}"
            )));
        }

        Ok(Self(id.to_ascii_lowercase()))
    }

    /// Write the object id in binary format (20 bytes)
    ///
    /// Used when serializing tree entries and commit headers.
    pub fn write_h40_to<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        for i in (0..OBJECT_ID_LENGTH).step_by(2) {
            // Parsing validated the digits, so this cannot fail
            let byte = u8::from_str_radix(&self.0[i..i + 2], 16)
                .map_err(|_| Error::InvalidFormat("invalid hex digit".to_string()))?;
            writer.write_all(&[byte])?;
        }

        Ok(())
    }

    /// Read an object id from binary format (20 bytes)
    pub fn read_h40_from<R: io::Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut bytes = [0u8; OBJECT_ID_LENGTH / 2];
        reader.read_exact(&mut bytes)?;

        let mut hex40 = String::with_capacity(OBJECT_ID_LENGTH);
        for byte in bytes {
            hex40.push_str(&format!("{byte:02x}"));
        }

        Self::try_parse(hex40)
    }

    /// Convert to the loose-object path `XX/YYYY...`
    pub fn to_path(&self) -> PathBuf {
        let (dir, file) = self.0.split_at(2);
        PathBuf::from(dir).join(file)
    }

    /// Abbreviated form, first 7 characters
    ///
    /// Display convenience only; short forms are not unique and must never
    /// be used as lookup keys.
    pub fn to_short_oid(&self) -> String {
        self.short(SHORT_OID_LENGTH)
    }

    /// Abbreviated form of the first `n` characters (capped at full length)
    pub fn short(&self, n: usize) -> String {
        self.0[..n.min(OBJECT_ID_LENGTH)].to_string()
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
