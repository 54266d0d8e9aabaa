//! Blob object
//!
//! Blobs store opaque byte payloads (file content). They carry no metadata;
//! names and modes live in the trees that reference them.
//!
//! On disk: `blob <size>\0<content>`

use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object::{Object, Packable};
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::Result;
use bytes::Bytes;
use derive_new::new;
use std::io::{BufRead, Write};

/// Opaque byte payload object
///
/// Each unique payload is stored once, identified by its digest.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Blob {
    content: Bytes,
}

impl Blob {
    pub fn from_bytes(content: impl Into<Bytes>) -> Self {
        Blob {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }
}

impl Packable for Blob {
    fn serialize(&self) -> Result<Bytes> {
        let mut blob_bytes = Vec::new();
        let header = format!("{} {}\0", self.object_type().as_str(), self.content.len());
        blob_bytes.write_all(header.as_bytes())?;
        blob_bytes.write_all(&self.content)?;

        Ok(Bytes::from(blob_bytes))
    }
}

impl Unpackable for Blob {
    fn deserialize(reader: impl BufRead) -> Result<Self> {
        // the header has already been read
        let content = reader
            .bytes()
            .collect::<std::result::Result<Vec<u8>, std::io::Error>>()?;

        Ok(Self::from_bytes(content))
    }
}

impl Object for Blob {
    fn object_type(&self) -> ObjectType {
        ObjectType::Blob
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_equal_content_yields_equal_oid() {
        let left = Blob::from_bytes(&b"same bytes"[..]);
        let right = Blob::from_bytes(b"same bytes".to_vec());

        assert_eq!(left.object_id().unwrap(), right.object_id().unwrap());
    }

    #[test]
    fn test_different_content_yields_different_oid() {
        let left = Blob::from_bytes(&b"one"[..]);
        let right = Blob::from_bytes(&b"two"[..]);

        assert_ne!(left.object_id().unwrap(), right.object_id().unwrap());
    }
}
