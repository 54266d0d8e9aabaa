//! Content-addressed object store
//!
//! Append-only storage of immutable objects keyed by the digest of their
//! canonical encoding. Writing identical content twice is idempotent and
//! returns the same id without duplicating storage; no update or delete
//! exists for individual objects.
//!
//! Loose objects live at `<root>/<first-2-hex>/<remaining-38-hex>`,
//! zlib-compressed. Writes go through a temp file followed by an atomic
//! rename, so a reader either sees an object fully present or not at all;
//! concurrent writers of identical content both succeed with the same id.

use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::{Object, ObjectBox, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::{Tree, TreeEntry};
use crate::errors::{Error, Result};
use bytes::Bytes;
use derive_new::new;
use sha1::{Digest, Sha1};
use std::io::{BufRead, Cursor, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, new)]
pub struct ObjectStore {
    path: Box<Path>,
}

impl ObjectStore {
    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    /// Persist an object, returning its content address
    ///
    /// Idempotent: an object that already exists is not rewritten, and the
    /// returned id is identical either way.
    pub fn store(&self, object: &impl Object) -> Result<ObjectId> {
        let object_content = object.serialize()?;

        self.put_bytes(object_content)
    }

    /// Persist raw payload bytes under the given kind
    ///
    /// Computes the canonical encoding `<kind> <len>\0<payload>` and stores
    /// it, returning the computed id.
    pub fn put_raw(&self, kind: ObjectType, payload: &[u8]) -> Result<ObjectId> {
        let mut object_content = Vec::with_capacity(payload.len() + 16);
        let header = format!("{} {}\0", kind.as_str(), payload.len());
        object_content.write_all(header.as_bytes())?;
        object_content.write_all(payload)?;

        self.put_bytes(Bytes::from(object_content))
    }

    fn put_bytes(&self, object_content: Bytes) -> Result<ObjectId> {
        let mut hasher = Sha1::new();
        hasher.update(&object_content);
        let object_id = ObjectId::try_parse(format!("{:x}", hasher.finalize()))?;

        let object_path = self.path.join(object_id.to_path());

        // write the object to disk unless it already exists
        if !object_path.exists() {
            std::fs::create_dir_all(object_path.parent().ok_or_else(|| {
                Error::InvalidFormat(format!("invalid object path {}", object_path.display()))
            })?)?;

            self.write_object(&object_path, object_content)?;
            tracing::trace!(oid = %object_id, "stored object");
        }

        Ok(object_id)
    }

    /// Whether an object with this id exists
    pub fn contains(&self, object_id: &ObjectId) -> bool {
        self.path.join(object_id.to_path()).exists()
    }

    /// Load the decompressed canonical bytes of an object
    pub fn load(&self, object_id: &ObjectId) -> Result<Bytes> {
        let object_path = self.path.join(object_id.to_path());

        self.read_object(object_id, object_path)
    }

    /// Decode an object of any kind
    pub fn parse_object(&self, object_id: &ObjectId) -> Result<ObjectBox> {
        let (object_type, object_reader) = self.parse_object_as_bytes(object_id)?;

        let parsed = match object_type {
            ObjectType::Blob => ObjectBox::Blob(Box::new(Blob::deserialize(object_reader)?)),
            ObjectType::Tree => ObjectBox::Tree(Box::new(Tree::deserialize(object_reader)?)),
            ObjectType::Commit => ObjectBox::Commit(Box::new(Commit::deserialize(object_reader)?)),
        };

        Ok(parsed)
    }

    /// Decode an object that must be a blob
    pub fn parse_blob(&self, object_id: &ObjectId) -> Result<Blob> {
        match self.parse_object(object_id).map_err(|e| e.for_object(object_id))? {
            ObjectBox::Blob(blob) => Ok(*blob),
            other => Err(Error::corrupt(format!(
                "expected blob, found {}",
                other.object_type()
            ))
            .for_object(object_id)),
        }
    }

    /// Decode an object that must be a tree
    pub fn parse_tree(&self, object_id: &ObjectId) -> Result<Tree> {
        match self.parse_object(object_id).map_err(|e| e.for_object(object_id))? {
            ObjectBox::Tree(tree) => Ok(*tree),
            other => Err(Error::corrupt(format!(
                "expected tree, found {}",
                other.object_type()
            ))
            .for_object(object_id)),
        }
    }

    /// Decode an object that must be a commit
    pub fn parse_commit(&self, object_id: &ObjectId) -> Result<Commit> {
        match self.parse_object(object_id).map_err(|e| e.for_object(object_id))? {
            ObjectBox::Commit(commit) => Ok(*commit),
            other => Err(Error::corrupt(format!(
                "expected commit, found {}",
                other.object_type()
            ))
            .for_object(object_id)),
        }
    }

    /// Get the kind of an object without decoding its payload
    pub fn object_type(&self, object_id: &ObjectId) -> Result<ObjectType> {
        let (object_type, _) = self.parse_object_as_bytes(object_id)?;
        Ok(object_type)
    }

    /// Resolve a slash-separated path by descending from a root tree
    ///
    /// Fails with [`Error::PathNotFound`] when any segment is absent and
    /// [`Error::NotADirectory`] when an intermediate segment is not a tree.
    pub fn lookup_path(&self, root_tree: &ObjectId, path: &str) -> Result<TreeEntry> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(Error::PathNotFound(path.to_string()));
        }

        let mut tree = self.parse_tree(root_tree)?;

        for (index, segment) in segments.iter().enumerate() {
            let entry = tree
                .get(segment)
                .ok_or_else(|| Error::PathNotFound(path.to_string()))?
                .clone();

            if index == segments.len() - 1 {
                return Ok(entry);
            }
            if !entry.is_tree() {
                return Err(Error::NotADirectory(segments[..=index].join("/")));
            }
            tree = self.parse_tree(&entry.oid)?;
        }

        unreachable!("loop returns on the final segment")
    }

    fn parse_object_as_bytes(&self, object_id: &ObjectId) -> Result<(ObjectType, impl BufRead)> {
        let object_path = self.path.join(object_id.to_path());
        let object_content = self.read_object(object_id, object_path)?;
        let mut object_reader = Cursor::new(object_content);

        let object_type = ObjectType::parse_object_type(&mut object_reader)
            .map_err(|e| e.for_object(object_id))?;

        Ok((object_type, object_reader))
    }

    fn read_object(&self, object_id: &ObjectId, object_path: PathBuf) -> Result<Bytes> {
        let object_content = std::fs::read(&object_path).map_err(|error| {
            if error.kind() == std::io::ErrorKind::NotFound {
                Error::ObjectNotFound(object_id.clone())
            } else {
                Error::Io(error)
            }
        })?;

        Self::decompress(object_content.into()).map_err(|e| e.for_object(object_id))
    }

    fn write_object(&self, object_path: &Path, object_content: Bytes) -> Result<()> {
        let object_dir = object_path.parent().ok_or_else(|| {
            Error::InvalidFormat(format!("invalid object path {}", object_path.display()))
        })?;
        let temp_object_path = object_dir.join(Self::generate_temp_name());

        let object_content = Self::compress(object_content)?;

        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_object_path)?;

        // rename the temp file onto the object path to make the write
        // atomic; a failure on either step must not leave the temp behind
        let written = file
            .write_all(&object_content)
            .and_then(|()| std::fs::rename(&temp_object_path, object_path));
        if let Err(error) = written {
            let _ = std::fs::remove_file(&temp_object_path);
            return Err(error.into());
        }

        Ok(())
    }

    fn compress(data: Bytes) -> Result<Bytes> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&data)?;

        Ok(encoder.finish()?.into())
    }

    fn decompress(data: Bytes) -> Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(&*data);
        let mut decompressed_content = Vec::new();
        decoder
            .read_to_end(&mut decompressed_content)
            .map_err(|_| Error::corrupt("object is not valid zlib data"))?;

        Ok(decompressed_content.into())
    }

    fn generate_temp_name() -> String {
        format!("tmp-obj-{}", uuid::Uuid::new_v4().simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_write_removes_the_staging_file() {
        let temp_dir = assert_fs::TempDir::new().unwrap();
        let store = ObjectStore::new(temp_dir.path().to_path_buf().into_boxed_path());

        // A directory occupying the target path makes the final rename fail
        let target = temp_dir.path().join("occupied");
        std::fs::create_dir(&target).unwrap();

        let result = store.write_object(&target, Bytes::from_static(b"payload"));
        assert!(result.is_err());

        let staged = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("tmp-obj-")
            })
            .count();
        assert_eq!(staged, 0);
    }
}
