//! The seam with the hosted content store.
//!
//! `ContentStore` exposes the few calls the admin flows need. `MemoryStore` implements it for
//! tests and for the command line tool, which works on JSON exports of the store.

use std::error::Error;
use std::fmt::Display;

use log::{debug, info};
use serde::Serialize;

use crate::records::*;
use crate::roster::ChainError;

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum StoreError {
    /// The store itself answers with an error when a query matches nothing.
    NotFound(String),
    InvalidRecord {
        id: String,
        reason: String,
    },
    Serialization(String),
    Backend(String),
    Chain(ChainError),
    /// A multi-step update stopped midway. The completed writes are not rolled back.
    PartialWrite {
        applied: usize,
        total: usize,
        source: Box<StoreError>,
    },
}

impl Error for StoreError {}

impl Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(what) => write!(f, "not found: {}", what),
            StoreError::InvalidRecord { id, reason } => {
                write!(f, "invalid record {}: {}", id, reason)
            }
            StoreError::Serialization(msg) => write!(f, "serialization failed: {}", msg),
            StoreError::Backend(msg) => write!(f, "content store error: {}", msg),
            StoreError::Chain(e) => write!(f, "roster: {}", e),
            StoreError::PartialWrite {
                applied,
                total,
                source,
            } => write!(
                f,
                "update interrupted after {} of {} writes: {}",
                applied, total, source
            ),
        }
    }
}

impl From<ChainError> for StoreError {
    fn from(e: ChainError) -> Self {
        StoreError::Chain(e)
    }
}

pub trait ContentStore {
    /// All the objects of one kind. Fails with `NotFound` if there is none.
    fn find(&self, kind: RecordKind) -> Result<Vec<StoredObject>, StoreError>;

    fn find_one(&self, id: &str) -> Result<StoredObject, StoreError>;

    fn insert_one(&mut self, obj: NewObject) -> Result<StoredObject, StoreError>;

    fn update_one(&mut self, id: &str, patch: ObjectPatch) -> Result<StoredObject, StoreError>;

    fn delete_one(&mut self, id: &str) -> Result<(), StoreError>;

    fn upload_media(&mut self, file_name: &str, content: &[u8]) -> Result<MediaRef, StoreError>;

    fn find_by_slug(&self, kind: RecordKind, slug: &str) -> Result<StoredObject, StoreError> {
        self.find(kind)?
            .into_iter()
            .find(|o| o.slug == slug)
            .ok_or_else(|| StoreError::NotFound(format!("{} {}", kind.type_name(), slug)))
    }
}

/// Same as `find`, but an empty collection is not an error.
pub fn find_or_empty<S: ContentStore + ?Sized>(
    store: &S,
    kind: RecordKind,
) -> Result<Vec<StoredObject>, StoreError> {
    match store.find(kind) {
        Ok(v) => Ok(v),
        Err(StoreError::NotFound(_)) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Loads and checks all the records of one type.
pub fn load_all<T: RecordType, S: ContentStore + ?Sized>(
    store: &S,
) -> Result<Vec<Stored<T>>, StoreError> {
    find_or_empty(store, T::KIND)?
        .iter()
        .map(T::from_stored)
        .collect()
}

pub fn load_one<T: RecordType, S: ContentStore + ?Sized>(
    store: &S,
    id: &str,
) -> Result<Stored<T>, StoreError> {
    T::from_stored(&store.find_one(id)?)
}

/// JSON with an indentation of 4 spaces, the format of the stored poll data.
pub fn pretty_json<T: Serialize>(value: &T) -> Result<String, StoreError> {
    let mut buf: Vec<u8> = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// A content store held in memory.
///
/// Every write stamps the object with a new `modified_at` revision.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Vec<StoredObject>,
    media: Vec<MediaRef>,
    next_id: u64,
    revision: u64,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Loads existing objects. The revisions continue after the highest stamp found.
    pub fn from_objects(objects: Vec<StoredObject>) -> MemoryStore {
        let revision = objects
            .iter()
            .filter_map(|o| o.modified_at.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            .max(objects.len() as u64);
        MemoryStore {
            next_id: objects.len() as u64,
            objects,
            media: Vec::new(),
            revision,
        }
    }

    pub fn objects(&self) -> &[StoredObject] {
        &self.objects
    }

    pub fn media(&self) -> &[MediaRef] {
        &self.media
    }

    fn next_revision(&mut self) -> String {
        self.revision += 1;
        format!("{:08}", self.revision)
    }

    fn fresh_id(&mut self) -> String {
        loop {
            self.next_id += 1;
            let id = format!("{:024x}", self.next_id);
            if !self.objects.iter().any(|o| o.id == id) {
                return id;
            }
        }
    }

    fn position(&self, id: &str) -> Result<usize, StoreError> {
        self.objects
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("object {}", id)))
    }
}

impl ContentStore for MemoryStore {
    fn find(&self, kind: RecordKind) -> Result<Vec<StoredObject>, StoreError> {
        let res: Vec<StoredObject> = self
            .objects
            .iter()
            .filter(|o| o.kind == kind)
            .cloned()
            .collect();
        if res.is_empty() {
            return Err(StoreError::NotFound(kind.type_name().to_string()));
        }
        Ok(res)
    }

    fn find_one(&self, id: &str) -> Result<StoredObject, StoreError> {
        let pos = self.position(id)?;
        Ok(self.objects[pos].clone())
    }

    fn insert_one(&mut self, obj: NewObject) -> Result<StoredObject, StoreError> {
        let stored = StoredObject {
            id: self.fresh_id(),
            kind: obj.kind,
            slug: news_slug(&obj.title),
            title: obj.title,
            modified_at: self.next_revision(),
            metadata: obj.metadata,
        };
        debug!(
            "insert_one: {} {} ({})",
            stored.kind.type_name(),
            stored.id,
            stored.slug
        );
        self.objects.push(stored.clone());
        Ok(stored)
    }

    fn update_one(&mut self, id: &str, patch: ObjectPatch) -> Result<StoredObject, StoreError> {
        let pos = self.position(id)?;
        let revision = self.next_revision();
        let obj = &mut self.objects[pos];
        if let Some(title) = patch.title {
            obj.title = title;
        }
        for (k, v) in patch.metadata.into_iter() {
            obj.metadata.insert(k, v);
        }
        obj.modified_at = revision;
        debug!("update_one: {} now at revision {}", id, obj.modified_at);
        Ok(obj.clone())
    }

    fn delete_one(&mut self, id: &str) -> Result<(), StoreError> {
        let pos = self.position(id)?;
        self.objects.remove(pos);
        debug!("delete_one: {}", id);
        Ok(())
    }

    fn upload_media(&mut self, file_name: &str, content: &[u8]) -> Result<MediaRef, StoreError> {
        let id = self.fresh_id();
        let media = MediaRef {
            name: format!("{}-{}", id, file_name),
            url: format!("memory://media/{}-{}", id, file_name),
        };
        info!(
            "upload_media: {} ({} bytes) as {}",
            file_name,
            content.len(),
            media.name
        );
        self.media.push(media.clone());
        Ok(media)
    }
}
