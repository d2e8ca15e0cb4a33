// JSON exports of the content store.

use poll_tally::records::StoredObject;
use poll_tally::MemoryStore;

use crate::poll::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum StoreExport {
    Wrapped { objects: Vec<StoredObject> },
    Plain(Vec<StoredObject>),
}

/// Reads an export: either a list of objects or `{"objects": [...]}`.
pub fn read_store(path: &str) -> BPollResult<MemoryStore> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let export: StoreExport =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    let objects = match export {
        StoreExport::Wrapped { objects } => objects,
        StoreExport::Plain(objects) => objects,
    };
    info!("read_store: {} objects from {}", objects.len(), path);
    Ok(MemoryStore::from_objects(objects))
}

pub fn write_store(path: &str, store: &MemoryStore) -> BPollResult<()> {
    let export = StoreExport::Wrapped {
        objects: store.objects().to_vec(),
    };
    let js = serde_json::to_string_pretty(&export).context(ParsingJsonSnafu {})?;
    fs::write(path, js).context(WritingFileSnafu { path })?;
    info!("write_store: {} objects to {}", store.objects().len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_export_shapes() {
        let obj = r#"{"id": "a1", "type": "questions", "title": "Why?", "slug": "why", "modified_at": "1"}"#;
        let plain: StoreExport = serde_json::from_str(&format!("[{}]", obj)).unwrap();
        let wrapped: StoreExport = serde_json::from_str(&format!("{{\"objects\": [{}]}}", obj)).unwrap();
        for export in [plain, wrapped] {
            let objects = match export {
                StoreExport::Wrapped { objects } => objects,
                StoreExport::Plain(objects) => objects,
            };
            assert_eq!(objects.len(), 1);
            assert_eq!(objects[0].title, "Why?");
            assert!(objects[0].metadata.is_empty());
        }
    }
}
