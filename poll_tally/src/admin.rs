//! The editing flows of the administration tool, on top of a `ContentStore`.

use log::{debug, info, warn};

use crate::config::IngestRules;
use crate::ingest::ingest;
use crate::records::*;
use crate::roster::{sort_members, PointerWrite, RosterChain, TOP};
use crate::store::*;

/// A file to upload along with a record.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Upload<'a> {
    pub file_name: &'a str,
    pub content: &'a [u8],
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SaveOutcome {
    Saved(StoredObject),
    /// The record changed since it was loaded and the overwrite was not confirmed.
    Declined,
}

/// Ingests a survey export and stores it as a new poll group, along with the raw export.
pub fn create_poll_group<S: ContentStore + ?Sized>(
    store: &mut S,
    title: &str,
    csv_text: &str,
    rules: &IngestRules,
) -> Result<Stored<PollGroup>, StoreError> {
    let group = PollGroup {
        title: title.to_string(),
        data: ingest(csv_text, rules),
        csv_data: csv_text.to_string(),
    };
    info!(
        "create_poll_group: {:?} with {} polls",
        title,
        group.data.len()
    );
    let obj = store.insert_one(group.to_object()?)?;
    PollGroup::from_stored(&obj)
}

/// Updates a record, unless it was modified by someone else since `loaded_modified_at` and
/// `confirm` refuses to overwrite it.
pub fn save_checked<S, F>(
    store: &mut S,
    id: &str,
    loaded_modified_at: &str,
    patch: ObjectPatch,
    confirm: F,
) -> Result<SaveOutcome, StoreError>
where
    S: ContentStore + ?Sized,
    F: FnOnce(&StoredObject) -> bool,
{
    let current = store.find_one(id)?;
    if current.modified_at != loaded_modified_at {
        warn!(
            "save_checked: {} was modified (loaded {}, now {})",
            id, loaded_modified_at, current.modified_at
        );
        if !confirm(&current) {
            info!("save_checked: overwrite of {} declined", id);
            return Ok(SaveOutcome::Declined);
        }
    }
    let saved = store.update_one(id, patch)?;
    Ok(SaveOutcome::Saved(saved))
}

/// Saves the whole content of a record that was previously loaded.
pub fn save_record<T, S, F>(
    store: &mut S,
    stored: &Stored<T>,
    confirm: F,
) -> Result<SaveOutcome, StoreError>
where
    T: RecordType,
    S: ContentStore + ?Sized,
    F: FnOnce(&StoredObject) -> bool,
{
    let obj = stored.record.to_object()?;
    let patch = ObjectPatch {
        title: Some(obj.title),
        metadata: obj.metadata,
    };
    save_checked(store, &stored.id, &stored.modified_at, patch, confirm)
}

/// Publishes a new article. `today` is the publication date (`YYYY-MM-DD`) unless the post
/// already has one.
pub fn publish_news<S: ContentStore + ?Sized>(
    store: &mut S,
    mut post: NewsPost,
    image: Option<Upload>,
    today: &str,
) -> Result<Stored<NewsPost>, StoreError> {
    if let Some(up) = image {
        post.image = Some(store.upload_media(up.file_name, up.content)?);
    }
    if post.date_published.is_none() {
        post.date_published = Some(today.to_string());
    }
    let obj = store.insert_one(post.to_object()?)?;
    NewsPost::from_stored(&obj)
}

/// Records a question sent by a reader. Blank questions are ignored.
pub fn submit_question<S: ContentStore + ?Sized>(
    store: &mut S,
    text: &str,
) -> Result<Option<Stored<Question>>, StoreError> {
    let title = text.trim();
    if title.is_empty() {
        debug!("submit_question: ignoring a blank question");
        return Ok(None);
    }
    let q = Question {
        title: title.to_string(),
    };
    let obj = store.insert_one(q.to_object()?)?;
    Question::from_stored(&obj).map(Some)
}

/// Edits the roster of the team, keeping the display chain consistent.
///
/// The chain is checked before any write. The writes are then sent one by one; if one of them
/// fails, the error says how many went through and the store is left as is.
pub struct RosterEditor<'a, S: ContentStore + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: ContentStore + ?Sized> RosterEditor<'a, S> {
    pub fn new(store: &'a mut S) -> RosterEditor<'a, S> {
        RosterEditor { store }
    }

    /// The members in display order. A broken chain is displayed in the stored order.
    pub fn members(&self) -> Result<Vec<Stored<TeamMember>>, StoreError> {
        let members = load_all::<TeamMember, S>(&*self.store)?;
        Ok(sort_members(&members))
    }

    fn chain(&self) -> Result<RosterChain, StoreError> {
        let members = load_all::<TeamMember, S>(&*self.store)?;
        Ok(RosterChain::new(&members)?)
    }

    /// Adds a member at the bottom of the list.
    pub fn add_member(
        &mut self,
        mut member: TeamMember,
        photo: Option<Upload>,
    ) -> Result<Stored<TeamMember>, StoreError> {
        let chain = self.chain()?;
        member.id_above = chain.tail();
        if let Some(up) = photo {
            member.photo = Some(self.store.upload_media(up.file_name, up.content)?);
        }
        let obj = self.store.insert_one(member.to_object()?)?;
        info!(
            "add_member: {} ({}) below {}",
            member.name, obj.id, member.id_above
        );
        TeamMember::from_stored(&obj)
    }

    /// Moves a member just below `new_above` (or to the top with `TOP`).
    pub fn move_member(
        &mut self,
        id: &str,
        new_above: &str,
    ) -> Result<Vec<PointerWrite>, StoreError> {
        let mut chain = self.chain()?;
        let writes = chain.move_after(id, new_above)?;
        self.send(&writes, 0, writes.len())?;
        Ok(writes)
    }

    /// Deletes a member. The member below it moves up.
    pub fn delete_member(&mut self, id: &str) -> Result<Vec<PointerWrite>, StoreError> {
        let mut chain = self.chain()?;
        let writes = chain.remove(id)?;
        let total = writes.len() + 1;
        self.store.delete_one(id)?;
        info!("delete_member: deleted {}", id);
        self.send(&writes, 1, total)?;
        Ok(writes)
    }

    /// Rewrites every pointer to follow the current display order. This repairs a broken chain.
    pub fn repair(&mut self) -> Result<Vec<PointerWrite>, StoreError> {
        let members = self.members()?;
        let mut writes: Vec<PointerWrite> = Vec::new();
        let mut prev = TOP.to_string();
        for m in members.iter() {
            if m.record.id_above != prev {
                writes.push(PointerWrite {
                    id: m.id.clone(),
                    id_above: prev.clone(),
                });
            }
            prev = m.id.clone();
        }
        info!("repair: {} pointers to rewrite", writes.len());
        self.send(&writes, 0, writes.len())?;
        Ok(writes)
    }

    fn send(
        &mut self,
        writes: &[PointerWrite],
        already: usize,
        total: usize,
    ) -> Result<(), StoreError> {
        for (idx, w) in writes.iter().enumerate() {
            let patch = ObjectPatch::metadata("id_above", serde_json::json!(w.id_above));
            if let Err(e) = self.store.update_one(&w.id, patch) {
                let applied = already + idx;
                if applied == 0 {
                    return Err(e);
                }
                warn!(
                    "send: roster update stopped after {} of {} writes: {}",
                    applied, total, e
                );
                return Err(StoreError::PartialWrite {
                    applied,
                    total,
                    source: Box::new(e),
                });
            }
            debug!("send: {} now below {}", w.id, w.id_above);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Section;
    use crate::roster::ChainError;

    fn member(name: &str, section: Section) -> TeamMember {
        TeamMember {
            name: name.to_string(),
            club_title: String::new(),
            section,
            photo: None,
            id_above: String::new(),
        }
    }

    fn names(store: &mut MemoryStore) -> Vec<String> {
        RosterEditor::new(store)
            .members()
            .unwrap()
            .iter()
            .map(|m| m.record.name.clone())
            .collect()
    }

    fn roster(store: &mut MemoryStore) -> Vec<String> {
        let mut editor = RosterEditor::new(store);
        let mut ids = Vec::new();
        for n in ["Ann", "Bob", "Cid"] {
            ids.push(editor.add_member(member(n, Section::Staff), None).unwrap().id);
        }
        ids
    }

    /// Rejects every update after a number of successful ones.
    struct FlakyStore {
        inner: MemoryStore,
        updates_left: usize,
    }

    impl ContentStore for FlakyStore {
        fn find(&self, kind: RecordKind) -> Result<Vec<StoredObject>, StoreError> {
            self.inner.find(kind)
        }
        fn find_one(&self, id: &str) -> Result<StoredObject, StoreError> {
            self.inner.find_one(id)
        }
        fn insert_one(&mut self, obj: NewObject) -> Result<StoredObject, StoreError> {
            self.inner.insert_one(obj)
        }
        fn update_one(&mut self, id: &str, patch: ObjectPatch) -> Result<StoredObject, StoreError> {
            if self.updates_left == 0 {
                return Err(StoreError::Backend("connection reset".to_string()));
            }
            self.updates_left -= 1;
            self.inner.update_one(id, patch)
        }
        fn delete_one(&mut self, id: &str) -> Result<(), StoreError> {
            self.inner.delete_one(id)
        }
        fn upload_media(&mut self, file_name: &str, content: &[u8]) -> Result<MediaRef, StoreError> {
            self.inner.upload_media(file_name, content)
        }
    }

    #[test]
    fn poll_group_is_stored_with_raw_export() {
        let mut store = MemoryStore::new();
        let csv = "Timestamp,Rating\nt1,5\nt2,4\n";
        let g = create_poll_group(&mut store, "Spring 2024", csv, &IngestRules::default()).unwrap();
        assert_eq!(g.slug, "spring-2024");
        assert_eq!(g.record.data.len(), 1);
        assert_eq!(g.record.csv_data, csv);
        let raw = store.find_one(&g.id).unwrap();
        let data = raw.metadata["data"].as_str().unwrap();
        assert!(data.starts_with("[\n    {\n        \"question\": \"Rating\""));
    }

    #[test]
    fn concurrent_edit_needs_confirmation() {
        let mut store = MemoryStore::new();
        let mut g = create_poll_group(&mut store, "G", "Q\n1\n", &IngestRules::default()).unwrap();
        store
            .update_one(&g.id, ObjectPatch::metadata("csv_data", serde_json::json!("")))
            .unwrap();

        g.record.add_poll();
        let res = save_record(&mut store, &g, |_| false).unwrap();
        assert_eq!(res, SaveOutcome::Declined);
        let unchanged = load_one::<PollGroup, _>(&store, &g.id).unwrap();
        assert_eq!(unchanged.record.data.len(), 1);

        let res = save_record(&mut store, &g, |_| true).unwrap();
        assert!(matches!(res, SaveOutcome::Saved(_)));
        let saved = load_one::<PollGroup, _>(&store, &g.id).unwrap();
        assert_eq!(saved.record.data.len(), 2);
    }

    #[test]
    fn concurrent_edit_after_reload_needs_confirmation() {
        let mut store = MemoryStore::new();
        let g = create_poll_group(&mut store, "G", "Q\n1\n", &IngestRules::default()).unwrap();
        create_poll_group(&mut store, "H", "Q\n1\n", &IngestRules::default()).unwrap();
        for _ in 0..2 {
            store
                .update_one(&g.id, ObjectPatch::metadata("csv_data", serde_json::json!("Q\n1\n")))
                .unwrap();
        }
        let mut stale = load_one::<PollGroup, _>(&store, &g.id).unwrap();

        let mut reloaded = MemoryStore::from_objects(store.objects().to_vec());
        for _ in 0..2 {
            reloaded
                .update_one(&g.id, ObjectPatch::metadata("csv_data", serde_json::json!("Q\n2\n")))
                .unwrap();
        }

        stale.record.add_poll();
        let mut asked = false;
        let res = save_record(&mut reloaded, &stale, |_| {
            asked = true;
            false
        })
        .unwrap();
        assert!(asked);
        assert_eq!(res, SaveOutcome::Declined);
    }

    #[test]
    fn unchanged_record_saves_without_asking() {
        let mut store = MemoryStore::new();
        let g = create_poll_group(&mut store, "G", "Q\n1\n", &IngestRules::default()).unwrap();
        let res = save_record(&mut store, &g, |_| panic!("should not ask")).unwrap();
        assert!(matches!(res, SaveOutcome::Saved(_)));
    }

    #[test]
    fn news_and_questions() {
        let mut store = MemoryStore::new();
        let post = NewsPost {
            title: "Turnout is up!".to_string(),
            author: "Staff".to_string(),
            content: "Body".to_string(),
            image_caption: String::new(),
            image: None,
            date_published: None,
        };
        let image = Upload {
            file_name: "cover.jpg",
            content: b"jpeg",
        };
        let p = publish_news(&mut store, post, Some(image), "2024-04-01").unwrap();
        assert_eq!(p.slug, "turnout-is-up");
        assert_eq!(p.record.date_published.as_deref(), Some("2024-04-01"));
        assert!(p.record.image.is_some());

        assert_eq!(submit_question(&mut store, "   ").unwrap(), None);
        let q = submit_question(&mut store, "  Who runs the poll? ").unwrap().unwrap();
        assert_eq!(q.record.title, "Who runs the poll?");
    }

    #[test]
    fn add_move_delete() {
        let mut store = MemoryStore::new();
        let ids = roster(&mut store);
        assert_eq!(names(&mut store), vec!["Ann", "Bob", "Cid"]);

        let writes = RosterEditor::new(&mut store)
            .move_member(&ids[1], TOP)
            .unwrap();
        assert_eq!(writes.len(), 3);
        assert_eq!(names(&mut store), vec!["Bob", "Ann", "Cid"]);

        let writes = RosterEditor::new(&mut store)
            .delete_member(&ids[0])
            .unwrap();
        assert_eq!(
            writes,
            vec![PointerWrite {
                id: ids[2].clone(),
                id_above: ids[1].clone()
            }]
        );
        assert_eq!(names(&mut store), vec!["Bob", "Cid"]);
    }

    #[test]
    fn invalid_move_writes_nothing() {
        let mut store = MemoryStore::new();
        let ids = roster(&mut store);
        let before = store.objects().to_vec();
        let res = RosterEditor::new(&mut store).move_member(&ids[0], "nobody");
        assert_eq!(
            res,
            Err(StoreError::Chain(ChainError::UnknownMember("nobody".to_string())))
        );
        assert_eq!(store.objects(), &before[..]);
    }

    #[test]
    fn interrupted_move_is_reported() {
        let mut inner = MemoryStore::new();
        let ids = roster(&mut inner);
        let mut store = FlakyStore {
            inner,
            updates_left: 1,
        };
        let res = RosterEditor::new(&mut store).move_member(&ids[1], TOP);
        match res {
            Err(StoreError::PartialWrite { applied, total, .. }) => {
                assert_eq!(applied, 1);
                assert_eq!(total, 3);
            }
            r => panic!("unexpected result {:?}", r),
        }
    }

    #[test]
    fn repair_broken_chain() {
        let mut store = MemoryStore::new();
        let ids = roster(&mut store);
        // Bob and Cid both claim to be below Ann.
        store
            .update_one(&ids[2], ObjectPatch::metadata("id_above", serde_json::json!(ids[0])))
            .unwrap();
        assert!(matches!(
            RosterEditor::new(&mut store).move_member(&ids[0], TOP),
            Err(StoreError::Chain(_))
        ));
        let writes = RosterEditor::new(&mut store).repair().unwrap();
        assert_eq!(writes.len(), 1);
        let chain = RosterEditor::new(&mut store).chain().unwrap();
        assert_eq!(chain.order(), ids);
    }
}
