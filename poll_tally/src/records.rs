//! The records kept in the content store, one type per kind of record.
//!
//! The store keeps untyped objects (`StoredObject`) with a free-form metadata map. They are
//! checked when they cross the store boundary: see `RecordType::from_object`.

use serde::{Deserialize, Serialize};
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

use crate::config::PollDefinition;
use crate::roster::Linked;
use crate::store::StoreError;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    #[serde(rename = "news-posts")]
    NewsPost,
    #[serde(rename = "poll-groups")]
    PollGroup,
    #[serde(rename = "team-members")]
    TeamMember,
    #[serde(rename = "questions")]
    Question,
}

impl RecordKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            RecordKind::NewsPost => "news-posts",
            RecordKind::PollGroup => "poll-groups",
            RecordKind::TeamMember => "team-members",
            RecordKind::Question => "questions",
        }
    }
}

/// A reference to an uploaded file.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MediaRef {
    pub name: String,
    pub url: String,
}

/// An object as returned by the content store.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct StoredObject {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub title: String,
    pub slug: String,
    pub modified_at: String,
    #[serde(default)]
    pub metadata: JSMap<String, JSValue>,
}

/// An object to insert.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct NewObject {
    pub kind: RecordKind,
    pub title: String,
    pub metadata: JSMap<String, JSValue>,
}

/// An update: the title is replaced if present, the metadata fields are merged.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ObjectPatch {
    pub title: Option<String>,
    pub metadata: JSMap<String, JSValue>,
}

impl ObjectPatch {
    pub fn metadata(key: &str, value: JSValue) -> ObjectPatch {
        let mut metadata = JSMap::new();
        metadata.insert(key.to_string(), value);
        ObjectPatch {
            title: None,
            metadata,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct NewsPost {
    pub title: String,
    pub author: String,
    pub content: String,
    pub image_caption: String,
    pub image: Option<MediaRef>,
    /// `YYYY-MM-DD`, set when the post is created.
    pub date_published: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PollGroup {
    pub title: String,
    pub data: Vec<PollDefinition>,
    /// The survey export the group was created from.
    pub csv_data: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Executive,
    Staff,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub club_title: String,
    pub section: Section,
    pub photo: Option<MediaRef>,
    pub id_above: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub title: String,
}

/// A record with the bookkeeping information of the store.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Stored<T> {
    pub id: String,
    pub slug: String,
    pub modified_at: String,
    pub record: T,
}

impl Linked for Stored<TeamMember> {
    fn id(&self) -> &str {
        &self.id
    }
    fn id_above(&self) -> &str {
        &self.record.id_above
    }
}

/// All the records, tagged by kind.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Record {
    NewsPost(NewsPost),
    PollGroup(PollGroup),
    TeamMember(TeamMember),
    Question(Question),
}

/// Conversions between a typed record and the objects of the store.
pub trait RecordType: Sized {
    const KIND: RecordKind;

    fn from_object(obj: &StoredObject) -> Result<Self, StoreError>;

    fn to_object(&self) -> Result<NewObject, StoreError>;

    fn from_stored(obj: &StoredObject) -> Result<Stored<Self>, StoreError> {
        if obj.kind != Self::KIND {
            return Err(invalid(
                obj,
                &format!("expected a {}", Self::KIND.type_name()),
            ));
        }
        Ok(Stored {
            id: obj.id.clone(),
            slug: obj.slug.clone(),
            modified_at: obj.modified_at.clone(),
            record: Self::from_object(obj)?,
        })
    }
}

impl Record {
    pub fn from_stored(obj: &StoredObject) -> Result<Record, StoreError> {
        match obj.kind {
            RecordKind::NewsPost => NewsPost::from_object(obj).map(Record::NewsPost),
            RecordKind::PollGroup => PollGroup::from_object(obj).map(Record::PollGroup),
            RecordKind::TeamMember => TeamMember::from_object(obj).map(Record::TeamMember),
            RecordKind::Question => Question::from_object(obj).map(Record::Question),
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Record::NewsPost(_) => RecordKind::NewsPost,
            Record::PollGroup(_) => RecordKind::PollGroup,
            Record::TeamMember(_) => RecordKind::TeamMember,
            Record::Question(_) => RecordKind::Question,
        }
    }
}

fn invalid(obj: &StoredObject, reason: &str) -> StoreError {
    StoreError::InvalidRecord {
        id: obj.id.clone(),
        reason: reason.to_string(),
    }
}

fn read_string(obj: &StoredObject, key: &str) -> Result<String, StoreError> {
    match obj.metadata.get(key) {
        Some(JSValue::String(s)) => Ok(s.clone()),
        Some(JSValue::Null) | None => Ok(String::new()),
        Some(v) => Err(invalid(obj, &format!("field {} is not a string: {}", key, v))),
    }
}

fn read_required(obj: &StoredObject, key: &str) -> Result<String, StoreError> {
    match obj.metadata.get(key) {
        Some(JSValue::String(s)) => Ok(s.clone()),
        _ => Err(invalid(obj, &format!("missing field {}", key))),
    }
}

fn read_media(obj: &StoredObject, key: &str) -> Result<Option<MediaRef>, StoreError> {
    match obj.metadata.get(key) {
        None | Some(JSValue::Null) => Ok(None),
        Some(v) => serde_json::from_value::<MediaRef>(v.clone())
            .map(Some)
            .map_err(|e| invalid(obj, &format!("field {}: {}", key, e))),
    }
}

fn put_media(metadata: &mut JSMap<String, JSValue>, key: &str, media: &Option<MediaRef>) {
    if let Some(m) = media {
        metadata.insert(key.to_string(), serde_json::json!(m));
    }
}

impl RecordType for NewsPost {
    const KIND: RecordKind = RecordKind::NewsPost;

    fn from_object(obj: &StoredObject) -> Result<Self, StoreError> {
        let date_published = read_string(obj, "date_published")?;
        Ok(NewsPost {
            title: obj.title.clone(),
            author: read_string(obj, "author")?,
            content: read_string(obj, "content")?,
            image_caption: read_string(obj, "image_caption")?,
            image: read_media(obj, "image")?,
            date_published: if date_published.is_empty() {
                None
            } else {
                Some(date_published)
            },
        })
    }

    fn to_object(&self) -> Result<NewObject, StoreError> {
        let mut metadata = JSMap::new();
        metadata.insert("author".to_string(), JSValue::from(self.author.clone()));
        metadata.insert(
            "image_caption".to_string(),
            JSValue::from(self.image_caption.clone()),
        );
        metadata.insert("content".to_string(), JSValue::from(self.content.clone()));
        put_media(&mut metadata, "image", &self.image);
        if let Some(d) = &self.date_published {
            metadata.insert("date_published".to_string(), JSValue::from(d.clone()));
        }
        Ok(NewObject {
            kind: Self::KIND,
            title: self.title.clone(),
            metadata,
        })
    }
}

impl RecordType for PollGroup {
    const KIND: RecordKind = RecordKind::PollGroup;

    fn from_object(obj: &StoredObject) -> Result<Self, StoreError> {
        let data_s = read_required(obj, "data")?;
        let data: Vec<PollDefinition> = serde_json::from_str(&data_s)
            .map_err(|e| invalid(obj, &format!("poll data: {}", e)))?;
        Ok(PollGroup {
            title: obj.title.clone(),
            data,
            csv_data: read_string(obj, "csv_data")?,
        })
    }

    fn to_object(&self) -> Result<NewObject, StoreError> {
        let mut metadata = JSMap::new();
        metadata.insert(
            "data".to_string(),
            JSValue::from(crate::store::pretty_json(&self.data)?),
        );
        metadata.insert("csv_data".to_string(), JSValue::from(self.csv_data.clone()));
        Ok(NewObject {
            kind: Self::KIND,
            title: self.title.clone(),
            metadata,
        })
    }
}

impl RecordType for TeamMember {
    const KIND: RecordKind = RecordKind::TeamMember;

    fn from_object(obj: &StoredObject) -> Result<Self, StoreError> {
        // Anything that is not explicitly on the executive board is staff.
        let section = match read_string(obj, "section")?.as_str() {
            "executive" => Section::Executive,
            _ => Section::Staff,
        };
        Ok(TeamMember {
            name: read_required(obj, "name")?,
            club_title: read_string(obj, "club_title")?,
            section,
            photo: read_media(obj, "photo")?,
            id_above: read_required(obj, "id_above")?,
        })
    }

    fn to_object(&self) -> Result<NewObject, StoreError> {
        let mut metadata = JSMap::new();
        metadata.insert("name".to_string(), JSValue::from(self.name.clone()));
        metadata.insert(
            "club_title".to_string(),
            JSValue::from(self.club_title.clone()),
        );
        metadata.insert("section".to_string(), serde_json::json!(self.section));
        metadata.insert("id_above".to_string(), JSValue::from(self.id_above.clone()));
        put_media(&mut metadata, "photo", &self.photo);
        Ok(NewObject {
            kind: Self::KIND,
            title: member_slug(&self.name),
            metadata,
        })
    }
}

impl RecordType for Question {
    const KIND: RecordKind = RecordKind::Question;

    fn from_object(obj: &StoredObject) -> Result<Self, StoreError> {
        Ok(Question {
            title: obj.title.clone(),
        })
    }

    fn to_object(&self) -> Result<NewObject, StoreError> {
        Ok(NewObject {
            kind: Self::KIND,
            title: self.title.clone(),
            metadata: JSMap::new(),
        })
    }
}

// ********* Slugs **********

/// The slug under which a poll group is looked up from its title.
pub fn poll_group_slug(title: &str) -> String {
    title.to_lowercase().split(' ').collect::<Vec<&str>>().join("-")
}

/// Lowercase, every run of characters other than `a-z0-9` becomes a single `-`.
pub fn news_slug(title: &str) -> String {
    let mut res = String::new();
    let mut pending_dash = false;
    for c in title.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !res.is_empty() {
                res.push('-');
            }
            pending_dash = false;
            res.push(c);
        } else {
            pending_dash = true;
        }
    }
    res
}

/// The title of a team member record: the name without the parenthesized class year.
pub fn member_slug(name: &str) -> String {
    let base = name.split(" (").next().unwrap_or("");
    poll_group_slug(base)
}

/// Splits the roster into the executive board and the staff. The staff is listed bottom-up.
pub fn team_sections(
    members: Vec<Stored<TeamMember>>,
) -> (Vec<Stored<TeamMember>>, Vec<Stored<TeamMember>>) {
    let (executives, mut staff): (Vec<_>, Vec<_>) = members
        .into_iter()
        .partition(|m| m.record.section == Section::Executive);
    staff.reverse();
    (executives, staff)
}
