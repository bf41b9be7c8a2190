//! Document snapshot model

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Monotonically increasing revision assigned by the remote store on each write
pub type Revision = u64;

/// Merge function declared by a field: commutative, side-effect free
pub type MergeFn = fn(&FieldValue, &FieldValue) -> Option<FieldValue>;

/// A unique identifier for a document, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Create a new unique document ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

/// Which side a snapshot was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Device-local cache
    Local,
    /// Authoritative remote copy
    Remote,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Remote => "remote",
        })
    }
}

/// Mutable document fields. The set is fixed by the schema and identical on both origins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Title,
    Content,
    Font,
    Icon,
    CoverImage,
    IsFavorite,
}

impl Field {
    /// Every schema field, in schema order
    pub const ALL: [Self; 6] = [
        Self::Title,
        Self::Content,
        Self::Font,
        Self::Icon,
        Self::CoverImage,
        Self::IsFavorite,
    ];

    /// Schema name of the field
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Content => "content",
            Self::Font => "font",
            Self::Icon => "icon",
            Self::CoverImage => "coverImage",
            Self::IsFavorite => "isFavorite",
        }
    }

    /// Merge function declared for this field, if any
    pub fn merge_function(self) -> Option<MergeFn> {
        match self {
            Self::IsFavorite => Some(merge_flags_or),
            _ => None,
        }
    }

    /// Whether the field accepts a `Merged` resolution
    pub fn is_mergeable(self) -> bool {
        self.merge_function().is_some()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = Error;

    /// Accepts the schema name as well as `snake_case` / `kebab-case` spellings
    fn from_str(s: &str) -> Result<Self> {
        let wanted = normalize_field_name(s);
        Self::ALL
            .into_iter()
            .find(|field| normalize_field_name(field.as_str()) == wanted)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown document field: {}", s.trim())))
    }
}

fn normalize_field_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Logical OR; favoriting on either side is kept.
fn merge_flags_or(local: &FieldValue, remote: &FieldValue) -> Option<FieldValue> {
    match (local, remote) {
        (FieldValue::Flag(a), FieldValue::Flag(b)) => Some(FieldValue::Flag(*a || *b)),
        _ => None,
    }
}

/// Value of a single document field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Flag(bool),
    Text(String),
}

impl FieldValue {
    pub const fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Flag(_) => "flag",
            Self::Text(_) => "text",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("(none)"),
            Self::Flag(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Text)
    }
}

/// Typed values of every schema field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFields {
    pub title: String,
    /// Serialized block content; opaque to the sync engine
    pub content: String,
    pub font: String,
    pub icon: Option<String>,
    pub cover_image: Option<String>,
    pub is_favorite: bool,
}

impl Default for DocumentFields {
    fn default() -> Self {
        Self {
            title: "Untitled".to_string(),
            content: String::new(),
            font: "default".to_string(),
            icon: None,
            cover_image: None,
            is_favorite: false,
        }
    }
}

impl DocumentFields {
    /// Read a field as a `FieldValue`
    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Title => FieldValue::Text(self.title.clone()),
            Field::Content => FieldValue::Text(self.content.clone()),
            Field::Font => FieldValue::Text(self.font.clone()),
            Field::Icon => self.icon.clone().into(),
            Field::CoverImage => self.cover_image.clone().into(),
            Field::IsFavorite => FieldValue::Flag(self.is_favorite),
        }
    }

    /// Overwrite a field, rejecting values of the wrong kind
    pub fn set(&mut self, field: Field, value: FieldValue) -> Result<()> {
        match (field, value) {
            (Field::Title, FieldValue::Text(value)) => self.title = value,
            (Field::Content, FieldValue::Text(value)) => self.content = value,
            (Field::Font, FieldValue::Text(value)) => self.font = value,
            (Field::Icon, value @ (FieldValue::Text(_) | FieldValue::Null)) => {
                self.icon = value.as_text().map(str::to_string);
            }
            (Field::CoverImage, value @ (FieldValue::Text(_) | FieldValue::Null)) => {
                self.cover_image = value.as_text().map(str::to_string);
            }
            (Field::IsFavorite, FieldValue::Flag(value)) => self.is_favorite = value,
            (field, value) => {
                return Err(Error::InvalidInput(format!(
                    "Field {field} cannot hold a {} value",
                    value.kind_name()
                )));
            }
        }
        Ok(())
    }
}

/// A versioned view of one document's mutable fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    pub id: DocumentId,
    pub origin: Origin,
    /// Remote revision this snapshot reflects. For local snapshots this is the
    /// revision of the last successful sync; unset on merge results until commit.
    pub revision: Option<Revision>,
    pub fields: DocumentFields,
    /// Per-field logical modification stamps, in the remote revision domain
    #[serde(default)]
    pub modified: BTreeMap<Field, Revision>,
    /// Wall-clock time of the last change (Unix ms), for display only
    pub updated_at: i64,
}

impl DocumentSnapshot {
    /// Create an unversioned snapshot with every field unstamped
    pub fn new(id: DocumentId, origin: Origin, fields: DocumentFields) -> Self {
        Self {
            id,
            origin,
            revision: None,
            fields,
            modified: BTreeMap::new(),
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn value(&self, field: Field) -> FieldValue {
        self.fields.get(field)
    }

    /// Logical stamp of the last change to `field` (0 when never stamped)
    pub fn stamp(&self, field: Field) -> Revision {
        self.modified.get(&field).copied().unwrap_or(0)
    }

    pub fn base_revision(&self) -> Revision {
        self.revision.unwrap_or(0)
    }

    /// Apply a user edit, stamping the field as changed since the base revision.
    ///
    /// Returns `false` when the value is unchanged (nothing is stamped).
    pub fn edit(&mut self, field: Field, value: impl Into<FieldValue>) -> Result<bool> {
        let value = value.into();
        if self.value(field) == value {
            return Ok(false);
        }
        self.fields.set(field, value)?;
        self.modified.insert(field, self.base_revision() + 1);
        self.updated_at = chrono::Utc::now().timestamp_millis();
        Ok(true)
    }

    /// Overwrite a field without touching stamps
    pub fn set_value(&mut self, field: Field, value: FieldValue) -> Result<()> {
        self.fields.set(field, value)
    }

    /// Whether both snapshots hold identical field values
    pub fn same_values(&self, other: &Self) -> bool {
        self.fields == other.fields
    }

    #[must_use]
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Copy whose fields inherit `base`'s stamps where values match, and carry
    /// `changed_stamp` where they differ.
    #[must_use]
    pub fn restamped(&self, base: &Self, changed_stamp: Revision) -> Self {
        let mut snapshot = self.clone();
        snapshot.modified = Field::ALL
            .into_iter()
            .map(|field| {
                let stamp = if self.value(field) == base.value(field) {
                    base.stamp(field)
                } else {
                    changed_stamp
                };
                (field, stamp)
            })
            .collect();
        snapshot
    }

    /// Re-express this snapshot as pending changes on top of `remote`.
    #[must_use]
    pub fn rebased_onto(&self, remote: &Self) -> Self {
        let base = remote.base_revision();
        let mut snapshot = self.restamped(remote, base + 1);
        snapshot.revision = Some(base);
        snapshot
    }

    /// The snapshot as stored after being written on top of `previous` at `revision`.
    #[must_use]
    pub fn committed(&self, previous: &Self, revision: Revision) -> Self {
        let mut snapshot = self.restamped(previous, revision);
        snapshot.revision = Some(revision);
        snapshot
    }
}
