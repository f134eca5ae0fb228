use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const LIST_ID_PREFIX: &str = "LST";
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_TAG_LEN: usize = 50;
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Who may read a list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    Private,
    Public,
}

impl Visibility {
    pub fn as_i16(self) -> i16 {
        match self {
            Visibility::Private => 0,
            Visibility::Public => 1,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Visibility::Private),
            1 => Some(Visibility::Public),
            _ => None,
        }
    }
}

/// Only active lists show up in listing queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListStatus {
    Archived,
    Active,
}

impl ListStatus {
    pub fn as_i16(self) -> i16 {
        match self {
            ListStatus::Archived => 0,
            ListStatus::Active => 1,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(ListStatus::Archived),
            1 => Some(ListStatus::Active),
            _ => None,
        }
    }
}

/// A user-curated, named collection of films
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmList {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub tag: String,
    pub visibility: Visibility,
    pub status: ListStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FilmList {
    pub fn is_visible_to(&self, viewer_id: Option<&str>) -> bool {
        match self.visibility {
            Visibility::Public => true,
            Visibility::Private => viewer_id == Some(self.owner_id.as_str()),
        }
    }
}

/// Composite identity of a membership row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MembershipKey {
    pub list_id: String,
    pub film_id: String,
}

impl MembershipKey {
    pub fn new(list_id: impl Into<String>, film_id: impl Into<String>) -> Self {
        Self {
            list_id: list_id.into(),
            film_id: film_id.into(),
        }
    }
}

/// One film inside one list; owned by the list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListMembership {
    pub key: MembershipKey,
    /// Copied from the owning list
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of inserting a membership row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipInsert {
    Inserted,
    AlreadyMember,
}

/// Request to create a list
#[derive(Debug, Clone, Deserialize)]
pub struct NewList {
    pub name: String,
    pub tag: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewList {
    /// Trims name and tag and checks every bound
    pub fn validated(self) -> AppResult<Self> {
        let name = required_field("name", &self.name, MAX_NAME_LEN)?;
        let tag = required_field("tag", &self.tag, MAX_TAG_LEN)?;
        if let Some(description) = &self.description {
            check_len("description", description, MAX_DESCRIPTION_LEN)?;
        }

        Ok(Self {
            name,
            tag,
            visibility: self.visibility,
            description: self.description,
        })
    }
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListPatch {
    /// Blank values are ignored
    pub name: Option<String>,
    /// Blank values are ignored
    pub tag: Option<String>,
    pub visibility: Option<Visibility>,
    /// Set verbatim when present, empty string included
    pub description: Option<String>,
}

impl ListPatch {
    /// Trims name and tag, drops blank ones, and checks every bound
    ///
    /// The result carries only the fields that should be written.
    pub fn validated(self) -> AppResult<Self> {
        let name = optional_field("name", self.name, MAX_NAME_LEN)?;
        let tag = optional_field("tag", self.tag, MAX_TAG_LEN)?;
        if let Some(description) = &self.description {
            check_len("description", description, MAX_DESCRIPTION_LEN)?;
        }

        Ok(Self {
            name,
            tag,
            visibility: self.visibility,
            description: self.description,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.tag.is_none()
            && self.visibility.is_none()
            && self.description.is_none()
    }

    /// Applies present fields to `list` and returns the names of the fields that changed.
    ///
    /// Every present value is validated before anything is written, so a failing
    /// patch leaves `list` untouched.
    pub fn apply(&self, list: &mut FilmList) -> AppResult<Vec<&'static str>> {
        let name = match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                check_len("name", name, MAX_NAME_LEN)?;
                Some(name.to_string())
            }
            _ => None,
        };
        let tag = match self.tag.as_deref().map(str::trim) {
            Some(tag) if !tag.is_empty() => {
                check_len("tag", tag, MAX_TAG_LEN)?;
                Some(tag.to_string())
            }
            _ => None,
        };
        if let Some(description) = &self.description {
            check_len("description", description, MAX_DESCRIPTION_LEN)?;
        }

        let mut changed = Vec::new();
        if let Some(name) = name {
            if list.name != name {
                list.name = name;
                changed.push("name");
            }
        }
        if let Some(tag) = tag {
            if list.tag != tag {
                list.tag = tag;
                changed.push("tag");
            }
        }
        if let Some(visibility) = self.visibility {
            if list.visibility != visibility {
                list.visibility = visibility;
                changed.push("visibility");
            }
        }
        if let Some(description) = &self.description {
            if list.description.as_deref() != Some(description.as_str()) {
                list.description = Some(description.clone());
                changed.push("description");
            }
        }

        Ok(changed)
    }
}

fn required_field(field: &str, value: &str, max: usize) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(format!("List {} is required", field)));
    }
    check_len(field, trimmed, max)?;
    Ok(trimmed.to_string())
}

fn optional_field(field: &str, value: Option<String>, max: usize) -> AppResult<Option<String>> {
    match value.as_deref().map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => {
            check_len(field, trimmed, max)?;
            Ok(Some(trimmed.to_string()))
        }
        _ => Ok(None),
    }
}

fn check_len(field: &str, value: &str, max: usize) -> AppResult<()> {
    if value.chars().count() > max {
        return Err(AppError::InvalidInput(format!(
            "List {} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}
