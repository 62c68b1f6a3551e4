//! Search predicates: the payload carried by CONDITION leaves.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Message attribute a condition tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SearchField {
    AccountUuid,
    Subject,
    Date,
    Uid,
    Flag,
    Sender,
    To,
    Cc,
    Folder,
    Bcc,
    ReplyTo,
    MessageContents,
    AttachmentCount,
    Deleted,
    ThreadId,
    Id,
    Integrate,
    Read,
    Flagged,
    DisplayClass,
    Searchable,
}

impl SearchField {
    pub const ALL: [SearchField; 21] = [
        SearchField::AccountUuid,
        SearchField::Subject,
        SearchField::Date,
        SearchField::Uid,
        SearchField::Flag,
        SearchField::Sender,
        SearchField::To,
        SearchField::Cc,
        SearchField::Folder,
        SearchField::Bcc,
        SearchField::ReplyTo,
        SearchField::MessageContents,
        SearchField::AttachmentCount,
        SearchField::Deleted,
        SearchField::ThreadId,
        SearchField::Id,
        SearchField::Integrate,
        SearchField::Read,
        SearchField::Flagged,
        SearchField::DisplayClass,
        SearchField::Searchable,
    ];

    /// Persisted identifier, e.g. `SUBJECT`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::AccountUuid => "ACCOUNT_UUID",
            SearchField::Subject => "SUBJECT",
            SearchField::Date => "DATE",
            SearchField::Uid => "UID",
            SearchField::Flag => "FLAG",
            SearchField::Sender => "SENDER",
            SearchField::To => "TO",
            SearchField::Cc => "CC",
            SearchField::Folder => "FOLDER",
            SearchField::Bcc => "BCC",
            SearchField::ReplyTo => "REPLYTO",
            SearchField::MessageContents => "MESSAGE_CONTENTS",
            SearchField::AttachmentCount => "ATTACHMENT_COUNT",
            SearchField::Deleted => "DELETED",
            SearchField::ThreadId => "THREAD_ID",
            SearchField::Id => "ID",
            SearchField::Integrate => "INTEGRATE",
            SearchField::Read => "READ",
            SearchField::Flagged => "FLAGGED",
            SearchField::DisplayClass => "DISPLAY_CLASS",
            SearchField::Searchable => "SEARCHABLE",
        }
    }

    /// Column of the message table the field is matched against.
    pub fn column(&self) -> &'static str {
        match self {
            SearchField::AccountUuid => "account_uuid",
            SearchField::Subject => "subject",
            SearchField::Date => "date",
            SearchField::Uid => "uid",
            SearchField::Flag => "flags",
            SearchField::Sender => "sender_list",
            SearchField::To => "to_list",
            SearchField::Cc => "cc_list",
            SearchField::Folder => "folder_id",
            SearchField::Bcc => "bcc_list",
            SearchField::ReplyTo => "reply_to_list",
            SearchField::MessageContents => "fulltext",
            SearchField::AttachmentCount => "attachment_count",
            SearchField::Deleted => "deleted",
            SearchField::ThreadId => "threads.root",
            SearchField::Id => "id",
            SearchField::Integrate => "integrate",
            SearchField::Read => "read",
            SearchField::Flagged => "flagged",
            SearchField::DisplayClass => "display_class",
            SearchField::Searchable => "searchable",
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SearchField::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| DomainError::UnknownField(s.to_string()))
    }
}

impl TryFrom<String> for SearchField {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SearchField> for String {
    fn from(field: SearchField) -> Self {
        field.as_str().to_string()
    }
}

/// Comparison applied between a field and the operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Attribute {
    Contains,
    NotContains,
    Equals,
    NotEquals,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,
}

impl Attribute {
    pub const ALL: [Attribute; 8] = [
        Attribute::Contains,
        Attribute::NotContains,
        Attribute::Equals,
        Attribute::NotEquals,
        Attribute::StartsWith,
        Attribute::NotStartsWith,
        Attribute::EndsWith,
        Attribute::NotEndsWith,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Contains => "CONTAINS",
            Attribute::NotContains => "NOT_CONTAINS",
            Attribute::Equals => "EQUALS",
            Attribute::NotEquals => "NOT_EQUALS",
            Attribute::StartsWith => "STARTSWITH",
            Attribute::NotStartsWith => "NOT_STARTSWITH",
            Attribute::EndsWith => "ENDSWITH",
            Attribute::NotEndsWith => "NOT_ENDSWITH",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attribute {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::ALL
            .iter()
            .copied()
            .find(|attribute| attribute.as_str() == s)
            .ok_or_else(|| DomainError::UnknownAttribute(s.to_string()))
    }
}

impl TryFrom<String> for Attribute {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Attribute> for String {
    fn from(attribute: Attribute) -> Self {
        attribute.as_str().to_string()
    }
}

/// A single search predicate: `field attribute value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchCondition {
    pub field: SearchField,
    pub attribute: Attribute,
    pub value: String,
}

impl SearchCondition {
    pub fn new(field: SearchField, attribute: Attribute, value: impl Into<String>) -> Self {
        Self {
            field,
            attribute,
            value: value.into(),
        }
    }
}

impl fmt::Display for SearchCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.attribute, self.value)
    }
}

/// Parses `FIELD ATTRIBUTE value`, e.g. `SUBJECT CONTAINS invoice`.
///
/// The value is everything after the attribute, taken verbatim, so it may
/// contain spaces.
impl FromStr for SearchCondition {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let re = Regex::new(r"^\s*([A-Z_]+)\s+([A-Z_]+)\s+(.*)$")
            .map_err(|e| DomainError::InvalidCondition(e.to_string()))?;
        let caps = re
            .captures(s)
            .ok_or_else(|| DomainError::InvalidCondition(s.to_string()))?;

        Ok(Self {
            field: caps[1].parse()?,
            attribute: caps[2].parse()?,
            value: caps[3].to_string(),
        })
    }
}
