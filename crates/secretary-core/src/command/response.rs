//! Tagged results returned for every command.

use std::fmt;

use crate::store::{FieldDef, FieldValue, Item, StoreReport, Tag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Ok,
    /// A user-controlled no-op: declined confirmation, nothing to update.
    Warning,
    /// A business rule rejected the command.
    Error,
    /// A lower layer failed; the message carries the cause.
    Exception,
}

/// An item with its tags and field values, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDetail {
    pub item: Item,
    pub tags: Vec<String>,
    /// Values of encrypted fields are masked unless `revealed`.
    pub fields: Vec<FieldValue>,
    pub revealed: bool,
}

pub const MASK: &str = "********";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    None,
    Message(String),
    Count(i64),
    Tags(Vec<Tag>),
    Fields(Vec<FieldDef>),
    Items(Vec<Item>),
    Detail(Box<ItemDetail>),
    /// The default item after `item use`; `None` clears it.
    Selected(Option<Item>),
    Report(Box<StoreReport>),
    Dump(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub severity: Severity,
    pub payload: Payload,
}

impl Response {
    pub fn ok(payload: Payload) -> Self {
        Self {
            severity: Severity::Ok,
            payload,
        }
    }

    /// OK with a short confirmation message.
    pub fn done(message: impl Into<String>) -> Self {
        Self::ok(Payload::Message(message.into()))
    }

    pub fn empty() -> Self {
        Self::ok(Payload::None)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            payload: Payload::Message(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            payload: Payload::Message(message.into()),
        }
    }

    pub fn exception(context: impl fmt::Display, cause: &dyn std::error::Error) -> Self {
        tracing::debug!(%context, %cause, "command failed");
        Self {
            severity: Severity::Exception,
            payload: Payload::Message(format!("{} - {}", context, cause)),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.severity == Severity::Ok
    }

    pub fn message(&self) -> Option<&str> {
        match &self.payload {
            Payload::Message(message) => Some(message),
            _ => None,
        }
    }
}

fn quantity(f: &mut fmt::Formatter<'_>, count: usize, noun: &str) -> fmt::Result {
    match count {
        0 => write!(f, "no {}s", noun),
        1 => write!(f, "1 {}", noun),
        n => write!(f, "{} {}s", n, noun),
    }
}

/// Plain text for scalar payloads; lists and item details are summarised,
/// since front ends lay those out themselves.
impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::None => Ok(()),
            Payload::Message(message) => f.write_str(message),
            Payload::Count(count) => write!(f, "{}", count),
            Payload::Tags(tags) => quantity(f, tags.len(), "tag"),
            Payload::Fields(fields) => quantity(f, fields.len(), "field"),
            Payload::Items(items) => quantity(f, items.len(), "item"),
            Payload::Detail(detail) => write!(f, "item {} ({})", detail.item.id, detail.item.name),
            Payload::Selected(Some(item)) => write!(f, "using item {} ({})", item.id, item.name),
            Payload::Selected(None) => f.write_str("no item selected"),
            Payload::Report(report) => {
                let counts = &report.counts;
                writeln!(f, "file:      {}", report.path)?;
                writeln!(
                    f,
                    "encrypted: {}",
                    if report.encrypted { "yes" } else { "no" }
                )?;
                writeln!(
                    f,
                    "rows:      {} tags, {} fields, {} items, {} tag links, {} field values",
                    counts.tags, counts.fields, counts.items, counts.item_tags, counts.item_fields
                )?;
                writeln!(f, "checksum:  {}", report.current_checksum)?;
                if report.unchanged() {
                    writeln!(f, "state:     unchanged since last read or write")
                } else {
                    writeln!(f, "state:     modified (saved {})", report.recorded_checksum)
                }
            }
            Payload::Dump(dump) => f.write_str(dump),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Ok => write!(f, "{}", self.payload),
            Severity::Warning => write!(f, "Warning: {}", self.payload),
            Severity::Error => write!(f, "Error: {}", self.payload),
            Severity::Exception => write!(f, "Exception: {}", self.payload),
        }
    }
}
