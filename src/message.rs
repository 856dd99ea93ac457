use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Server-assigned message identifier.
///
/// The backend hands out integers, but older records may carry string ids;
/// whatever shape arrives is echoed back unchanged in paths and bodies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Number(i64),
    Text(String),
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Number(n) => write!(f, "{}", n),
            MessageId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for MessageId {
    fn from(n: i64) -> Self {
        MessageId::Number(n)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        MessageId::Text(s.to_string())
    }
}

/// One contact-form submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawMessage")]
pub struct Message {
    pub id: MessageId,
    pub name: String,
    pub email: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// None when the server sent no usable date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub read: bool,
}

/// Wire shape. Older rows only carry `submission_date`, and a bad date
/// must not sink the whole list.
#[derive(Deserialize)]
struct RawMessage {
    id: MessageId,
    #[serde(default, deserialize_with = "null_as_default")]
    name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    message: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    submission_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    read: bool,
}

impl From<RawMessage> for Message {
    fn from(raw: RawMessage) -> Self {
        Message {
            id: raw.id,
            name: raw.name,
            email: raw.email,
            message: raw.message,
            subject: raw.subject,
            phone: raw.phone,
            created_at: raw.created_at.or(raw.submission_date),
            read: raw.read,
        }
    }
}

impl Message {
    /// Case-insensitive substring match against name, email and body.
    /// `needle` must already be lowercased.
    pub fn matches_search(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.name.to_lowercase().contains(needle)
            || self.email.to_lowercase().contains(needle)
            || self.message.to_lowercase().contains(needle)
    }

    pub fn status_label(&self) -> &'static str {
        if self.read {
            "Read"
        } else {
            "Unread"
        }
    }

    /// Body shortened for the table: at most `max` characters, then "...".
    pub fn preview(&self, max: usize) -> String {
        let body = self.message.replace(['\r', '\n'], " ");
        if body.chars().count() > max {
            let cut: String = body.chars().take(max).collect();
            format!("{}...", cut)
        } else {
            body
        }
    }

    pub fn date_display(&self) -> String {
        self.created_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn timestamp_display(&self) -> String {
        self.created_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// Read/unread filter applied on top of the search text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Read,
    Unread,
}

impl StatusFilter {
    pub fn admits(self, message: &Message) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Read => message.read,
            StatusFilter::Unread => !message.read,
        }
    }

    /// All -> Unread -> Read -> All, the order the console cycles through.
    pub fn cycle(self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Unread,
            StatusFilter::Unread => StatusFilter::Read,
            StatusFilter::Read => StatusFilter::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Read => "read",
            StatusFilter::Unread => "unread",
        }
    }
}

/// Parse a submission timestamp. Accepts RFC 3339, or a naive ISO-8601
/// timestamp which is taken to be UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Any string that parses, else None. Nulls, numbers and garbage all
/// decode to None rather than failing the record.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw.as_str().and_then(|s| parse_timestamp(s.trim())))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
pub(crate) fn make_message(id: i64, name: &str, body: &str, read: bool) -> Message {
    Message {
        id: MessageId::Number(id),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        message: body.to_string(),
        subject: None,
        phone: None,
        created_at: parse_timestamp("2026-03-01T09:30:00"),
        read,
    }
}
