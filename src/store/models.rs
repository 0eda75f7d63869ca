use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Processing state of one downstream stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    /// Any value this service does not know about. Never eligible.
    #[serde(other)]
    Other,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Processing => "processing",
            StageStatus::Completed => "completed",
            StageStatus::Failed => "failed",
            StageStatus::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "pending" => StageStatus::Pending,
            "processing" => StageStatus::Processing,
            "completed" => StageStatus::Completed,
            "failed" => StageStatus::Failed,
            _ => StageStatus::Other,
        }
    }
}

/// Natural key of an audio file record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub device_id: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub recorded_at: DateTime<Utc>,
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.device_id, self.recorded_at.to_rfc3339())
    }
}

/// One row of the audio files table, limited to the columns the janitor reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFileRecord {
    pub device_id: String,

    #[serde(deserialize_with = "deserialize_timestamp")]
    pub recorded_at: DateTime<Utc>,

    /// Storage key of the audio object. May be null or empty.
    #[serde(default)]
    pub file_path: Option<String>,

    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub transcriptions_status: Option<StageStatus>,

    #[serde(default)]
    pub behavior_features_status: Option<StageStatus>,

    #[serde(default)]
    pub emotion_features_status: Option<StageStatus>,

    /// Value of the tombstone column, when the tombstone strategy selects it.
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub tombstoned_at: Option<DateTime<Utc>>,
}

impl AudioFileRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            device_id: self.device_id.clone(),
            recorded_at: self.recorded_at,
        }
    }

    /// The storage key, if it is present and non-empty.
    pub fn storage_key(&self) -> Option<&str> {
        self.file_path.as_deref().filter(|p| !p.is_empty())
    }

    pub fn stage_statuses(&self) -> [Option<StageStatus>; 3] {
        [
            self.transcriptions_status,
            self.behavior_features_status,
            self.emotion_features_status,
        ]
    }
}

/// Parse a timestamp that may or may not carry an offset.
///
/// `timestamptz` columns come back as RFC 3339; plain `timestamp` columns
/// have no offset and are taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(ts) => Ok(ts.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
            .map(|naive| naive.and_utc())
            .map_err(|_| rfc_err),
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}
