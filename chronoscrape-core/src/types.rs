use crate::error::ConfigError;
use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Number of items requested per archive page.
pub const PAGE_SIZE: usize = 500;

/// A post exactly as the archive returned it. Field order is preserved.
pub type Item = Map<String, Value>;

/// Live submissions keyed by fullname (`t3_<id>`).
pub type LiveIndex = HashMap<String, LiveSubmission>;

/// Inclusive window of epoch seconds.
///
/// `start` is midnight UTC of the first day and `end` is 23:59:59 UTC of the
/// last day, so every post made on the end date falls inside the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: i64,
    pub end: i64,
}

impl DateRange {
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::ValidationFailed {
                reason: format!("start date {} is after end date {}", start, end),
            });
        }

        let next_day = end.succ_opt().ok_or_else(|| ConfigError::ValidationFailed {
            reason: format!("end date {} is out of range", end),
        })?;

        Ok(Self {
            start: start.and_time(NaiveTime::MIN).and_utc().timestamp(),
            end: next_day.and_time(NaiveTime::MIN).and_utc().timestamp() - 1,
        })
    }

    pub fn start_date(&self) -> NaiveDate {
        date_of(self.start)
    }

    pub fn end_date(&self) -> NaiveDate {
        date_of(self.end)
    }
}

fn date_of(epoch: i64) -> NaiveDate {
    DateTime::from_timestamp(epoch, 0)
        .map(|dt| dt.date_naive())
        .unwrap_or_default()
}

pub fn parse_date(value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ConfigError::InvalidDate {
        value: value.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction '{}', use asc or desc", other)),
        }
    }
}

/// The live view of a submission, as returned by Reddit's info endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSubmission {
    pub id: String,
    pub name: String,
    pub locked: Option<bool>,
    pub num_comments: Option<i64>,
    pub num_crossposts: Option<i64>,
    pub over_18: Option<bool>,
    pub pinned: Option<bool>,
    pub score: Option<i64>,
    pub selftext: Option<String>,
    pub spoiler: Option<bool>,
    pub stickied: Option<bool>,
    pub subreddit_subscribers: Option<i64>,
}

/// A field whose archived value goes stale and can be refreshed live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolatileField {
    Locked,
    NumComments,
    NumCrossposts,
    Over18,
    Pinned,
    Score,
    Selftext,
    Spoiler,
    Stickied,
    SubredditSubscribers,
}

impl VolatileField {
    pub const ALL: [VolatileField; 10] = [
        VolatileField::Locked,
        VolatileField::NumComments,
        VolatileField::NumCrossposts,
        VolatileField::Over18,
        VolatileField::Pinned,
        VolatileField::Score,
        VolatileField::Selftext,
        VolatileField::Spoiler,
        VolatileField::Stickied,
        VolatileField::SubredditSubscribers,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            VolatileField::Locked => "locked",
            VolatileField::NumComments => "num_comments",
            VolatileField::NumCrossposts => "num_crossposts",
            VolatileField::Over18 => "over_18",
            VolatileField::Pinned => "pinned",
            VolatileField::Score => "score",
            VolatileField::Selftext => "selftext",
            VolatileField::Spoiler => "spoiler",
            VolatileField::Stickied => "stickied",
            VolatileField::SubredditSubscribers => "subreddit_subscribers",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    /// Reads this field from a live submission. Absent values become `null`.
    pub fn read(&self, live: &LiveSubmission) -> Value {
        let value = match self {
            VolatileField::Locked => live.locked.map(Value::from),
            VolatileField::NumComments => live.num_comments.map(Value::from),
            VolatileField::NumCrossposts => live.num_crossposts.map(Value::from),
            VolatileField::Over18 => live.over_18.map(Value::from),
            VolatileField::Pinned => live.pinned.map(Value::from),
            VolatileField::Score => live.score.map(Value::from),
            VolatileField::Selftext => live.selftext.clone().map(Value::from),
            VolatileField::Spoiler => live.spoiler.map(Value::from),
            VolatileField::Stickied => live.stickied.map(Value::from),
            VolatileField::SubredditSubscribers => live.subreddit_subscribers.map(Value::from),
        };
        value.unwrap_or(Value::Null)
    }
}

/// The set of fields refreshed during enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolatileFields(Vec<VolatileField>);

impl VolatileFields {
    pub fn new(fields: impl IntoIterator<Item = VolatileField>) -> Self {
        let mut seen = HashSet::new();
        Self(fields.into_iter().filter(|f| seen.insert(*f)).collect())
    }

    pub fn from_names<I, S>(names: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut fields = Vec::new();
        for name in names {
            let name = name.as_ref();
            let field =
                VolatileField::from_name(name).ok_or_else(|| ConfigError::ValidationFailed {
                    reason: format!("'{}' is not a refreshable field", name),
                })?;
            fields.push(field);
        }
        Ok(Self::new(fields))
    }

    pub fn iter(&self) -> impl Iterator<Item = &VolatileField> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for VolatileFields {
    fn default() -> Self {
        Self::new(VolatileField::ALL)
    }
}

/// Ordered set of field names to keep from each post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWhitelist(Vec<String>);

impl FieldWhitelist {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let fields = fields
            .into_iter()
            .map(Into::into)
            .map(|f: String| f.trim().to_string())
            .filter(|f| !f.is_empty() && seen.insert(f.clone()))
            .collect();
        Self(fields)
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
