//! Data models.

use std::collections::BTreeSet;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A registered vessel
///
/// `uuid` is assigned by the backend on creation and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Vessel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub name: String,
    pub width: f64,
    pub length: f64,
    pub draft: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_position: Option<LastSeenPosition>,
}

impl Vessel {
    pub fn new(name: impl Into<String>, width: f64, length: f64, draft: f64) -> Self {
        Self {
            uuid: None,
            name: name.into(),
            width,
            length,
            draft,
            last_seen_position: None,
        }
    }

    /// Whether `other` refers to the same persisted record
    pub fn same_identity(&self, other: &Vessel) -> bool {
        matches!((&self.uuid, &other.uuid), (Some(a), Some(b)) if a == b)
    }

    /// Prepare for editing: derive display dates from persisted times
    pub fn derive_dates(&mut self) {
        if let Some(position) = self.last_seen_position.as_mut() {
            position.derive_date();
        }
    }

    /// Prepare for saving: fold edited dates back into persisted times
    pub fn commit_dates(&mut self) {
        if let Some(position) = self.last_seen_position.as_mut() {
            position.commit_date();
        }
    }
}

/// Last known position of a vessel
///
/// `time` (milliseconds from Unix epoch) is the persisted form. `date` is the
/// same instant held while editing and is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LastSeenPosition {
    pub location: [f64; 2],
    pub time: i64,
    #[serde(skip)]
    pub date: Option<DateTime<Utc>>,
}

impl LastSeenPosition {
    /// Position at the origin, stamped with the current minute
    pub fn now() -> Self {
        let now = Utc::now();
        let date = now.duration_trunc(TimeDelta::minutes(1)).unwrap_or(now);
        Self {
            location: [0.0, 0.0],
            time: date.timestamp_millis(),
            date: Some(date),
        }
    }

    pub fn derive_date(&mut self) {
        self.date = DateTime::from_timestamp_millis(self.time);
    }

    pub fn commit_date(&mut self) {
        if let Some(date) = self.date.take() {
            self.time = date.timestamp_millis();
        }
    }
}

/// Fields of the vessel form that take part in searches
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Width,
    Length,
    Draft,
}

impl Field {
    /// Key of the field in backend documents
    pub fn key(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Width => "width",
            Field::Length => "length",
            Field::Draft => "draft",
        }
    }
}

/// Snapshot of the search/create form
///
/// Keeps the values together with the set of fields the user actually
/// touched, so searches never pick up untouched initial values.
#[derive(Debug, Clone, PartialEq)]
pub struct VesselForm {
    pub name: String,
    pub width: f64,
    pub length: f64,
    pub draft: f64,
    touched: BTreeSet<Field>,
}

impl Default for VesselForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            width: 10.0,
            length: 50.0,
            draft: 10.0,
            touched: BTreeSet::new(),
        }
    }
}

impl VesselForm {
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self.touched.insert(Field::Name);
        self
    }

    pub fn set_width(&mut self, width: f64) -> &mut Self {
        self.width = width;
        self.touched.insert(Field::Width);
        self
    }

    pub fn set_length(&mut self, length: f64) -> &mut Self {
        self.length = length;
        self.touched.insert(Field::Length);
        self
    }

    pub fn set_draft(&mut self, draft: f64) -> &mut Self {
        self.draft = draft;
        self.touched.insert(Field::Draft);
        self
    }

    pub fn is_dirty(&self) -> bool {
        !self.touched.is_empty()
    }

    pub fn set_pristine(&mut self) {
        self.touched.clear();
    }

    /// Text value of a field, if it was touched and is not empty
    pub fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Name if self.touched.contains(&field) && !self.name.is_empty() => {
                Some(self.name.as_str())
            }
            _ => None,
        }
    }

    /// Numeric value of a field, if it was touched and is non-zero
    pub fn number(&self, field: Field) -> Option<f64> {
        if !self.touched.contains(&field) {
            return None;
        }
        let value = match field {
            Field::Name => return None,
            Field::Width => self.width,
            Field::Length => self.length,
            Field::Draft => self.draft,
        };
        (value != 0.0 && !value.is_nan()).then_some(value)
    }

    /// Check the form can describe a new vessel
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Vessel name is required".to_string());
        }
        for (field, value) in [
            (Field::Width, self.width),
            (Field::Length, self.length),
            (Field::Draft, self.draft),
        ] {
            if !(value > 0.0) {
                return Err(format!("Vessel {} must be positive", field.key()));
            }
        }
        Ok(())
    }

    /// Draft vessel built from the current values
    pub fn to_vessel(&self) -> Vessel {
        Vessel::new(self.name.clone(), self.width, self.length, self.draft)
    }
}
