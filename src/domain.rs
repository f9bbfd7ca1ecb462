//! Data model for the scheduling core (§3).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// The location ID that is always present in a normalized snapshot.
pub const DEFAULT_LOCATION_ID: &str = "loc-default";

/// The default subshift ID for legacy single-subshift rows.
pub const DEFAULT_SUBSHIFT_ID: &str = "s1";

/// The join key used everywhere assignments/overrides reference a concrete
/// (section, subshift) shift concept: `<classId>::<subshiftId>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuntimeRowId {
    pub class_id: String,
    pub subshift_id: String,
}

impl RuntimeRowId {
    pub fn new(class_id: impl Into<String>, subshift_id: impl Into<String>) -> Self {
        Self {
            class_id: class_id.into(),
            subshift_id: subshift_id.into(),
        }
    }

    /// Parses `<classId>::<subshiftId>`. A legacy ID without `::` is treated
    /// as `<classId>::s1`.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once("::") {
            Some((class_id, subshift_id)) => Self::new(class_id, subshift_id),
            None => Self::new(raw, DEFAULT_SUBSHIFT_ID),
        }
    }
}

impl fmt::Display for RuntimeRowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class_id, self.subshift_id)
    }
}

impl Serialize for RuntimeRowId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RuntimeRowId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(RuntimeRowId::parse(&raw))
    }
}

/// Key format `<rowId>__<dateISO>`, used as the join key for per-instance
/// count overrides.
pub fn runtime_key(row_id: &RuntimeRowId, date: NaiveDate) -> String {
    format!("{}__{}", row_id, date)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
    Holiday,
}

impl DayType {
    pub fn from_weekday(weekday: chrono::Weekday) -> Self {
        use chrono::Weekday::*;
        match weekday {
            Mon => DayType::Mon,
            Tue => DayType::Tue,
            Wed => DayType::Wed,
            Thu => DayType::Thu,
            Fri => DayType::Fri,
            Sat => DayType::Sat,
            Sun => DayType::Sun,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    Mandatory,
    Preferred,
}

/// A per-day-type preferred (or mandatory) working window, in minutes
/// since midnight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferredWindow {
    pub day_type: DayType,
    pub start_min: u32,
    pub end_min: u32,
    pub kind: WindowKind,
}

/// An inclusive, closed date range (`start <= end`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clinician {
    pub id: String,
    pub name: String,
    pub qualified_class_ids: HashSet<String>,
    /// Ordered; rank = index (lower index = stronger preference).
    pub preferred_class_ids: Vec<String>,
    /// Ordered by start, non-overlapping by convention of the source data.
    pub vacations: Vec<DateRange>,
    pub working_hours_per_week: Option<f64>,
    pub working_hours_tolerance_hours: Option<f64>,
    pub preferred_windows: Vec<PreferredWindow>,
}

impl Clinician {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            qualified_class_ids: HashSet::new(),
            preferred_class_ids: Vec::new(),
            vacations: Vec::new(),
            working_hours_per_week: None,
            working_hours_tolerance_hours: None,
            preferred_windows: Vec::new(),
        }
    }

    pub fn with_qualifications(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.qualified_class_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_preference_order(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.preferred_class_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_vacation(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.vacations.push(DateRange { start, end });
        self
    }

    pub fn with_target_hours(mut self, hours_per_week: f64) -> Self {
        self.working_hours_per_week = Some(hours_per_week);
        self
    }

    pub fn tolerance_hours(&self) -> f64 {
        self.working_hours_tolerance_hours.unwrap_or(5.0)
    }

    pub fn is_on_vacation(&self, date: NaiveDate) -> bool {
        self.vacations.iter().any(|v| v.contains(date))
    }

    /// Invariant check for §3: preferred IDs must be a subset of qualified
    /// IDs, and vacation ranges must have `start <= end`.
    pub fn validate(&self) -> Result<(), String> {
        for id in &self.preferred_class_ids {
            if !self.qualified_class_ids.contains(id) {
                return Err(format!(
                    "clinician {} prefers unqualified section {}",
                    self.id, id
                ));
            }
        }
        for v in &self.vacations {
            if v.start > v.end {
                return Err(format!(
                    "clinician {} has an inverted vacation range {}..{}",
                    self.id, v.start, v.end
                ));
            }
        }
        Ok(())
    }

    /// Lower index = larger reward, per §4.D S5.
    pub fn preference_rank(&self, class_id: &str) -> Option<usize> {
        self.preferred_class_ids.iter().position(|id| id == class_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Class,
    Pool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubShift {
    pub id: String,
    pub ordinal: u8,
    pub name: String,
    pub nominal_hours: f64,
}

impl SubShift {
    pub fn new(id: impl Into<String>, ordinal: u8, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ordinal,
            name: name.into(),
            nominal_hours: 8.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub name: String,
    pub kind: SectionKind,
    pub location_id: String,
    /// 1-3 subshifts, ordinal-ordered.
    pub subshifts: Vec<SubShift>,
}

impl Section {
    pub fn is_pool(&self) -> bool {
        self.kind == SectionKind::Pool
    }
}

/// A weekly-template slot: location, row/col band, and the section it
/// staffs, before projection onto a calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSlot {
    pub location_id: String,
    pub row_band: String,
    pub day_type: DayType,
    pub class_id: String,
    pub subshift_id: String,
    pub required_count: u32,
    pub start_min: u32,
    pub end_min: u32,
    pub end_day_offset: u8,
}

impl TemplateSlot {
    pub fn row_id(&self) -> RuntimeRowId {
        RuntimeRowId::new(self.class_id.clone(), self.subshift_id.clone())
    }

    pub fn interval(&self) -> crate::time::Interval {
        crate::time::Interval::from_minutes(self.start_min, self.end_min, self.end_day_offset)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}

/// A materialized assignment of a clinician to a runtime row on a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub clinician_id: String,
    pub row_id: RuntimeRowId,
    pub date: NaiveDate,
    #[serde(default)]
    pub manual: bool,
}

impl Assignment {
    /// `a-<row>-<date>-<clinician>-<seq>`, per §3.
    pub fn canonical_id(row_id: &RuntimeRowId, date: NaiveDate, clinician_id: &str, seq: u32) -> String {
        format!("a-{}-{}-{}-{}", row_id, date, clinician_id, seq)
    }
}
