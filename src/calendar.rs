//! Calendar Projector (§4.B): maps dates to day-types and enumerates slot
//! instances for a requested range.

use crate::domain::{runtime_key, DayType, RuntimeRowId};
use crate::state::StateSnapshot;
use crate::time::Interval;
use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone)]
pub struct SlotInstance {
    pub row_id: RuntimeRowId,
    pub date: NaiveDate,
    pub location_id: String,
    pub row_band: String,
    pub required_count: u32,
    pub interval: Interval,
}

pub fn day_type(date: NaiveDate, state: &StateSnapshot) -> DayType {
    if state.holidays.contains(&date) {
        DayType::Holiday
    } else {
        DayType::from_weekday(date.weekday())
    }
}

/// Enumerates slot instances in `[start, end]` (inclusive), ordered by
/// `(dateISO, location, rowBand, subshift)` per §4.B.
pub fn expand_slots(state: &StateSnapshot, start: NaiveDate, end: NaiveDate) -> Vec<SlotInstance> {
    let mut out = Vec::new();
    let mut date = start;
    while date <= end {
        let dt = day_type(date, state);
        for loc_template in &state.weekly_template.locations {
            for slot in &loc_template.slots {
                if slot.day_type != dt {
                    continue;
                }
                let row_id = slot.row_id();
                let floor = min_slots_floor(state, &row_id, dt, slot.required_count);
                let required_count = resolve_required_count(state, &row_id, date, floor);
                out.push(SlotInstance {
                    row_id,
                    date,
                    location_id: slot.location_id.clone(),
                    row_band: slot.row_band.clone(),
                    required_count,
                    interval: slot.interval(),
                });
            }
        }
        date = match date.succ_opt() {
            Some(d) => d,
            None => break,
        };
    }

    out.sort_by(|a, b| {
        (a.date, &a.location_id, &a.row_band, &a.row_id.subshift_id)
            .cmp(&(b.date, &b.location_id, &b.row_band, &b.row_id.subshift_id))
    });
    tracing::debug!(count = out.len(), start = %start, end = %end, "expanded slot instances");
    out
}

/// `minSlotsByRowId` provides a weekday/weekend floor beneath the template's
/// own `requiredCount`; holidays use the weekend floor.
fn min_slots_floor(state: &StateSnapshot, row_id: &RuntimeRowId, day_type: DayType, template_required: u32) -> u32 {
    let floor = state.min_slots_by_row_id.get(row_id).map(|m| {
        if matches!(day_type, DayType::Sat | DayType::Sun | DayType::Holiday) {
            m.weekend
        } else {
            m.weekday
        }
    });
    match floor {
        Some(f) => template_required.max(f),
        None => template_required,
    }
}

/// Applies `slotOverridesByKey`: overrides upward only, zero suppresses,
/// per §4.B; per §9's open-question resolution, the effective count never
/// drops below the number of manual pins already on that (row, date).
fn resolve_required_count(state: &StateSnapshot, row_id: &RuntimeRowId, date: NaiveDate, baseline: u32) -> u32 {
    let key = runtime_key(row_id, date);
    let mut required = baseline;
    if let Some(&override_count) = state.slot_overrides_by_key.get(&key) {
        if override_count <= 0 {
            required = 0;
        } else if override_count as u32 > required {
            required = override_count as u32;
        }
    }

    let pinned_count = state
        .assignments
        .iter()
        .filter(|a| a.manual && &a.row_id == row_id && a.date == date)
        .count() as u32;

    required.max(pinned_count)
}
