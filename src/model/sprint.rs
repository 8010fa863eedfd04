use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ModelError;

pub type SprintId = Uuid;

/// One closed, contiguous segment of the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: SprintId,
    pub name: String,
    pub start: NaiveDate,
    /// Inclusive: `start + duration_days - 1`.
    pub end: NaiveDate,
    pub duration_days: i64,
    pub sort_index: i64,
}

impl Sprint {
    pub fn new(name: impl Into<String>, start: NaiveDate, duration_days: i64) -> Self {
        let duration_days = duration_days.max(1);
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            start,
            end: end_for(start, duration_days),
            duration_days,
            sort_index: 0,
        }
    }

    fn shift(&mut self, days: i64) {
        self.start += Duration::days(days);
        self.end = end_for(self.start, self.duration_days);
    }
}

/// Which date of a sprint a direct edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateField {
    Start,
    End,
}

fn end_for(start: NaiveDate, duration_days: i64) -> NaiveDate {
    start + Duration::days(duration_days - 1)
}

fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// The ordered sprint sequence. Every successful edit leaves it gapless and
/// non-overlapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline {
    sprints: Vec<Sprint>,
}

impl Timeline {
    pub fn from_sprints(mut sprints: Vec<Sprint>) -> Self {
        sprints.sort_by_key(|s| s.sort_index);
        Self { sprints }
    }

    /// Build `count` back-to-back sprints of equal length starting at `start`.
    pub fn with_cadence(start: NaiveDate, count: usize, duration_days: i64) -> Self {
        let mut timeline = Self::default();
        for i in 0..count {
            timeline.append_sprint(format!("Sprint {}", i + 1), duration_days, start);
        }
        timeline
    }

    pub fn sprints(&self) -> &[Sprint] {
        &self.sprints
    }

    pub fn len(&self) -> usize {
        self.sprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprints.is_empty()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.sprints.len().checked_sub(1)
    }

    pub fn index_of(&self, id: SprintId) -> Option<usize> {
        self.sprints.iter().position(|s| s.id == id)
    }

    pub fn get(&self, idx: usize) -> Option<&Sprint> {
        self.sprints.get(idx)
    }

    pub fn find(&self, id: SprintId) -> Option<&Sprint> {
        self.sprints.iter().find(|s| s.id == id)
    }

    pub fn id_at(&self, idx: usize) -> Option<SprintId> {
        self.sprints.get(idx).map(|s| s.id)
    }

    /// Change a sprint's duration by `delta_days` (floored at one day) and
    /// push every later sprint by the same amount. Returns `false` for an
    /// unknown sprint.
    pub fn resize_sprint(&mut self, id: SprintId, delta_days: i64) -> bool {
        let Some(idx) = self.index_of(id) else {
            debug!(%id, "resize of unknown sprint ignored");
            return false;
        };
        let sprint = &mut self.sprints[idx];
        let old = sprint.duration_days;
        sprint.duration_days = (old + delta_days).max(1);
        sprint.end = end_for(sprint.start, sprint.duration_days);
        let shift = sprint.duration_days - old;
        self.cascade_from(idx + 1, shift);
        info!(%id, old, new = old + shift, "sprint resized");
        true
    }

    /// Edit one boundary date of a sprint directly.
    ///
    /// Moving the end re-derives the duration and cascades later sprints.
    /// Moving the start of any sprint but the first also moves the end of
    /// the sprint before it, so the sequence stays contiguous.
    pub fn set_sprint_date(
        &mut self,
        id: SprintId,
        field: DateField,
        value: NaiveDate,
    ) -> Result<(), ModelError> {
        let idx = self.index_of(id).ok_or(ModelError::UnknownSprint(id))?;
        match field {
            DateField::End => {
                let sprint = &self.sprints[idx];
                let days = inclusive_days(sprint.start, value);
                if days < 1 {
                    return Err(ModelError::InvalidDuration { days });
                }
                let shift = (value - sprint.end).num_days();
                let sprint = &mut self.sprints[idx];
                sprint.end = value;
                sprint.duration_days = days;
                self.cascade_from(idx + 1, shift);
            }
            DateField::Start => {
                let days = inclusive_days(value, self.sprints[idx].end);
                if days < 1 {
                    return Err(ModelError::InvalidDuration { days });
                }
                if idx > 0 {
                    let prev = &self.sprints[idx - 1];
                    let prev_end = value - Duration::days(1);
                    let prev_days = inclusive_days(prev.start, prev_end);
                    if prev_days < 1 {
                        return Err(ModelError::InvalidDuration { days: prev_days });
                    }
                    let prev = &mut self.sprints[idx - 1];
                    prev.end = prev_end;
                    prev.duration_days = prev_days;
                }
                let sprint = &mut self.sprints[idx];
                sprint.start = value;
                sprint.duration_days = days;
            }
        }
        info!(%id, ?field, %value, "sprint date set");
        Ok(())
    }

    /// Add a sprint the day after the last one ends. `anchor` is the start
    /// date used when the timeline is empty.
    pub fn append_sprint(
        &mut self,
        name: impl Into<String>,
        duration_days: i64,
        anchor: NaiveDate,
    ) -> SprintId {
        let (start, sort_index) = match self.sprints.last() {
            Some(last) => (last.end + Duration::days(1), last.sort_index + 1),
            None => (anchor, 0),
        };
        let mut sprint = Sprint::new(name, start, duration_days);
        sprint.sort_index = sort_index;
        let id = sprint.id;
        self.sprints.push(sprint);
        id
    }

    /// Insert an already-built sprint (used when the store echoes a created
    /// sprint back). Keeps `sort_index` order.
    pub fn insert(&mut self, sprint: Sprint) {
        let pos = self
            .sprints
            .iter()
            .position(|s| s.sort_index > sprint.sort_index)
            .unwrap_or(self.sprints.len());
        self.sprints.insert(pos, sprint);
    }

    /// The sprint that should absorb cards of `idx` when it is removed:
    /// the following one, else the preceding one.
    pub fn reassignment_target(&self, idx: usize) -> Option<SprintId> {
        self.sprints
            .get(idx + 1)
            .or_else(|| idx.checked_sub(1).and_then(|i| self.sprints.get(i)))
            .map(|s| s.id)
    }

    /// Remove a sprint without touching the others' dates. Returns the
    /// sprint that should absorb its cards.
    pub fn remove_sprint(&mut self, id: SprintId) -> Result<Option<SprintId>, ModelError> {
        let idx = self.index_of(id).ok_or(ModelError::UnknownSprint(id))?;
        let target = self.reassignment_target(idx);
        self.sprints.remove(idx);
        info!(%id, ?target, "sprint removed");
        Ok(target)
    }

    pub fn rename(&mut self, id: SprintId, name: impl Into<String>) -> Result<(), ModelError> {
        let sprint = self
            .sprints
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(ModelError::UnknownSprint(id))?;
        sprint.name = name.into();
        Ok(())
    }

    /// Overwrite with an authoritative list.
    pub fn replace(&mut self, sprints: Vec<Sprint>) {
        *self = Self::from_sprints(sprints);
    }

    /// Swap a provisional sprint id for the one the store assigned.
    pub(crate) fn adopt(&mut self, provisional: SprintId, sprint: Sprint) {
        match self.sprints.iter_mut().find(|s| s.id == provisional) {
            Some(slot) => *slot = sprint,
            None => self.insert(sprint),
        }
    }

    /// Verify `end = start + duration - 1` for every sprint and that each
    /// sprint starts the day after its predecessor ends.
    pub fn check_contiguity(&self) -> Result<(), String> {
        for (i, s) in self.sprints.iter().enumerate() {
            if s.duration_days < 1 || s.end != end_for(s.start, s.duration_days) {
                return Err(format!(
                    "sprint {i} ({}) spans {}..{} but claims {} day(s)",
                    s.name, s.start, s.end, s.duration_days
                ));
            }
            if let Some(next) = self.sprints.get(i + 1) {
                if next.start != s.end + Duration::days(1) {
                    return Err(format!(
                        "sprint {} starts {} but sprint {i} ends {}",
                        i + 1,
                        next.start,
                        s.end
                    ));
                }
            }
        }
        Ok(())
    }

    fn cascade_from(&mut self, idx: usize, shift: i64) {
        if shift == 0 {
            return;
        }
        for sprint in self.sprints.iter_mut().skip(idx) {
            sprint.shift(shift);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn three_sprints() -> (Timeline, Vec<SprintId>) {
        let t = Timeline::with_cadence(date(1, 1), 3, 14);
        let ids = t.sprints().iter().map(|s| s.id).collect();
        (t, ids)
    }

    #[test]
    fn cadence_is_contiguous() {
        let (t, _) = three_sprints();
        assert_eq!(t.get(0).unwrap().end, date(1, 14));
        assert_eq!(t.get(1).unwrap().start, date(1, 15));
        assert_eq!(t.get(2).unwrap().end, date(2, 11));
        t.check_contiguity().unwrap();
    }

    #[test]
    fn resize_cascades_forward() {
        let (mut t, ids) = three_sprints();
        assert!(t.resize_sprint(ids[0], 3));
        let s = t.sprints();
        assert_eq!((s[0].start, s[0].end), (date(1, 1), date(1, 17)));
        assert_eq!((s[1].start, s[1].end, s[1].duration_days), (date(1, 18), date(1, 31), 14));
        assert_eq!((s[2].start, s[2].end, s[2].duration_days), (date(2, 1), date(2, 14), 14));
    }

    #[test]
    fn resize_floors_at_one_day() {
        let (mut t, ids) = three_sprints();
        assert!(t.resize_sprint(ids[1], -40));
        assert_eq!(t.get(1).unwrap().duration_days, 1);
        assert_eq!(t.get(2).unwrap().start, date(1, 16));
        t.check_contiguity().unwrap();
    }

    #[test]
    fn resize_unknown_is_noop() {
        let (mut t, _) = three_sprints();
        let before = t.clone();
        assert!(!t.resize_sprint(Uuid::new_v4(), 5));
        assert_eq!(t, before);
    }

    #[test]
    fn end_edit_cascades() {
        let (mut t, ids) = three_sprints();
        t.set_sprint_date(ids[1], DateField::End, date(1, 25)).unwrap();
        assert_eq!(t.get(1).unwrap().duration_days, 11);
        assert_eq!(t.get(2).unwrap().start, date(1, 26));
        assert_eq!(t.get(2).unwrap().duration_days, 14);
        t.check_contiguity().unwrap();
    }

    #[test]
    fn start_edit_moves_previous_boundary() {
        let (mut t, ids) = three_sprints();
        t.set_sprint_date(ids[1], DateField::Start, date(1, 10)).unwrap();
        assert_eq!(t.get(0).unwrap().end, date(1, 9));
        assert_eq!(t.get(0).unwrap().duration_days, 9);
        assert_eq!(t.get(1).unwrap().duration_days, 19);
        assert_eq!(t.get(2).unwrap().start, date(1, 29));
        t.check_contiguity().unwrap();
    }

    #[test]
    fn date_edit_rejects_empty_sprint() {
        let (mut t, ids) = three_sprints();
        let before = t.clone();
        let err = t
            .set_sprint_date(ids[0], DateField::End, date(1, 1) - Duration::days(1))
            .unwrap_err();
        assert_eq!(err, ModelError::InvalidDuration { days: 0 });
        assert_eq!(t, before);

        let err = t.set_sprint_date(ids[1], DateField::Start, date(1, 1)).unwrap_err();
        assert_eq!(err, ModelError::InvalidDuration { days: 0 });
        assert_eq!(t, before);
    }

    #[test]
    fn append_follows_last_sprint() {
        let (mut t, _) = three_sprints();
        let id = t.append_sprint("Sprint 4", 7, date(6, 1));
        let s = t.find(id).unwrap();
        assert_eq!(s.start, date(2, 12));
        assert_eq!(s.end, date(2, 18));
        assert_eq!(s.sort_index, 3);
    }

    #[test]
    fn removal_prefers_following_sprint() {
        let (mut t, ids) = three_sprints();
        assert_eq!(t.remove_sprint(ids[1]).unwrap(), Some(ids[2]));
        assert_eq!(t.remove_sprint(ids[2]).unwrap(), Some(ids[0]));
        assert_eq!(t.remove_sprint(ids[0]).unwrap(), None);
        assert!(t.is_empty());
    }
}
