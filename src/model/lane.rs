use egui::Color32;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::ModelError;

pub type LaneId = Uuid;

/// A horizontal row of the grid, independent of time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub id: LaneId,
    pub name: String,
    /// Display color for the lane header (stored as RGBA).
    #[serde(with = "color_serde")]
    pub color: Color32,
    pub sort_index: i64,
    /// Stored height, used when the viewer has no session override.
    #[serde(default)]
    pub height: Option<f32>,
}

impl Lane {
    pub fn new(name: impl Into<String>, color: Color32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            color,
            sort_index: 0,
            height: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lanes {
    lanes: Vec<Lane>,
}

impl Lanes {
    pub fn from_lanes(mut lanes: Vec<Lane>) -> Self {
        lanes.sort_by_key(|l| l.sort_index);
        Self { lanes }
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    pub fn find(&self, id: LaneId) -> Option<&Lane> {
        self.lanes.iter().find(|l| l.id == id)
    }

    pub fn index_of(&self, id: LaneId) -> Option<usize> {
        self.lanes.iter().position(|l| l.id == id)
    }

    pub fn ids(&self) -> Vec<LaneId> {
        self.lanes.iter().map(|l| l.id).collect()
    }

    pub fn append(&mut self, name: impl Into<String>, color: Color32) -> LaneId {
        let mut lane = Lane::new(name, color);
        lane.sort_index = self.lanes.last().map_or(0, |l| l.sort_index + 1);
        let id = lane.id;
        self.lanes.push(lane);
        id
    }

    pub fn rename(&mut self, id: LaneId, name: impl Into<String>) -> Result<(), ModelError> {
        let lane = self
            .lanes
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(ModelError::UnknownLane(id))?;
        lane.name = name.into();
        Ok(())
    }

    /// Remove a lane. Its cards are not touched here; see
    /// [`crate::model::Board::remove_lane`].
    pub fn remove(&mut self, id: LaneId) -> Result<Lane, ModelError> {
        let idx = self.index_of(id).ok_or(ModelError::UnknownLane(id))?;
        let lane = self.lanes.remove(idx);
        self.renumber();
        info!(%id, name = %lane.name, "lane removed");
        Ok(lane)
    }

    /// Reorder lanes to match `order`, which must name every lane exactly once.
    pub fn reorder(&mut self, order: &[LaneId]) -> Result<(), ModelError> {
        if order.len() != self.lanes.len() {
            return Err(ModelError::NotAPermutation);
        }
        let mut reordered = Vec::with_capacity(order.len());
        for id in order {
            let idx = self.index_of(*id).ok_or(ModelError::NotAPermutation)?;
            if reordered.iter().any(|l: &Lane| l.id == *id) {
                return Err(ModelError::NotAPermutation);
            }
            reordered.push(self.lanes[idx].clone());
        }
        self.lanes = reordered;
        self.renumber();
        Ok(())
    }

    pub fn replace(&mut self, lanes: Vec<Lane>) {
        *self = Self::from_lanes(lanes);
    }

    pub(crate) fn insert(&mut self, lane: Lane) {
        let pos = self
            .lanes
            .iter()
            .position(|l| l.sort_index > lane.sort_index)
            .unwrap_or(self.lanes.len());
        self.lanes.insert(pos, lane);
    }

    pub(crate) fn adopt(&mut self, provisional: LaneId, lane: Lane) {
        match self.lanes.iter_mut().find(|l| l.id == provisional) {
            Some(slot) => *slot = lane,
            None => self.insert(lane),
        }
    }

    fn renumber(&mut self) {
        for (i, lane) in self.lanes.iter_mut().enumerate() {
            lane.sort_index = i as i64;
        }
    }
}

/// Serde helper for `Color32`.
pub(crate) mod color_serde {
    use egui::Color32;
    use serde::{self, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(color: &Color32, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let rgba = [color.r(), color.g(), color.b(), color.a()];
        rgba.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Color32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let rgba: [u8; 4] = Deserialize::deserialize(deserializer)?;
        Ok(Color32::from_rgba_premultiplied(
            rgba[0], rgba[1], rgba[2], rgba[3],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lanes() -> (Lanes, Vec<LaneId>) {
        let mut lanes = Lanes::default();
        let ids = ["Platform", "Mobile", "Growth"]
            .into_iter()
            .map(|n| lanes.append(n, Color32::GRAY))
            .collect();
        (lanes, ids)
    }

    #[test]
    fn reorder_accepts_permutation_only() {
        let (mut l, ids) = lanes();
        l.reorder(&[ids[2], ids[0], ids[1]]).unwrap();
        assert_eq!(l.ids(), vec![ids[2], ids[0], ids[1]]);
        assert_eq!(l.lanes()[0].sort_index, 0);

        assert_eq!(l.reorder(&[ids[0], ids[0], ids[1]]), Err(ModelError::NotAPermutation));
        assert_eq!(l.reorder(&[ids[0]]), Err(ModelError::NotAPermutation));
        assert_eq!(l.ids(), vec![ids[2], ids[0], ids[1]]);
    }

    #[test]
    fn rename_and_remove() {
        let (mut l, ids) = lanes();
        l.rename(ids[1], "Apps").unwrap();
        assert_eq!(l.find(ids[1]).unwrap().name, "Apps");
        let removed = l.remove(ids[0]).unwrap();
        assert_eq!(removed.name, "Platform");
        assert_eq!(l.len(), 2);
        assert!(l.remove(ids[0]).is_err());
    }

    #[test]
    fn color_roundtrips_through_json() {
        let lane = Lane::new("Ops", Color32::from_rgb(10, 20, 30));
        let json = serde_json::to_string(&lane).unwrap();
        let back: Lane = serde_json::from_str(&json).unwrap();
        assert_eq!(back, lane);
    }
}
