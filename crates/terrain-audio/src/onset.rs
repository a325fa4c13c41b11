//! Onset editor: the interactive marker list drawn over a waveform.
//!
//! Onsets stay sorted except between a move and the next release. A move
//! overwrites the selected value in place and the list is re-sorted on
//! `pointer_up` or `delete`, with the selection following the moved value.

use std::cmp::Ordering;

use crate::vad::Segment;

pub const DEFAULT_SNAP_RADIUS_PX: f64 = 8.0;

/// Maps between time (seconds) and horizontal pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width_px: f64,
    pub duration: f64,
}

impl Viewport {
    pub fn new(width_px: f64, duration: f64) -> Self {
        Self { width_px, duration }
    }

    pub fn time_to_px(&self, time: f64) -> f64 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        time * self.width_px / self.duration
    }

    /// Pixel to time, clamped to the recording.
    pub fn px_to_time(&self, px: f64) -> f64 {
        if self.width_px <= 0.0 {
            return 0.0;
        }
        self.clamp(px * self.duration / self.width_px)
    }

    fn clamp(&self, time: f64) -> f64 {
        time.clamp(0.0, self.duration.max(0.0))
    }
}

/// What a pointer press did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    /// An existing onset was grabbed; a drag is in progress.
    Selected(usize),
    /// A new onset was added at this index.
    Inserted(usize),
}

#[derive(Debug, Clone)]
pub struct OnsetEditor {
    onsets: Vec<f64>,
    selected: Option<usize>,
    dragging: bool,
    // Set by a move, cleared by the next re-sort.
    unsorted: bool,
    viewport: Viewport,
    snap_radius_px: f64,
}

impl OnsetEditor {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            onsets: Vec::new(),
            selected: None,
            dragging: false,
            unsorted: false,
            viewport,
            snap_radius_px: DEFAULT_SNAP_RADIUS_PX,
        }
    }

    /// Editor seeded with existing onsets (clamped and sorted).
    pub fn with_onsets(viewport: Viewport, onsets: &[f64]) -> Self {
        let mut editor = Self::new(viewport);
        editor.onsets = onsets.iter().map(|&t| viewport.clamp(t)).collect();
        editor.onsets.sort_by(f64::total_cmp);
        editor
    }

    pub fn with_snap_radius(mut self, px: f64) -> Self {
        self.snap_radius_px = px;
        self
    }

    pub fn onsets(&self) -> &[f64] {
        &self.onsets
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Add an onset, keeping the list sorted. Selects and returns its index.
    pub fn insert(&mut self, time: f64) -> usize {
        let time = self.viewport.clamp(time);
        self.onsets.push(time);
        self.onsets.sort_by(f64::total_cmp);
        self.unsorted = false;
        let index = self.index_of(time).unwrap_or(self.onsets.len() - 1);
        self.selected = Some(index);
        index
    }

    /// Select the onset nearest `px` if it is within the snap radius.
    /// Clears the selection otherwise.
    pub fn select_nearest(&mut self, px: f64) -> Option<usize> {
        self.selected = self.nearest_within(px);
        self.selected
    }

    /// Grab the onset under the pointer, or insert one there.
    pub fn pointer_down(&mut self, px: f64) -> PointerAction {
        match self.select_nearest(px) {
            Some(index) => {
                self.dragging = true;
                PointerAction::Selected(index)
            }
            None => PointerAction::Inserted(self.insert(self.viewport.px_to_time(px))),
        }
    }

    /// Drag the selected onset. Returns its new time.
    pub fn pointer_move(&mut self, px: f64) -> Option<f64> {
        if !self.dragging {
            return None;
        }
        self.move_selected(self.viewport.px_to_time(px))
    }

    /// Overwrite the selected onset in place. The list is re-sorted on the
    /// next `pointer_up` or `delete`.
    pub fn move_selected(&mut self, time: f64) -> Option<f64> {
        let index = self.selected?;
        let time = self.viewport.clamp(time);
        *self.onsets.get_mut(index)? = time;
        self.unsorted = true;
        Some(time)
    }

    /// Finish a drag or move: sort, and re-select the moved value.
    pub fn pointer_up(&mut self) {
        self.dragging = false;
        if self.unsorted {
            self.resort();
        }
    }

    /// Remove the onset at `index`.
    pub fn delete(&mut self, index: usize) -> Option<f64> {
        if index >= self.onsets.len() {
            return None;
        }
        let removed = self.onsets.remove(index);
        self.selected = match self.selected {
            Some(s) if s == index => None,
            Some(s) if s > index => Some(s - 1),
            other => other,
        };
        self.dragging = false;
        if self.unsorted {
            self.resort();
        }
        Some(removed)
    }

    /// Remove the onset nearest `px` if it is within the snap radius.
    pub fn delete_at(&mut self, px: f64) -> Option<f64> {
        let index = self.nearest_within(px)?;
        self.delete(index)
    }

    pub fn clear_selection(&mut self) {
        if self.unsorted {
            self.resort();
        }
        self.selected = None;
        self.dragging = false;
    }

    pub fn chunks(&self) -> Vec<Segment> {
        onsets_to_chunks(&self.onsets, self.viewport.duration)
    }

    fn nearest_within(&self, px: f64) -> Option<usize> {
        self.onsets
            .iter()
            .enumerate()
            .map(|(i, &t)| (i, (self.viewport.time_to_px(t) - px).abs()))
            .filter(|(_, distance)| *distance <= self.snap_radius_px)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    // First index holding `value`. Equal values are indistinguishable, so
    // a dragged duplicate resolves to the earliest copy.
    fn index_of(&self, value: f64) -> Option<usize> {
        self.onsets
            .iter()
            .position(|t| t.total_cmp(&value) == Ordering::Equal)
    }

    fn resort(&mut self) {
        let value = self.selected.and_then(|i| self.onsets.get(i).copied());
        self.onsets.sort_by(f64::total_cmp);
        self.unsorted = false;
        self.selected = value.and_then(|v| self.index_of(v));
    }
}

/// Split `[first onset, duration]` at each onset: n onsets give n chunks,
/// the last ending at `duration`.
pub fn onsets_to_chunks(onsets: &[f64], duration: f64) -> Vec<Segment> {
    onsets
        .iter()
        .enumerate()
        .map(|(i, &start)| Segment::new(start, onsets.get(i + 1).copied().unwrap_or(duration)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1 px per 10 ms
    fn editor() -> OnsetEditor {
        OnsetEditor::new(Viewport::new(1000.0, 10.0))
    }

    #[test]
    fn test_chunks_from_onsets() {
        let chunks = onsets_to_chunks(&[2.0, 5.0, 9.0], 12.0);
        assert_eq!(
            chunks,
            vec![Segment::new(2.0, 5.0), Segment::new(5.0, 9.0), Segment::new(9.0, 12.0)]
        );
        assert!(onsets_to_chunks(&[], 12.0).is_empty());
    }

    #[test]
    fn test_insert_sorts_and_selects() {
        let mut ed = editor();
        assert_eq!(ed.insert(5.0), 0);
        assert_eq!(ed.insert(2.0), 0);
        assert_eq!(ed.insert(7.0), 2);
        assert_eq!(ed.insert(20.0), 3);
        assert_eq!(ed.onsets(), &[2.0, 5.0, 7.0, 10.0]);
        assert_eq!(ed.selected(), Some(3));
    }

    #[test]
    fn test_select_nearest_respects_radius() {
        let mut ed = OnsetEditor::with_onsets(Viewport::new(1000.0, 10.0), &[1.0, 5.0]);
        assert_eq!(ed.select_nearest(505.0), Some(1));
        assert_eq!(ed.select_nearest(300.0), None);
        assert_eq!(ed.selected(), None);
    }

    #[test]
    fn test_pointer_down_inserts_away_from_onsets() {
        let mut ed = OnsetEditor::with_onsets(Viewport::new(1000.0, 10.0), &[5.0]);
        assert_eq!(ed.pointer_down(200.0), PointerAction::Inserted(0));
        assert!(!ed.is_dragging());
        assert_eq!(ed.onsets(), &[2.0, 5.0]);
    }

    #[test]
    fn test_drag_past_neighbour_resorts_on_release() {
        let mut ed = OnsetEditor::with_onsets(Viewport::new(1000.0, 10.0), &[2.0, 5.0, 9.0]);
        assert_eq!(ed.pointer_down(198.0), PointerAction::Selected(0));
        assert!(ed.is_dragging());

        ed.pointer_move(700.0);
        assert_eq!(ed.onsets(), &[7.0, 5.0, 9.0], "no sort mid-drag");

        ed.pointer_up();
        assert_eq!(ed.onsets(), &[5.0, 7.0, 9.0]);
        assert_eq!(ed.selected(), Some(1));
        assert!(!ed.is_dragging());
    }

    #[test]
    fn test_move_without_drag_resorts_on_release() {
        let mut ed = OnsetEditor::with_onsets(Viewport::new(1000.0, 10.0), &[1.0, 4.0, 8.0]);
        assert_eq!(ed.select_nearest(400.0), Some(1));
        assert_eq!(ed.move_selected(9.5), Some(9.5));
        assert!(!ed.is_dragging());

        ed.pointer_up();
        assert_eq!(ed.onsets(), &[1.0, 8.0, 9.5]);
        assert_eq!(ed.selected(), Some(2));

        assert_eq!(ed.delete(0), Some(1.0));
        assert_eq!(ed.onsets(), &[8.0, 9.5]);
        assert_eq!(ed.chunks(), vec![Segment::new(8.0, 9.5), Segment::new(9.5, 10.0)]);
    }

    #[test]
    fn test_delete_after_move_resorts() {
        let mut ed = OnsetEditor::with_onsets(Viewport::new(1000.0, 10.0), &[1.0, 4.0, 8.0]);
        ed.select_nearest(400.0);
        ed.move_selected(9.5);

        assert_eq!(ed.delete(0), Some(1.0));
        assert_eq!(ed.onsets(), &[8.0, 9.5]);
        assert_eq!(ed.selected(), Some(1));
    }

    #[test]
    fn test_delete_adjusts_selection() {
        let mut ed = OnsetEditor::with_onsets(Viewport::new(1000.0, 10.0), &[1.0, 2.0, 3.0]);
        ed.select_nearest(300.0);
        assert_eq!(ed.delete(0), Some(1.0));
        assert_eq!(ed.selected(), Some(1));
        assert_eq!(ed.delete(1), Some(3.0));
        assert_eq!(ed.selected(), None);
        assert_eq!(ed.delete(5), None);
    }

    #[test]
    fn test_delete_at_outside_radius_is_noop() {
        let mut ed = OnsetEditor::with_onsets(Viewport::new(1000.0, 10.0), &[4.0]);
        assert_eq!(ed.delete_at(100.0), None);
        assert_eq!(ed.delete_at(403.0), Some(4.0));
        assert!(ed.onsets().is_empty());
    }

    #[test]
    fn test_move_clamps_to_recording() {
        let mut ed = OnsetEditor::with_onsets(Viewport::new(1000.0, 10.0), &[4.0]);
        ed.select_nearest(400.0);
        assert_eq!(ed.move_selected(-3.0), Some(0.0));
        assert_eq!(ed.move_selected(42.0), Some(10.0));
    }

    #[test]
    fn test_duplicate_values_resolve_to_first() {
        let mut ed = OnsetEditor::with_onsets(Viewport::new(1000.0, 10.0), &[3.0, 3.0]);
        assert_eq!(ed.insert(3.0), 0);
        assert_eq!(ed.onsets().len(), 3);
    }
}
