use std::collections::VecDeque;

use crate::canvas::{PixelSurface, Snapshot};

/// Default number of undo steps kept.
pub const MAX_HISTORY: usize = 20;

// ============================================================================
// HISTORY ENTRY - full-surface snapshot taken before an action
// ============================================================================

/// A pre-action snapshot plus the label shown in the history list.
struct HistoryEntry {
    description: String,
    snapshot: Snapshot,
}

impl HistoryEntry {
    fn memory_size(&self) -> usize {
        self.snapshot.memory_bytes() + self.description.len()
    }
}

// ============================================================================
// HISTORY MANAGER - bounded undo/redo stacks of snapshots
// ============================================================================

/// Undo/redo history over full-surface snapshots.
///
/// Both stacks keep the most recent entry at the back. A checkpoint must be
/// taken once per user action, before the surface is touched.
pub struct HistoryManager {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: VecDeque<HistoryEntry>,
    max_history_size: usize,
    /// Running memory total across both stacks.
    total_memory: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}

impl HistoryManager {
    pub fn new(max_history_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_history_size: max_history_size.max(1),
            total_memory: 0,
        }
    }

    /// Record the surface as it is now, before `description` mutates it.
    pub fn checkpoint(&mut self, surface: &PixelSurface, description: impl Into<String>) {
        // A fresh action invalidates everything that could be redone
        for entry in self.redo_stack.drain(..) {
            self.total_memory = self.total_memory.saturating_sub(entry.memory_size());
        }

        let entry = HistoryEntry {
            description: description.into(),
            snapshot: surface.read_pixels(),
        };
        tracing::debug!(action = %entry.description, depth = self.undo_stack.len() + 1, "checkpoint");
        self.push_undo(entry);
    }

    /// Step back one action. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self, surface: &mut PixelSurface) -> bool {
        let Some(entry) = self.undo_stack.pop_back() else {
            return false;
        };
        self.total_memory = self.total_memory.saturating_sub(entry.memory_size());

        let current = HistoryEntry {
            description: entry.description.clone(),
            snapshot: surface.read_pixels(),
        };
        if let Err(e) = surface.write_pixels(&entry.snapshot) {
            tracing::warn!(action = %entry.description, "undo skipped: {e}");
            self.total_memory += entry.memory_size();
            self.undo_stack.push_back(entry);
            return false;
        }

        tracing::info!(action = %entry.description, "undo");
        self.total_memory += current.memory_size();
        self.redo_stack.push_back(current);
        true
    }

    /// Re-apply the most recently undone action. Returns `false` when there
    /// is nothing to redo.
    pub fn redo(&mut self, surface: &mut PixelSurface) -> bool {
        let Some(entry) = self.redo_stack.pop_back() else {
            return false;
        };
        self.total_memory = self.total_memory.saturating_sub(entry.memory_size());

        let current = HistoryEntry {
            description: entry.description.clone(),
            snapshot: surface.read_pixels(),
        };
        if let Err(e) = surface.write_pixels(&entry.snapshot) {
            tracing::warn!(action = %entry.description, "redo skipped: {e}");
            self.total_memory += entry.memory_size();
            self.redo_stack.push_back(entry);
            return false;
        }

        tracing::info!(action = %entry.description, "redo");
        self.push_undo(current);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.description.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|e| e.description.as_str())
    }

    /// Get all undo descriptions (most recent first)
    pub fn undo_history(&self) -> Vec<String> {
        self.undo_stack.iter().rev().map(|e| e.description.clone()).collect()
    }

    /// Get the current memory usage of the history (O(1) via cached total)
    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.total_memory = 0;
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    fn push_undo(&mut self, entry: HistoryEntry) {
        self.total_memory += entry.memory_size();
        self.undo_stack.push_back(entry);
        self.prune();
    }

    /// Evict oldest entries until the cap holds.
    fn prune(&mut self) {
        while self.undo_stack.len() > self.max_history_size {
            if let Some(removed) = self.undo_stack.pop_front() {
                self.total_memory = self.total_memory.saturating_sub(removed.memory_size());
            }
        }
    }

    #[cfg(test)]
    fn undo_snapshots(&self) -> Vec<&Snapshot> {
        self.undo_stack.iter().map(|e| &e.snapshot).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn paint(surface: &mut PixelSurface, shade: u8) {
        surface.pixels_mut().put_pixel(0, 0, Rgba([shade, shade, shade, 255]));
    }

    #[test]
    fn undo_on_empty_history_is_a_no_op() {
        let mut surface = PixelSurface::new(4, 4).unwrap();
        let mut history = HistoryManager::default();
        let before = surface.read_pixels();
        assert!(!history.undo(&mut surface));
        assert_eq!(surface.read_pixels(), before);
    }

    #[test]
    fn redo_on_empty_history_is_a_no_op() {
        let mut surface = PixelSurface::new(4, 4).unwrap();
        let mut history = HistoryManager::default();
        paint(&mut surface, 9);
        let before = surface.read_pixels();
        assert!(!history.redo(&mut surface));
        assert_eq!(surface.read_pixels(), before);
    }

    #[test]
    fn undo_then_redo_round_trips() {
        let mut surface = PixelSurface::new(4, 4).unwrap();
        let mut history = HistoryManager::default();
        let s0 = surface.read_pixels();
        history.checkpoint(&surface, "Paint");
        paint(&mut surface, 0);
        let s1 = surface.read_pixels();

        assert!(history.undo(&mut surface));
        assert_eq!(surface.read_pixels(), s0);
        assert_eq!(history.redo_description(), Some("Paint"));

        assert!(history.redo(&mut surface));
        assert_eq!(surface.read_pixels(), s1);
        assert!(!history.can_redo());
        assert!(history.can_undo());
    }

    #[test]
    fn checkpoint_clears_redo() {
        let mut surface = PixelSurface::new(4, 4).unwrap();
        let mut history = HistoryManager::default();
        history.checkpoint(&surface, "First");
        paint(&mut surface, 1);
        assert!(history.undo(&mut surface));
        assert!(history.can_redo());

        history.checkpoint(&surface, "Second");
        paint(&mut surface, 2);
        assert!(!history.can_redo());
        assert!(!history.redo(&mut surface));
    }

    #[test]
    fn cap_evicts_oldest_and_keeps_order() {
        let mut surface = PixelSurface::new(2, 2).unwrap();
        let mut history = HistoryManager::default();
        let total = MAX_HISTORY + 7;
        for i in 0..total {
            paint(&mut surface, i as u8);
            history.checkpoint(&surface, format!("Step {i}"));
            assert!(history.undo_count() <= MAX_HISTORY);
        }
        assert_eq!(history.undo_count(), MAX_HISTORY);

        let shades: Vec<u8> = history
            .undo_snapshots()
            .iter()
            .map(|s| s.pixel(0, 0).unwrap()[0])
            .collect();
        let expected: Vec<u8> = ((total - MAX_HISTORY)..total).map(|i| i as u8).collect();
        assert_eq!(shades, expected);
        assert_eq!(history.undo_history()[0], format!("Step {}", total - 1));
    }

    #[test]
    fn redo_respects_the_cap() {
        let mut surface = PixelSurface::new(2, 2).unwrap();
        let mut history = HistoryManager::new(2);
        for i in 0..2 {
            history.checkpoint(&surface, "Step");
            paint(&mut surface, i);
        }
        assert!(history.undo(&mut surface));
        assert!(history.redo(&mut surface));
        assert_eq!(history.undo_count(), 2);
        assert_eq!(history.redo_count(), 0);
    }

    #[test]
    fn stale_snapshot_is_left_in_place() {
        let mut surface = PixelSurface::new(4, 4).unwrap();
        let mut history = HistoryManager::default();
        history.checkpoint(&surface, "Paint");
        surface.resize(8, 8).unwrap();
        let before = surface.read_pixels();

        assert!(!history.undo(&mut surface));
        assert_eq!(surface.read_pixels(), before);
        assert_eq!(history.undo_count(), 1);
        assert_eq!(history.redo_count(), 0);
    }

    #[test]
    fn memory_usage_tracks_both_stacks() {
        let mut surface = PixelSurface::new(4, 4).unwrap();
        let mut history = HistoryManager::default();
        assert_eq!(history.memory_usage(), 0);
        history.checkpoint(&surface, "A");
        let one = history.memory_usage();
        assert_eq!(one, 4 * 4 * 4 + 1);
        assert!(history.undo(&mut surface));
        assert_eq!(history.memory_usage(), one);
        history.clear();
        assert_eq!(history.memory_usage(), 0);
    }
}
