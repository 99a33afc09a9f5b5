//! Tracked-window state shared by all handlers.
//!
//! The daemon keeps one ordered list of tracked window ids and a cursor
//! naming the window it currently considers shown. Handlers mutate this
//! state under a single global lock; the methods here are pure bookkeeping
//! and never talk to the window manager.

use crate::protocol::WindowId;

/// The rotating scratchpad set.
///
/// Invariants: `windows` holds no duplicate ids; while `windows` is
/// non-empty, `cursor < windows.len()`. With an empty list the cursor is
/// never dereferenced.
#[derive(Debug, Default)]
pub struct ScratchpadState {
    windows: Vec<WindowId>,
    cursor: usize,
}

impl ScratchpadState {
    pub fn new() -> Self {
        ScratchpadState {
            windows: Vec::new(),
            cursor: 0,
        }
    }

    /// The tracked window ids, oldest first.
    pub fn windows(&self) -> &[WindowId] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Index of the window currently considered shown.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Id of the window at the cursor, if any window is tracked.
    pub fn current(&self) -> Option<WindowId> {
        self.windows.get(self.cursor).copied()
    }

    /// Track a window at the tail of the list. No-op if already tracked.
    ///
    /// Returns true if the id was newly inserted.
    pub fn add(&mut self, id: WindowId) -> bool {
        if self.windows.contains(&id) {
            return false;
        }
        self.windows.push(id);
        true
    }

    /// Stop tracking a window. No-op if absent.
    ///
    /// The cursor is left untouched; callers recompute it afterwards via
    /// [`ScratchpadState::next_index`] against the shortened list.
    pub fn remove(&mut self, id: WindowId) -> bool {
        match self.windows.iter().position(|&w| w == id) {
            Some(pos) => {
                self.windows.remove(pos);
                true
            }
            None => false,
        }
    }

    /// The cursor advanced by one with wraparound against the current
    /// list length. Must not be called on an empty list.
    pub fn next_index(&self) -> usize {
        (self.cursor + 1) % self.windows.len()
    }

    /// The cursor stepped back by one with wraparound against the current
    /// list length. Must not be called on an empty list.
    pub fn prev_index(&self) -> usize {
        (self.cursor + self.windows.len() - 1) % self.windows.len()
    }

    /// Move the cursor. Only called after the corresponding show/hide
    /// transitions succeeded.
    pub fn set_cursor(&mut self, index: usize) {
        debug_assert!(index < self.windows.len());
        self.cursor = index;
    }
}
