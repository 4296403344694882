// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Pure view-state machine: signal selection, zoom, pan and cursor tracking.
// Host event handlers translate input events into these calls and pass the
// returned snapshot to the render engine; there is no I/O and no async state.

use crate::render::ViewWindow;
use crate::trace::Time;

/// Multiplicative step applied by [`ViewState::zoom_in`] / [`ViewState::zoom_out`].
pub const ZOOM_FACTOR: f64 = 1.5;

/// Zoom bounds that keep the pixel mapping finite.
const MIN_ZOOM: f64 = 1e-12;
const MAX_ZOOM: f64 = 1e12;

/// Mutable interaction state of the waveform view.
///
/// Independent of any [`crate::Trace`]: the state survives a re-decode of the
/// same logical file, so the host can keep selection and zoom across file
/// updates. Must be owned by a single thread at a time; the decoded trace and
/// its index can be shared freely instead.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewState {
    /// Selected symbols in selection order, without duplicates.
    selected: Vec<String>,
    /// Pixels per time unit, multiplicative, 1.0 at the default zoom.
    zoom_level: f64,
    /// Left edge of the view in time units.
    time_offset: f64,
    /// Time under the pointer, derived via the inverse pixel mapping.
    cursor_time: f64,
}

/// Immutable copy of the view state, returned by every mutating operation as
/// the "view changed" notification.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewSnapshot {
    pub selected: Vec<String>,
    pub zoom_level: f64,
    pub time_offset: f64,
    pub cursor_time: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            selected: Vec::new(),
            zoom_level: 1.0,
            time_offset: 0.0,
            cursor_time: 0.0,
        }
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            selected: self.selected.clone(),
            zoom_level: self.zoom_level,
            time_offset: self.time_offset,
            cursor_time: self.cursor_time,
        }
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, symbol: &str) -> bool {
        self.selected.iter().any(|s| s == symbol)
    }

    pub fn zoom_level(&self) -> f64 {
        self.zoom_level
    }

    pub fn time_offset(&self) -> f64 {
        self.time_offset
    }

    pub fn cursor_time(&self) -> f64 {
        self.cursor_time
    }

    /// Adds `symbol` to the selection. Selecting twice is a no-op.
    pub fn select(&mut self, symbol: &str) -> ViewSnapshot {
        if !self.is_selected(symbol) {
            self.selected.push(symbol.to_string());
        }
        self.snapshot()
    }

    pub fn deselect(&mut self, symbol: &str) -> ViewSnapshot {
        self.selected.retain(|s| s != symbol);
        self.snapshot()
    }

    /// Flips the selection of `symbol`, the way a click on a signal entry does.
    pub fn toggle(&mut self, symbol: &str) -> ViewSnapshot {
        if self.is_selected(symbol) {
            self.deselect(symbol)
        } else {
            self.select(symbol)
        }
    }

    pub fn zoom_in(&mut self) -> ViewSnapshot {
        self.zoom_level = (self.zoom_level * ZOOM_FACTOR).clamp(MIN_ZOOM, MAX_ZOOM);
        self.snapshot()
    }

    pub fn zoom_out(&mut self) -> ViewSnapshot {
        self.zoom_level = (self.zoom_level / ZOOM_FACTOR).clamp(MIN_ZOOM, MAX_ZOOM);
        self.snapshot()
    }

    /// Resets to the default view: zoom 1, no pan.
    pub fn zoom_fit(&mut self) -> ViewSnapshot {
        self.zoom_level = 1.0;
        self.time_offset = 0.0;
        self.snapshot()
    }

    /// Pans by a pixel delta, e.g. from a pointer drag.
    pub fn pan_pixels(&mut self, delta_px: f64) -> ViewSnapshot {
        self.time_offset -= delta_px / self.zoom_level;
        self.snapshot()
    }

    /// Updates the cursor from a pointer position using the inverse of the
    /// time-to-pixel mapping.
    pub fn set_cursor(&mut self, pixel_x: f64) -> ViewSnapshot {
        self.cursor_time = self.time_offset + pixel_x / self.zoom_level;
        self.snapshot()
    }

    /// The time window covered by `pixel_width` pixels at the current zoom
    /// and pan, ready to be passed to the render engine.
    pub fn window(&self, pixel_width: u32) -> ViewWindow {
        let start = self.time_offset.max(0.0);
        let duration = pixel_width as f64 / self.zoom_level;
        ViewWindow::new(start as Time, (start + duration) as Time)
    }
}
