// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Turns a time window plus a pixel width into drawable hold segments per
// signal. This module computes geometry, values and labels only; painting is
// left to the host.

use crate::index::ChangeIndex;
use crate::trace::{Bit, Signal, SignalType, SignalValue, Time, Trace};
use rustc_hash::FxHashMap;

/// Assumed monospace glyph width used by the label legibility heuristic.
const LABEL_CHAR_PX: f64 = 8.0;
const LABEL_PAD_PX: f64 = 4.0;

/// The visible time range of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewWindow {
    pub start: Time,
    pub end: Time,
}

impl ViewWindow {
    pub fn new(start: Time, end: Time) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn duration(&self) -> Time {
        self.end - self.start
    }
}

/// Vertical position of a 1-bit hold segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum BitLevel {
    High,
    Low,
    /// x / z / unknown samples draw at a distinguished mid level.
    Mid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum SegmentShape {
    /// 1-bit trace at a fixed level.
    Level(BitLevel),
    /// Flat band for buses and real-valued signals.
    Band,
}

/// One value-hold interval in pixel space.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct HoldSegment {
    pub x0: f64,
    pub x1: f64,
    /// The held value; `None` for the undefined span before a signal's first
    /// recorded change.
    pub value: Option<SignalValue>,
    pub shape: SegmentShape,
    /// True when the segment is opened by an in-window value change; the
    /// transition edge is drawn at `x0`.
    pub is_transition: bool,
    /// Formatted value label, only present when the segment is wide enough
    /// in pixel space to be legible.
    pub label: Option<String>,
}

/// What the engine produced for one requested symbol.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum RenderResult {
    /// The signal has no recorded changes at all (or the symbol is unknown to
    /// the trace); hosts render a placeholder instead of an empty lane.
    NoData,
    /// Hold segments covering the window, in ascending pixel order.
    Wave(Vec<HoldSegment>),
}

impl RenderResult {
    pub fn segments(&self) -> &[HoldSegment] {
        match self {
            RenderResult::NoData => &[],
            RenderResult::Wave(segments) => segments,
        }
    }
}

/// Renders every requested symbol for one redraw. Called once per frame by
/// the host with the current view state.
pub fn query(
    trace: &Trace,
    index: &ChangeIndex,
    symbols: &[String],
    window: ViewWindow,
    pixel_width: u32,
) -> FxHashMap<String, RenderResult> {
    let mut out = FxHashMap::default();
    for symbol in symbols {
        let result = match trace.signal(symbol) {
            Some(signal) => render_signal(trace, index, signal, window, pixel_width),
            None => RenderResult::NoData,
        };
        out.insert(symbol.clone(), result);
    }
    out
}

/// Renders the hold segments of a single signal.
///
/// Time maps linearly onto `0..pixel_width`. The value at `window.start`
/// opens the first segment; every change with `start < t <= end` closes the
/// current segment and opens a transition segment at its pixel position.
pub fn render_signal(
    trace: &Trace,
    index: &ChangeIndex,
    signal: &Signal,
    window: ViewWindow,
    pixel_width: u32,
) -> RenderResult {
    if !index.has_changes(&signal.symbol) {
        return RenderResult::NoData;
    }

    let width_px = pixel_width as f64;
    let initial = index.value_at(trace, &signal.symbol, window.start).cloned();

    // a trace without timestamped changes has a zero-duration window; show a
    // single flat line instead of dividing by zero
    if window.duration() == 0 {
        let segment = make_segment(signal, 0.0, width_px, initial, false);
        return RenderResult::Wave(vec![segment]);
    }

    let px_per_time = width_px / window.duration() as f64;
    let mut segments = Vec::new();
    let mut held = initial;
    let mut held_x = 0.0;
    let mut held_is_transition = false;

    let visible = index.changes_in(trace, &signal.symbol, window.start, window.end);
    for (ii, &change_ref) in visible.iter().enumerate() {
        let change = index.change(trace, change_ref);
        // the change at exactly `window.start` is already part of `initial`
        if change.time == window.start {
            continue;
        }
        // for duplicate timestamps only the last emitted change counts
        if let Some(&next_ref) = visible.get(ii + 1) {
            if index.change(trace, next_ref).time == change.time {
                continue;
            }
        }
        let x = (change.time - window.start) as f64 * px_per_time;
        segments.push(make_segment(signal, held_x, x, held.take(), held_is_transition));
        held = Some(change.value.clone());
        held_x = x;
        held_is_transition = true;
    }
    segments.push(make_segment(
        signal,
        held_x,
        width_px,
        held,
        held_is_transition,
    ));
    RenderResult::Wave(segments)
}

fn make_segment(
    signal: &Signal,
    x0: f64,
    x1: f64,
    value: Option<SignalValue>,
    is_transition: bool,
) -> HoldSegment {
    let shape = segment_shape(signal, value.as_ref());
    let label = match shape {
        SegmentShape::Band => value
            .as_ref()
            .map(format_label)
            .filter(|label| label_fits(label, x1 - x0)),
        SegmentShape::Level(_) => None,
    };
    HoldSegment {
        x0,
        x1,
        value,
        shape,
        is_transition,
        label,
    }
}

fn segment_shape(signal: &Signal, value: Option<&SignalValue>) -> SegmentShape {
    if signal.is_bus() || signal.tpe == SignalType::Real {
        return SegmentShape::Band;
    }
    let level = match value {
        None => BitLevel::Mid,
        Some(SignalValue::Scalar(Bit::One)) => BitLevel::High,
        Some(SignalValue::Scalar(Bit::Zero)) => BitLevel::Low,
        Some(SignalValue::Scalar(_)) => BitLevel::Mid,
        // a vector change can target a 1-bit signal; classify by its digit
        Some(SignalValue::Vector(digits)) => match digits.chars().last() {
            Some('1') => BitLevel::High,
            Some('0') => BitLevel::Low,
            _ => BitLevel::Mid,
        },
        Some(SignalValue::Real(_)) => BitLevel::Mid,
    };
    SegmentShape::Level(level)
}

/// Formats a bus or real sample for display next to the hold band.
///
/// Pure binary digit strings become unsigned uppercase hexadecimal. Digit
/// strings shorter than the declared width are zero-extended, which is a
/// no-op for the unsigned conversion. Values containing x/z/unknown digits
/// cannot be hex formatted and keep their digit string.
fn format_label(value: &SignalValue) -> String {
    match value {
        SignalValue::Vector(digits) => {
            bin_to_hex(digits).unwrap_or_else(|| digits.to_string())
        }
        SignalValue::Scalar(bit) => bit.to_char().to_string(),
        SignalValue::Real(real) => format!("{real}"),
    }
}

fn label_fits(label: &str, segment_px: f64) -> bool {
    segment_px >= label.len() as f64 * LABEL_CHAR_PX + LABEL_PAD_PX
}

/// Converts a binary digit string to unsigned uppercase hex without leading
/// zeros. Returns `None` if any digit is not 0 or 1. Works nibble-wise so the
/// width is not limited to what fits an integer.
fn bin_to_hex(digits: &str) -> Option<String> {
    if digits.is_empty() || digits.bytes().any(|b| b != b'0' && b != b'1') {
        return None;
    }
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        return Some("0".to_string());
    }
    let bytes = trimmed.as_bytes();
    let mut out = Vec::with_capacity(bytes.len().div_ceil(4));
    let mut hi = bytes.len();
    while hi > 0 {
        let lo = hi.saturating_sub(4);
        let mut nibble = 0u8;
        for b in &bytes[lo..hi] {
            nibble = (nibble << 1) | (b - b'0');
        }
        out.push(char::from_digit(nibble as u32, 16).unwrap().to_ascii_uppercase());
        hi = lo;
    }
    out.reverse();
    Some(out.into_iter().collect())
}
