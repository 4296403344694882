// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

mod index;
mod lines;
mod render;
mod trace;
mod vcd;
mod view;

/// Cargo.toml version of this library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The only hard decode failure. Recoverable conditions are collected as
/// [`ParseWarning`] values on the decoded [`Trace`] instead; a trace with
/// zero signals or zero changes is a valid, renderable result.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeError {
    #[error(
        "[vcd] input contains none of `$timescale`, `$var`, `$scope`, `$enddefinitions`, this does not look like a value change dump"
    )]
    NotATrace,
}

pub type Result<T> = std::result::Result<T, DecodeError>;

pub use index::{ChangeIndex, ChangeRef};
pub use render::{
    query, render_signal, BitLevel, HoldSegment, RenderResult, SegmentShape, ViewWindow,
};
pub use trace::{
    Bit, ParseWarning, Scope, Signal, SignalType, SignalValue, Time, Trace, ValueChange,
};
pub use vcd::decode;
pub use view::{ViewSnapshot, ViewState, ZOOM_FACTOR};
