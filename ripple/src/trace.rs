// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use rustc_hash::FxHashMap;
use std::fmt::{Display, Formatter};

pub type Time = u64;

/// Sample of a 1-bit signal.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum Bit {
    Zero,
    One,
    /// unknown
    X,
    /// high-impedance
    Z,
}

impl Bit {
    /// Parses a scalar value character. Upper case input is normalized to lower case.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Bit::Zero),
            '1' => Some(Bit::One),
            'x' | 'X' => Some(Bit::X),
            'z' | 'Z' => Some(Bit::Z),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Bit::Zero => '0',
            Bit::One => '1',
            Bit::X => 'x',
            Bit::Z => 'z',
        }
    }
}

/// A recorded signal value. The representation is decided by the value-change
/// record that carried it, not inferred from the payload at render time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum SignalValue {
    /// 1-bit sample.
    Scalar(Bit),
    /// Bit string of a vector change, exactly as emitted (may contain x/z).
    Vector(String),
    /// Sample of a real-valued signal.
    Real(f64),
}

impl Display for SignalValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalValue::Scalar(bit) => write!(f, "{}", bit.to_char()),
            SignalValue::Vector(digits) => write!(f, "{}", digits),
            SignalValue::Real(value) => write!(f, "{}", value),
        }
    }
}

/// Variable types as declared by `$var`. Unknown declaration tokens fall back
/// to `Wire` instead of failing the parse.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum SignalType {
    Wire,
    Reg,
    Parameter,
    Integer,
    Real,
    Event,
    Supply0,
    Supply1,
    Tri,
    TriAnd,
    TriOr,
    TriReg,
    Tri0,
    Tri1,
    UWire,
    WAnd,
    WOr,
}

impl SignalType {
    pub(crate) fn from_token(token: &str) -> Option<Self> {
        match token {
            "wire" => Some(SignalType::Wire),
            "reg" => Some(SignalType::Reg),
            "parameter" => Some(SignalType::Parameter),
            "integer" => Some(SignalType::Integer),
            "real" => Some(SignalType::Real),
            "event" => Some(SignalType::Event),
            "supply0" => Some(SignalType::Supply0),
            "supply1" => Some(SignalType::Supply1),
            "tri" => Some(SignalType::Tri),
            "triand" => Some(SignalType::TriAnd),
            "trior" => Some(SignalType::TriOr),
            "trireg" => Some(SignalType::TriReg),
            "tri0" => Some(SignalType::Tri0),
            "tri1" => Some(SignalType::Tri1),
            "uwire" => Some(SignalType::UWire),
            "wand" => Some(SignalType::WAnd),
            "wor" => Some(SignalType::WOr),
            _ => None,
        }
    }
}

/// A declared variable. Several signals may share one `symbol`, in which case
/// they are aliases of the same underlying change stream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct Signal {
    /// Short identifier used by the value-change section.
    pub symbol: String,
    /// Declared width in bits, always > 0.
    pub width: u32,
    /// Display name, may contain spaces and a bus-range suffix like `data[7:0]`.
    pub name: String,
    /// Dotted path of the enclosing scopes, empty for top-level signals.
    pub scope: String,
    pub tpe: SignalType,
}

impl Signal {
    /// Full hierarchical name of the signal.
    pub fn full_name(&self) -> String {
        if self.scope.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.scope, self.name)
        }
    }

    pub fn is_bus(&self) -> bool {
        self.width > 1
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct Scope {
    pub name: String,
    /// Scope type token (`module`, `task`, `function`, ...), kept as free text.
    pub tpe: String,
    /// Dotted path of the parent scope, `None` for top-level scopes.
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct ValueChange {
    pub time: Time,
    pub symbol: String,
    pub value: SignalValue,
}

/// Non-fatal conditions collected while decoding. These never abort the
/// parse; they are attached to the resulting [`Trace`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub enum ParseWarning {
    #[error("[vcd] line {line_no}: skipping malformed declaration: `{line}`")]
    MalformedDeclaration { line_no: u32, line: String },
    #[error("[vcd] line {line_no}: skipping malformed value change: `{line}`")]
    MalformedValueChange { line_no: u32, line: String },
    #[error("[vcd] line {line_no}: ignoring invalid timestamp: `{token}`")]
    MalformedTimestamp { line_no: u32, token: String },
    #[error("[vcd] line {line_no}: skipping unexpected command: `{command}`")]
    UnexpectedCommand { line_no: u32, command: String },
    #[error("[vcd] could not parse timescale `{text}`, defaulting to 1ns")]
    UnparsableTimescale { text: String },
    #[error("[vcd] header ended without `$enddefinitions`")]
    HeaderNotTerminated,
    #[error("[vcd] no signals found")]
    NoSignals,
    #[error("[vcd] no value changes found")]
    NoChanges,
}

/// The decoded trace: declarations plus the chronological change log.
///
/// A `Trace` is built once per decode call and immutable afterwards. It can
/// be shared freely between read-only queries; a file update produces a fresh
/// `Trace` instead of mutating an existing one.
#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(serde::Serialize, serde::Deserialize))]
pub struct Trace {
    timescale: String,
    signals: Vec<Signal>,
    scopes: Vec<Scope>,
    changes: Vec<ValueChange>,
    end_time: Time,
    version: Option<String>,
    date: Option<String>,
    comment: Option<String>,
    warnings: Vec<ParseWarning>,
    /// symbol -> index of the first signal declared under it
    symbol_lookup: FxHashMap<String, usize>,
}

impl Trace {
    /// The normalized timescale string, e.g. `1ns`.
    pub fn timescale(&self) -> &str {
        &self.timescale
    }

    /// Signals in declaration order. Aliased symbols appear once per alias.
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Scopes in declaration order.
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// The change log in file emission order. Globally non-decreasing by
    /// time, but not necessarily sorted per symbol.
    pub fn changes(&self) -> &[ValueChange] {
        &self.changes
    }

    /// The largest timestamp observed, 0 if the trace has no `#` markers.
    pub fn end_time(&self) -> Time {
        self.end_time
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Non-fatal diagnostics collected while decoding.
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    /// Looks up the first signal declared under `symbol`.
    pub fn signal(&self, symbol: &str) -> Option<&Signal> {
        self.symbol_lookup.get(symbol).map(|ii| &self.signals[*ii])
    }

    /// All signals sharing `symbol` (aliases of one change stream).
    pub fn signals_with_symbol<'a>(&'a self, symbol: &'a str) -> impl Iterator<Item = &'a Signal> {
        self.signals.iter().filter(move |s| s.symbol == symbol)
    }
}

/// Accumulates declarations and changes during a decode and then freezes them
/// into a [`Trace`].
pub(crate) struct TraceBuilder {
    timescale: Option<String>,
    signals: Vec<Signal>,
    scopes: Vec<Scope>,
    changes: Vec<ValueChange>,
    end_time: Time,
    version: Option<String>,
    date: Option<String>,
    comment: Option<String>,
    warnings: Vec<ParseWarning>,
    scope_stack: Vec<String>,
}

impl TraceBuilder {
    pub(crate) fn new() -> Self {
        Self {
            timescale: None,
            signals: Vec::new(),
            scopes: Vec::new(),
            changes: Vec::new(),
            end_time: 0,
            version: None,
            date: None,
            comment: None,
            warnings: Vec::new(),
            scope_stack: Vec::new(),
        }
    }

    /// Dotted path of the scope that new signals are declared in.
    pub(crate) fn current_scope(&self) -> String {
        self.scope_stack.join(".")
    }

    pub(crate) fn push_scope(&mut self, tpe: &str, name: &str) {
        let parent = if self.scope_stack.is_empty() {
            None
        } else {
            Some(self.current_scope())
        };
        self.scopes.push(Scope {
            name: name.to_string(),
            tpe: tpe.to_string(),
            parent,
        });
        self.scope_stack.push(name.to_string());
    }

    /// Pops back to the parent scope. Unbalanced `$upscope` commands at the
    /// top level are ignored.
    pub(crate) fn pop_scope(&mut self) {
        self.scope_stack.pop();
    }

    pub(crate) fn add_signal(&mut self, tpe: SignalType, width: u32, symbol: &str, name: &str) {
        debug_assert!(width > 0);
        self.signals.push(Signal {
            symbol: symbol.to_string(),
            width,
            name: name.to_string(),
            scope: self.current_scope(),
            tpe,
        });
    }

    pub(crate) fn set_timescale(&mut self, value: String) {
        self.timescale = Some(value);
    }

    pub(crate) fn set_version(&mut self, value: String) {
        self.version = Some(value);
    }

    pub(crate) fn set_date(&mut self, value: String) {
        self.date = Some(value);
    }

    pub(crate) fn set_comment(&mut self, value: String) {
        self.comment = Some(value);
    }

    /// Records a `#` time marker. The end time tracks the maximum seen.
    pub(crate) fn observe_time(&mut self, time: Time) {
        self.end_time = self.end_time.max(time);
    }

    pub(crate) fn add_change(&mut self, time: Time, symbol: &str, value: SignalValue) {
        self.changes.push(ValueChange {
            time,
            symbol: symbol.to_string(),
            value,
        });
    }

    pub(crate) fn warn(&mut self, warning: ParseWarning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub(crate) fn finish(mut self) -> Trace {
        if self.signals.is_empty() {
            self.warn(ParseWarning::NoSignals);
        }
        if self.changes.is_empty() {
            self.warn(ParseWarning::NoChanges);
        }
        let mut symbol_lookup = FxHashMap::default();
        for (ii, signal) in self.signals.iter().enumerate() {
            symbol_lookup.entry(signal.symbol.clone()).or_insert(ii);
        }
        Trace {
            timescale: self.timescale.unwrap_or_else(|| "1ns".to_string()),
            signals: self.signals,
            scopes: self.scopes,
            changes: self.changes,
            end_time: self.end_time,
            version: self.version,
            date: self.date,
            comment: self.comment,
            warnings: self.warnings,
            symbol_lookup,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_from_char() {
        assert_eq!(Bit::from_char('0'), Some(Bit::Zero));
        assert_eq!(Bit::from_char('1'), Some(Bit::One));
        assert_eq!(Bit::from_char('x'), Some(Bit::X));
        assert_eq!(Bit::from_char('X'), Some(Bit::X));
        assert_eq!(Bit::from_char('z'), Some(Bit::Z));
        assert_eq!(Bit::from_char('Z'), Some(Bit::Z));
        assert_eq!(Bit::from_char('b'), None);
    }

    #[test]
    fn test_signal_value_display() {
        assert_eq!(SignalValue::Scalar(Bit::X).to_string(), "x");
        assert_eq!(SignalValue::Vector("10xz".to_string()).to_string(), "10xz");
        assert_eq!(SignalValue::Real(1.5).to_string(), "1.5");
    }

    #[test]
    fn test_scope_stack() {
        let mut b = TraceBuilder::new();
        assert_eq!(b.current_scope(), "");
        b.push_scope("module", "top");
        assert_eq!(b.current_scope(), "top");
        b.push_scope("module", "cpu");
        assert_eq!(b.current_scope(), "top.cpu");
        b.add_signal(SignalType::Wire, 1, "!", "clk");
        b.pop_scope();
        assert_eq!(b.current_scope(), "top");
        b.pop_scope();
        assert_eq!(b.current_scope(), "");
        // unbalanced upscope is ignored
        b.pop_scope();
        assert_eq!(b.current_scope(), "");

        let trace = b.finish();
        assert_eq!(trace.scopes().len(), 2);
        assert_eq!(trace.scopes()[0].parent, None);
        assert_eq!(trace.scopes()[1].parent, Some("top".to_string()));
        assert_eq!(trace.signals()[0].scope, "top.cpu");
        assert_eq!(trace.signals()[0].full_name(), "top.cpu.clk");
    }

    #[test]
    fn test_symbol_aliases_resolve_to_first_signal() {
        let mut b = TraceBuilder::new();
        b.add_signal(SignalType::Wire, 8, "#", "data");
        b.add_signal(SignalType::Wire, 8, "#", "data_alias");
        let trace = b.finish();
        assert_eq!(trace.signal("#").unwrap().name, "data");
        assert_eq!(trace.signals_with_symbol("#").count(), 2);
    }

    #[test]
    fn test_finish_flags_empty_trace() {
        let trace = TraceBuilder::new().finish();
        assert!(trace.warnings().contains(&ParseWarning::NoSignals));
        assert!(trace.warnings().contains(&ParseWarning::NoChanges));
        assert_eq!(trace.timescale(), "1ns");
        assert_eq!(trace.end_time(), 0);
    }

    #[test]
    fn test_end_time_tracks_maximum() {
        let mut b = TraceBuilder::new();
        b.observe_time(10);
        b.observe_time(250);
        b.observe_time(100);
        assert_eq!(b.finish().end_time(), 250);
    }
}
