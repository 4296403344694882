// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Per-signal view of the change log, sorted by time for range queries.

use crate::trace::{SignalValue, Time, Trace, ValueChange};
use rustc_hash::FxHashMap;

/// Index into the change log of the trace this index was built from.
pub type ChangeRef = u32;

/// Groups the changes of a [`Trace`] by symbol and sorts them by time.
///
/// The index stores positions into the trace's change log instead of copies,
/// so queries take the trace they were built from, the same way hierarchy
/// lookups do. The sort is stable: for changes sharing a timestamp the
/// emission order is kept and `value_at` resolves to the last one emitted.
///
/// The index is read-only once built and is rebuilt whenever its trace is
/// replaced by a re-decode.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeIndex {
    by_symbol: FxHashMap<String, Vec<ChangeRef>>,
}

impl ChangeIndex {
    pub fn of(trace: &Trace) -> Self {
        let mut by_symbol: FxHashMap<String, Vec<ChangeRef>> = FxHashMap::default();
        for (ii, change) in trace.changes().iter().enumerate() {
            by_symbol
                .entry(change.symbol.clone())
                .or_default()
                .push(ii as ChangeRef);
        }
        for refs in by_symbol.values_mut() {
            refs.sort_by_key(|&ii| trace.changes()[ii as usize].time);
        }
        Self { by_symbol }
    }

    /// All changes recorded for `symbol`, ascending by time.
    pub fn changes_for(&self, symbol: &str) -> &[ChangeRef] {
        self.by_symbol
            .get(symbol)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The value of `symbol` at time `time`: the most recent change at or
    /// before `time`. Returns `None` before the first recorded change; the
    /// format leaves that span undefined and renderers show it as unknown.
    pub fn value_at<'a>(
        &self,
        trace: &'a Trace,
        symbol: &str,
        time: Time,
    ) -> Option<&'a SignalValue> {
        let refs = self.by_symbol.get(symbol)?;
        let pos = refs.partition_point(|&ii| trace.changes()[ii as usize].time <= time);
        if pos == 0 {
            None
        } else {
            Some(&trace.changes()[refs[pos - 1] as usize].value)
        }
    }

    /// Changes of `symbol` with `start <= time <= end`, for viewport-bounded
    /// rendering.
    pub fn changes_in(&self, trace: &Trace, symbol: &str, start: Time, end: Time) -> &[ChangeRef] {
        let refs = match self.by_symbol.get(symbol) {
            Some(refs) => refs,
            None => return &[],
        };
        let lo = refs.partition_point(|&ii| trace.changes()[ii as usize].time < start);
        let hi = refs.partition_point(|&ii| trace.changes()[ii as usize].time <= end);
        &refs[lo..hi]
    }

    pub fn has_changes(&self, symbol: &str) -> bool {
        !self.changes_for(symbol).is_empty()
    }

    /// Number of symbols with at least one recorded change.
    pub fn symbol_count(&self) -> usize {
        self.by_symbol.len()
    }

    /// Resolves a [`ChangeRef`] back to the change record.
    #[inline]
    pub fn change<'a>(&self, trace: &'a Trace, change_ref: ChangeRef) -> &'a ValueChange {
        &trace.changes()[change_ref as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::Bit;
    use crate::vcd::decode;

    fn scalar_trace() -> Trace {
        let input = "$var wire 1 ! clk $end
$enddefinitions $end
#0
0!
#10
1!
#25
0!";
        decode(input.as_bytes()).unwrap()
    }

    #[test]
    fn test_value_at() {
        let trace = scalar_trace();
        let index = ChangeIndex::of(&trace);
        assert_eq!(
            index.value_at(&trace, "!", 0),
            Some(&SignalValue::Scalar(Bit::Zero))
        );
        assert_eq!(
            index.value_at(&trace, "!", 10),
            Some(&SignalValue::Scalar(Bit::One))
        );
        assert_eq!(
            index.value_at(&trace, "!", 24),
            Some(&SignalValue::Scalar(Bit::One))
        );
        // past the last change the final value holds
        assert_eq!(
            index.value_at(&trace, "!", 30),
            Some(&SignalValue::Scalar(Bit::Zero))
        );
    }

    #[test]
    fn test_value_before_first_change_is_unknown() {
        let input = "$var wire 1 ! clk $end\n$enddefinitions $end\n#10\n1!";
        let trace = decode(input.as_bytes()).unwrap();
        let index = ChangeIndex::of(&trace);
        assert_eq!(index.value_at(&trace, "!", 5), None);
        assert!(index.value_at(&trace, "!", 10).is_some());
    }

    #[test]
    fn test_value_of_unknown_symbol() {
        let trace = scalar_trace();
        let index = ChangeIndex::of(&trace);
        assert_eq!(index.value_at(&trace, "?", 10), None);
        assert!(!index.has_changes("?"));
        assert!(index.changes_in(&trace, "?", 0, 100).is_empty());
    }

    #[test]
    fn test_changes_in_window() {
        let trace = scalar_trace();
        let index = ChangeIndex::of(&trace);
        let times = |refs: &[ChangeRef]| {
            refs.iter()
                .map(|&ii| index.change(&trace, ii).time)
                .collect::<Vec<_>>()
        };
        assert_eq!(times(index.changes_in(&trace, "!", 0, 25)), [0, 10, 25]);
        assert_eq!(times(index.changes_in(&trace, "!", 5, 20)), [10]);
        assert_eq!(times(index.changes_in(&trace, "!", 10, 10)), [10]);
        assert_eq!(times(index.changes_in(&trace, "!", 26, 100)), [] as [u64; 0]);
    }

    #[test]
    fn test_last_emitted_wins_on_equal_timestamps() {
        // two changes for the same symbol at the same time never happen in a
        // well formed dump, but when they do, the later emission is the one
        // rendered
        let input = "$var wire 1 ! clk $end\n$enddefinitions $end\n#5\n0!\n1!";
        let trace = decode(input.as_bytes()).unwrap();
        let index = ChangeIndex::of(&trace);
        assert_eq!(
            index.value_at(&trace, "!", 5),
            Some(&SignalValue::Scalar(Bit::One))
        );
    }

    #[test]
    fn test_per_symbol_time_order_from_interleaved_log() {
        let input = "$var wire 1 ! a $end
$var wire 1 \" b $end
$enddefinitions $end
#0
0!
0\"
#10
1\"
#20
1!";
        let trace = decode(input.as_bytes()).unwrap();
        let index = ChangeIndex::of(&trace);
        let times: Vec<u64> = index
            .changes_for("!")
            .iter()
            .map(|&ii| index.change(&trace, ii).time)
            .collect();
        assert_eq!(times, [0, 20]);
        assert_eq!(index.symbol_count(), 2);
    }
}
