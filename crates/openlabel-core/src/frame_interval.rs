//! Frame interval algebra.
//!
//! A [`FrameInterval`] is a closed range of frame numbers. A
//! [`FrameIntervals`] set keeps its intervals sorted, non-overlapping and
//! separated by at least one missing frame; any insertion that overlaps or
//! touches an existing interval merges into it.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{OpenLabelError, Result};

/// Closed `[start, end]` range of frame numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawFrameInterval")]
pub struct FrameInterval {
    #[serde(rename = "frame_start")]
    start: u64,
    #[serde(rename = "frame_end")]
    end: u64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFrameInterval {
    frame_start: u64,
    frame_end: u64,
}

impl TryFrom<RawFrameInterval> for FrameInterval {
    type Error = OpenLabelError;

    fn try_from(raw: RawFrameInterval) -> Result<Self> {
        Self::new(raw.frame_start, raw.frame_end)
    }
}

impl FrameInterval {
    /// Create an interval, rejecting `start > end`.
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start > end {
            return Err(OpenLabelError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Interval covering a single frame.
    #[inline]
    pub fn single(frame: u64) -> Self {
        Self {
            start: frame,
            end: frame,
        }
    }

    #[inline]
    pub fn start(self) -> u64 {
        self.start
    }

    #[inline]
    pub fn end(self) -> u64 {
        self.end
    }

    /// Number of frames covered.
    #[inline]
    /// Saturates at `u64::MAX` for the full `[0, u64::MAX]` range.
    pub fn len(self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }

    #[inline]
    pub fn contains(self, frame: u64) -> bool {
        frame >= self.start && frame <= self.end
    }

    /// Check if two intervals share at least one frame.
    pub fn overlaps(self, other: Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// True if the two intervals overlap or are directly adjacent.
    pub fn touches(self, other: Self) -> bool {
        let (a, b) = if self.start <= other.start {
            (self, other)
        } else {
            (other, self)
        };
        a.end.saturating_add(1) >= b.start
    }

    /// Compute the intersection of two intervals, if any.
    pub fn intersection(self, other: Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Self {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    /// Iterate over every frame number in the interval.
    pub fn frames(self) -> impl Iterator<Item = u64> {
        self.start..=self.end
    }
}

impl From<u64> for FrameInterval {
    fn from(frame: u64) -> Self {
        Self::single(frame)
    }
}

/// Normalized set of frame intervals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<FrameInterval>", into = "Vec<FrameInterval>")]
pub struct FrameIntervals {
    intervals: SmallVec<[FrameInterval; 2]>,
}

impl FrameIntervals {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a normalized set from arbitrary (possibly overlapping) intervals.
    pub fn normalize(intervals: impl IntoIterator<Item = FrameInterval>) -> Self {
        let mut sorted: SmallVec<[FrameInterval; 2]> = intervals.into_iter().collect();
        sorted.sort_unstable();

        let mut merged: SmallVec<[FrameInterval; 2]> = SmallVec::with_capacity(sorted.len());
        for fi in sorted {
            match merged.last_mut() {
                Some(last) if last.end.saturating_add(1) >= fi.start => {
                    last.end = last.end.max(fi.end);
                }
                _ => merged.push(fi),
            }
        }
        Self { intervals: merged }
    }

    /// Build a normalized set from `(start, end)` pairs, rejecting malformed ones.
    pub fn from_pairs(pairs: &[(u64, u64)]) -> Result<Self> {
        let intervals = pairs
            .iter()
            .map(|&(s, e)| FrameInterval::new(s, e))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::normalize(intervals))
    }

    /// Set holding a single interval.
    pub fn from_interval(interval: FrameInterval) -> Self {
        let mut intervals = SmallVec::new();
        intervals.push(interval);
        Self { intervals }
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Number of disjoint intervals in the set.
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = FrameInterval> + '_ {
        self.intervals.iter().copied()
    }

    pub fn as_slice(&self) -> &[FrameInterval] {
        &self.intervals
    }

    /// Iterate over every frame number covered by the set, ascending.
    pub fn frames(&self) -> impl Iterator<Item = u64> + '_ {
        self.intervals.iter().flat_map(|fi| fi.frames())
    }

    /// Total number of frames covered.
    pub fn frame_count(&self) -> u64 {
        self.intervals
            .iter()
            .fold(0u64, |acc, fi| acc.saturating_add(fi.len()))
    }

    /// Add one interval in place, merging overlapping or adjacent neighbours.
    pub fn union_interval(&mut self, interval: FrameInterval) {
        let lo = self
            .intervals
            .partition_point(|fi| fi.end.saturating_add(1) < interval.start);
        let hi = self
            .intervals
            .partition_point(|fi| fi.start <= interval.end.saturating_add(1));

        if lo == hi {
            self.intervals.insert(lo, interval);
            return;
        }

        let merged = FrameInterval {
            start: self.intervals[lo].start.min(interval.start),
            end: self.intervals[hi - 1].end.max(interval.end),
        };
        self.intervals.drain(lo..hi);
        self.intervals.insert(lo, merged);
    }

    /// Union with another set, in place.
    pub fn union(&mut self, other: &Self) {
        for fi in other.iter() {
            self.union_interval(fi);
        }
    }

    /// Union as a new value.
    pub fn united(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.union(other);
        out
    }

    /// Frames present in both sets.
    pub fn intersect(&self, other: &Self) -> Self {
        let mut out = SmallVec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.intervals.len() && j < other.intervals.len() {
            let a = self.intervals[i];
            let b = other.intervals[j];
            if let Some(common) = a.intersection(b) {
                out.push(common);
            }
            if a.end < b.end {
                i += 1;
            } else {
                j += 1;
            }
        }
        Self { intervals: out }
    }

    /// Frames of `self` not covered by `other`. Intervals are split where
    /// `other` cuts through them.
    pub fn difference(&self, other: &Self) -> Self {
        let mut out: SmallVec<[FrameInterval; 2]> = SmallVec::new();
        for fi in self.iter() {
            let mut start = fi.start;
            let mut open = true;
            for cut in other.iter() {
                if cut.end < start {
                    continue;
                }
                if cut.start > fi.end {
                    break;
                }
                if cut.start > start {
                    out.push(FrameInterval {
                        start,
                        end: cut.start - 1,
                    });
                }
                if cut.end >= fi.end {
                    open = false;
                    break;
                }
                start = cut.end + 1;
            }
            if open {
                out.push(FrameInterval { start, end: fi.end });
            }
        }
        Self { intervals: out }
    }

    /// Check if a frame lies within any interval of the set.
    pub fn contains(&self, frame: u64) -> bool {
        let idx = self.intervals.partition_point(|fi| fi.end < frame);
        self.intervals
            .get(idx)
            .map(|fi| fi.contains(frame))
            .unwrap_or(false)
    }

    /// Check if a whole interval is covered by a single interval of the set.
    pub fn contains_interval(&self, interval: FrameInterval) -> bool {
        let idx = self.intervals.partition_point(|fi| fi.end < interval.start);
        self.intervals
            .get(idx)
            .map(|fi| fi.start <= interval.start && interval.end <= fi.end)
            .unwrap_or(false)
    }

    /// Outer bounds `(min start, max end)`, or `None` for an empty set.
    pub fn outer(&self) -> Option<FrameInterval> {
        let first = self.intervals.first()?;
        let last = self.intervals.last()?;
        Some(FrameInterval {
            start: first.start,
            end: last.end,
        })
    }
}

impl From<FrameInterval> for FrameIntervals {
    fn from(interval: FrameInterval) -> Self {
        Self::from_interval(interval)
    }
}

impl From<Vec<FrameInterval>> for FrameIntervals {
    fn from(intervals: Vec<FrameInterval>) -> Self {
        Self::normalize(intervals)
    }
}

impl From<FrameIntervals> for Vec<FrameInterval> {
    fn from(set: FrameIntervals) -> Self {
        set.intervals.into_vec()
    }
}

impl FromIterator<FrameInterval> for FrameIntervals {
    fn from_iter<I: IntoIterator<Item = FrameInterval>>(iter: I) -> Self {
        Self::normalize(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fi(s: u64, e: u64) -> FrameInterval {
        FrameInterval::new(s, e).unwrap()
    }

    #[test]
    fn test_malformed_interval_rejected() {
        let err = FrameInterval::new(5, 2).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidInterval);
        assert!(FrameIntervals::from_pairs(&[(0, 3), (9, 1)]).is_err());
    }

    #[test]
    fn test_touching_intervals_merge() {
        let mut set = FrameIntervals::from_interval(fi(0, 4));
        set.union_interval(fi(5, 9));
        assert_eq!(set.as_slice(), &[fi(0, 9)]);
    }

    #[test]
    fn test_gap_of_one_frame_kept() {
        let mut set = FrameIntervals::from_interval(fi(0, 4));
        set.union_interval(fi(6, 9));
        assert_eq!(set.as_slice(), &[fi(0, 4), fi(6, 9)]);
        assert!(!set.contains(5));
        assert!(set.contains(6));
    }

    #[test]
    fn test_union_bridges_several() {
        let mut set = FrameIntervals::from_pairs(&[(0, 1), (4, 5), (8, 9), (20, 21)]).unwrap();
        set.union_interval(fi(2, 7));
        assert_eq!(set.as_slice(), &[fi(0, 9), fi(20, 21)]);
    }

    #[test]
    fn test_intersect() {
        let a = FrameIntervals::from_pairs(&[(0, 10), (20, 30)]).unwrap();
        let b = FrameIntervals::from_pairs(&[(5, 25)]).unwrap();
        let c = a.intersect(&b);
        assert_eq!(c.as_slice(), &[fi(5, 10), fi(20, 25)]);
        assert!(a.intersect(&FrameIntervals::new()).is_empty());
    }

    #[test]
    fn test_contains_interval() {
        let set = FrameIntervals::from_pairs(&[(0, 10), (20, 30)]).unwrap();
        assert!(set.contains_interval(fi(2, 8)));
        assert!(!set.contains_interval(fi(8, 22)));
    }

    #[test]
    fn test_difference_splits_and_trims() {
        let set = FrameIntervals::from_pairs(&[(0, 10), (20, 30)]).unwrap();

        let split = set.difference(&fi(4, 6).into());
        assert_eq!(split.as_slice(), &[fi(0, 3), fi(7, 10), fi(20, 30)]);

        let trimmed = set.difference(&FrameIntervals::from_pairs(&[(0, 2), (25, 40)]).unwrap());
        assert_eq!(trimmed.as_slice(), &[fi(3, 10), fi(20, 24)]);

        assert!(set.difference(&fi(0, 30).into()).is_empty());
        assert_eq!(set.difference(&FrameIntervals::new()), set);
    }

    #[test]
    fn test_full_range_len_saturates() {
        let all = fi(0, u64::MAX);
        assert_eq!(all.len(), u64::MAX);
        assert_eq!(FrameIntervals::from_interval(all).frame_count(), u64::MAX);
        assert_eq!(fi(3, 3).len(), 1);
    }

    #[test]
    fn test_outer_of_empty() {
        assert_eq!(FrameIntervals::new().outer(), None);
    }

    #[test]
    fn test_serde_shape() {
        let set = FrameIntervals::from_pairs(&[(0, 3)]).unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"[{"frame_start":0,"frame_end":3}]"#);

        let bad: std::result::Result<FrameIntervals, _> =
            serde_json::from_str(r#"[{"frame_start":4,"frame_end":3}]"#);
        assert!(bad.is_err());

        let merged: FrameIntervals = serde_json::from_str(
            r#"[{"frame_start":4,"frame_end":6},{"frame_start":0,"frame_end":3}]"#,
        )
        .unwrap();
        assert_eq!(merged.as_slice(), &[fi(0, 6)]);
    }

    fn disjoint_pairs() -> impl Strategy<Value = Vec<(u64, u64)>> {
        prop::collection::vec((0u64..50, 0u64..20), 1..12).prop_map(|steps| {
            let mut cursor = 0;
            steps
                .into_iter()
                .map(|(gap, len)| {
                    let start = cursor + gap + 2;
                    let end = start + len;
                    cursor = end;
                    (start, end)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_normalize_then_outer(pairs in disjoint_pairs()) {
            let set = FrameIntervals::from_pairs(&pairs).unwrap();
            let min = pairs.iter().map(|p| p.0).min().unwrap();
            let max = pairs.iter().map(|p| p.1).max().unwrap();
            prop_assert_eq!(set.outer(), Some(fi(min, max)));
        }

        #[test]
        fn prop_union_commutes(a in disjoint_pairs(), b in disjoint_pairs()) {
            let sa = FrameIntervals::from_pairs(&a).unwrap();
            let sb = FrameIntervals::from_pairs(&b).unwrap();
            prop_assert_eq!(sa.united(&sb), sb.united(&sa));
        }

        #[test]
        fn prop_union_stays_normalized(a in disjoint_pairs(), extra in (0u64..400, 0u64..40)) {
            let mut set = FrameIntervals::from_pairs(&a).unwrap();
            set.union_interval(fi(extra.0, extra.0 + extra.1));
            for w in set.as_slice().windows(2) {
                prop_assert!(w[0].end() + 1 < w[1].start());
            }
            prop_assert!(set.contains(extra.0));
        }

        #[test]
        fn prop_difference_disjoint_from_cut(a in disjoint_pairs(), b in disjoint_pairs()) {
            let sa = FrameIntervals::from_pairs(&a).unwrap();
            let sb = FrameIntervals::from_pairs(&b).unwrap();
            let diff = sa.difference(&sb);
            prop_assert!(diff.intersect(&sb).is_empty());
            prop_assert_eq!(diff.united(&sa.intersect(&sb)), sa);
        }
    }
}
