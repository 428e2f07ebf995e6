use std::collections::HashSet;
use std::ops::Range;

use crate::error::{DecodeError, DecodeResult};

/// Offsets visited while following a directory chain.
///
/// The IFD chain of a TIFF stream should be a simple list. A malicious or damaged file can link
/// back to an earlier directory, or simply be very long; both end the walk here instead of
/// looping. An offset seen twice is a cycle, and there is a ceiling on the number of distinct
/// offsets accepted.
#[derive(Debug)]
pub struct ChainGuard {
    visited: HashSet<usize>,
    ceiling: usize,
}

impl ChainGuard {
    pub fn new(ceiling: usize) -> Self {
        ChainGuard {
            visited: HashSet::new(),
            ceiling,
        }
    }

    /// Record a visit to `offset`.
    pub fn visit(&mut self, offset: usize) -> DecodeResult<()> {
        if self.visited.contains(&offset) {
            return Err(DecodeError::CycleInOffsets);
        }

        if self.visited.len() >= self.ceiling {
            return Err(DecodeError::LimitsExceeded);
        }

        self.visited.insert(offset);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}

/// Byte ranges occupied by directories parsed so far in one stream.
///
/// Bytes inside a directory's entry table are never a valid location for another directory or
/// for an out-of-line value. Garbage offsets in vendor data point there surprisingly often.
#[derive(Clone, Debug, Default)]
pub struct ClaimedRanges {
    ranges: Vec<Range<usize>>,
}

impl ClaimedRanges {
    pub fn new() -> Self {
        ClaimedRanges::default()
    }

    pub fn claim(&mut self, range: Range<usize>) {
        if !range.is_empty() {
            self.ranges.push(range);
        }
    }

    /// Whether `offset` lies in any claimed range.
    pub fn contains(&self, offset: usize) -> bool {
        self.ranges.iter().any(|r| r.contains(&offset))
    }

    /// Whether `[offset, offset + len)` shares a byte with any claimed range.
    pub fn overlaps(&self, offset: usize, len: usize) -> bool {
        let end = offset.saturating_add(len);
        len > 0 && self.ranges.iter().any(|r| offset < r.end && r.start < end)
    }

    /// Fail with [`DecodeError::ClaimedRange`] if `offset` is claimed.
    pub fn check(&self, offset: usize) -> DecodeResult<()> {
        if self.contains(offset) {
            Err(DecodeError::ClaimedRange(offset))
        } else {
            Ok(())
        }
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

#[test]
fn cycles_are_detected() {
    let mut guard = ChainGuard::new(10);

    guard.visit(0x20).expect("first visit is valid");
    guard.visit(0x800).expect("non-existing link is valid");
    assert_eq!(
        guard.visit(0x20).expect_err("cycle must be detected"),
        DecodeError::CycleInOffsets
    );
}

#[test]
fn reflective_cycle() {
    let mut guard = ChainGuard::new(10);

    guard.visit(0x20).expect("first visit is valid");
    guard
        .visit(0x20)
        .expect_err("self-referential cycle must be detected");
}

#[test]
fn late_cycle() {
    let mut guard = ChainGuard::new(10);

    for offset in [0x20, 0x40, 0x60, 0x80] {
        guard.visit(offset).expect("non-existing link is valid");
    }

    guard.visit(0x40).expect_err("cycle must be detected");
    assert_eq!(guard.len(), 4);
}

#[test]
fn ceiling_is_enforced() {
    let mut guard = ChainGuard::new(2);

    guard.visit(8).expect("below the ceiling");
    guard.visit(16).expect("at the ceiling");
    assert_eq!(
        guard.visit(24).expect_err("over the ceiling"),
        DecodeError::LimitsExceeded
    );
}

#[test]
fn claimed_ranges() {
    let mut claims = ClaimedRanges::new();
    claims.claim(8..26);
    claims.claim(100..100);

    assert!(claims.contains(8));
    assert!(claims.contains(25));
    assert!(!claims.contains(26));
    assert!(!claims.contains(100), "empty ranges are never claimed");

    assert!(claims.overlaps(0, 9));
    assert!(!claims.overlaps(0, 8));
    assert!(!claims.overlaps(20, 0));
    assert!(!claims.overlaps(usize::MAX - 1, 4));
    assert_eq!(claims.check(10), Err(DecodeError::ClaimedRange(10)));
    assert_eq!(claims.len(), 1);
}
