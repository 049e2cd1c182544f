//! Vector path records embedded in a vector-mask tagged block
//! (`spec.md` §3.11 / §4.G): a flat sequence of 26-byte records, each
//! decoded by a 2-byte selector.

use std::io::Write;

use crate::error::VectorPathError;
use crate::sections::{PsdBuffer, PsdCursor, PsdSerialize};

const CLOSED_SUBPATH_LENGTH: u16 = 0;
const OPEN_SUBPATH_LENGTH: u16 = 1;
const CLOSED_KNOT_LINKED: u16 = 2;
const CLOSED_KNOT_UNLINKED: u16 = 3;
const OPEN_KNOT_LINKED: u16 = 4;
const OPEN_KNOT_UNLINKED: u16 = 5;
const PATH_FILL_RULE: u16 = 6;
const CLIPBOARD: u16 = 7;
const INITIAL_FILL_RULE: u16 = 8;

/// Which boolean operation a subpath combines into the overall path with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathOperation {
    XorExclude,
    Union,
    SubtractOrNot,
    Intersect,
}

impl PathOperation {
    fn from_i16(value: i16) -> PathOperation {
        match value {
            0 => PathOperation::XorExclude,
            1 => PathOperation::Union,
            3 => PathOperation::Intersect,
            _ => PathOperation::SubtractOrNot,
        }
    }

    fn as_i16(&self) -> i16 {
        match self {
            PathOperation::XorExclude => 0,
            PathOperation::Union => 1,
            PathOperation::SubtractOrNot => 2,
            PathOperation::Intersect => 3,
        }
    }
}

/// A single `(y, x)` point in document-relative fixed point (raw / 2^24).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
    pub y: f64,
    pub x: f64,
}

const FIXED_POINT_SCALE: f64 = 16_777_216.0; // 2^24

impl PathPoint {
    fn read(cursor: &mut PsdCursor) -> PathPoint {
        let y = cursor.read_i32() as f64 / FIXED_POINT_SCALE;
        let x = cursor.read_i32() as f64 / FIXED_POINT_SCALE;
        PathPoint { y, x }
    }

    fn write<T: Write>(&self, buffer: &mut PsdBuffer<T>) {
        let y = (self.y * FIXED_POINT_SCALE).round() as i32;
        let x = (self.x * FIXED_POINT_SCALE).round() as i32;
        buffer.write(y.to_be_bytes());
        buffer.write(x.to_be_bytes());
    }
}

/// One knot: the preceding, anchor and leaving control points of a Bezier
/// segment, plus whether its tangent handles are linked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Knot {
    pub linked: bool,
    pub preceding: PathPoint,
    pub anchor: PathPoint,
    pub leaving: PathPoint,
}

/// A closed or open run of knots, combined into the overall path via
/// `operation`.
#[derive(Debug, Clone, PartialEq)]
pub struct Subpath {
    pub closed: bool,
    pub operation: PathOperation,
    pub origination_index: i16,
    pub knots: Vec<Knot>,
}

/// One raw 26-byte vector path record, preserved for fill-rule/clipboard
/// markers that don't belong to any subpath.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathRecord {
    PathFillRule,
    Clipboard { above: bool },
    InitialFillRule { all_planes: bool },
}

/// The full vector path: zero or more subpaths plus loose fill/clipboard
/// markers, in on-disk record order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VectorPath {
    pub subpaths: Vec<Subpath>,
    pub records: Vec<PathRecord>,
}

impl VectorPath {
    /// Parse a flat run of 26-byte records (the body of a vector-mask
    /// tagged block, after its own header fields).
    pub fn from_records(cursor: &mut PsdCursor, record_count: usize) -> Result<VectorPath, VectorPathError> {
        let mut path = VectorPath::default();
        let mut pending: Option<Subpath> = None;
        let mut pending_remaining = 0usize;

        for _ in 0..record_count {
            let selector = cursor.read_u16();
            match selector {
                CLOSED_SUBPATH_LENGTH | OPEN_SUBPATH_LENGTH => {
                    if let Some(subpath) = pending.take() {
                        path.subpaths.push(subpath);
                    }
                    let knot_count = cursor.read_u16() as usize;
                    let operation = PathOperation::from_i16(cursor.read_i16());
                    let origination_index = cursor.read_i16();
                    cursor.read(16); // remaining record padding
                    pending = Some(Subpath {
                        closed: selector == CLOSED_SUBPATH_LENGTH,
                        operation,
                        origination_index,
                        knots: Vec::with_capacity(knot_count),
                    });
                    pending_remaining = knot_count;
                }
                CLOSED_KNOT_LINKED | CLOSED_KNOT_UNLINKED | OPEN_KNOT_LINKED | OPEN_KNOT_UNLINKED => {
                    let linked = selector == CLOSED_KNOT_LINKED || selector == OPEN_KNOT_LINKED;
                    let preceding = PathPoint::read(cursor);
                    let anchor = PathPoint::read(cursor);
                    let leaving = PathPoint::read(cursor);
                    if let Some(subpath) = pending.as_mut() {
                        subpath.knots.push(Knot {
                            linked,
                            preceding,
                            anchor,
                            leaving,
                        });
                        pending_remaining = pending_remaining.saturating_sub(1);
                        if pending_remaining == 0 {
                            path.subpaths.push(pending.take().unwrap());
                        }
                    }
                }
                PATH_FILL_RULE => {
                    cursor.read(24);
                    path.records.push(PathRecord::PathFillRule);
                }
                CLIPBOARD => {
                    let above = cursor.read_u32() != 0;
                    cursor.read(20);
                    path.records.push(PathRecord::Clipboard { above });
                }
                INITIAL_FILL_RULE => {
                    let all_planes = cursor.read_u16() != 0;
                    cursor.read(22);
                    path.records.push(PathRecord::InitialFillRule { all_planes });
                }
                other => return Err(VectorPathError::UnknownSelector { selector: other }),
            }
        }

        if let Some(subpath) = pending.take() {
            path.subpaths.push(subpath);
        }

        Ok(path)
    }

    /// Total number of 26-byte records this path serializes to.
    pub fn record_count(&self) -> usize {
        self.subpaths.iter().map(|s| 1 + s.knots.len()).sum::<usize>() + self.records.len()
    }
}

impl PsdSerialize for VectorPath {
    fn write<T: Write>(&self, buffer: &mut PsdBuffer<T>) {
        for subpath in &self.subpaths {
            let selector = if subpath.closed {
                CLOSED_SUBPATH_LENGTH
            } else {
                OPEN_SUBPATH_LENGTH
            };
            buffer.write(selector.to_be_bytes());
            buffer.write((subpath.knots.len() as u16).to_be_bytes());
            buffer.write(subpath.operation.as_i16().to_be_bytes());
            buffer.write(subpath.origination_index.to_be_bytes());
            buffer.write([0u8; 16]);

            for knot in &subpath.knots {
                let selector = match (subpath.closed, knot.linked) {
                    (true, true) => CLOSED_KNOT_LINKED,
                    (true, false) => CLOSED_KNOT_UNLINKED,
                    (false, true) => OPEN_KNOT_LINKED,
                    (false, false) => OPEN_KNOT_UNLINKED,
                };
                buffer.write(selector.to_be_bytes());
                knot.preceding.write(buffer);
                knot.anchor.write(buffer);
                knot.leaving.write(buffer);
            }
        }

        for record in &self.records {
            match record {
                PathRecord::PathFillRule => {
                    buffer.write(PATH_FILL_RULE.to_be_bytes());
                    buffer.write([0u8; 24]);
                }
                PathRecord::Clipboard { above } => {
                    buffer.write(CLIPBOARD.to_be_bytes());
                    buffer.write((*above as u32).to_be_bytes());
                    buffer.write([0u8; 20]);
                }
                PathRecord::InitialFillRule { all_planes } => {
                    buffer.write(INITIAL_FILL_RULE.to_be_bytes());
                    buffer.write((*all_planes as u16).to_be_bytes());
                    buffer.write([0u8; 22]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_path() -> VectorPath {
        VectorPath {
            subpaths: vec![Subpath {
                closed: true,
                operation: PathOperation::Union,
                origination_index: -1,
                knots: vec![Knot {
                    linked: true,
                    preceding: PathPoint { y: 0.25, x: 0.1 },
                    anchor: PathPoint { y: 0.5, x: 0.5 },
                    leaving: PathPoint { y: 0.75, x: 0.9 },
                }],
            }],
            records: vec![PathRecord::PathFillRule],
        }
    }

    #[test]
    fn round_trips_a_closed_subpath_with_one_knot() {
        let path = sample_path();
        let mut bytes = Vec::new();
        let mut buffer = PsdBuffer::new(&mut bytes);
        path.write(&mut buffer);

        let mut cursor = PsdCursor::new(&bytes);
        let parsed = VectorPath::from_records(&mut cursor, path.record_count()).unwrap();
        assert_eq!(parsed, path);
    }

    #[test]
    fn unknown_selector_is_an_error() {
        let mut bytes = Vec::new();
        let mut buffer = PsdBuffer::new(&mut bytes);
        buffer.write(999u16.to_be_bytes());
        buffer.write([0u8; 24]);

        let mut cursor = PsdCursor::new(&bytes);
        assert_eq!(
            VectorPath::from_records(&mut cursor, 1),
            Err(VectorPathError::UnknownSelector { selector: 999 })
        );
    }
}
