//! Staff detection from the engraved staff lines, and association of
//! each staff with its own pair of skylines.

use super::lines::HLine;
use super::skyline::{clip_segments, Skyline};
use super::PageContext;
use crate::error::Result;
use crate::model::{Coord, Staff};

/// Lines per staff.
const STAFF_LINES: usize = 5;

/// The five-line frame of a staff, before skylines are attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct StaffFrame {
    pub x: Coord,
    pub y: Coord,
    pub width: Coord,
    pub height: Coord,
}

impl StaffFrame {
    fn bottom(&self) -> Coord {
        self.y + self.height
    }
}

/// Length of the run of lines starting at `start` that share its x-span
/// and are evenly spaced by a non-zero gap.
fn run_length(lines: &[HLine], start: usize) -> usize {
    let first = lines[start];
    let Some(second) = lines.get(start + 1) else {
        return 1;
    };
    let gap = second.y - first.y;
    if gap == 0 || (second.x1, second.x2) != (first.x1, first.x2) {
        return 1;
    }

    let mut len = 2;
    while let Some(next) = lines.get(start + len) {
        let prev = lines[start + len - 1];
        if (next.x1, next.x2) != (first.x1, first.x2) || next.y - prev.y != gap {
            break;
        }
        len += 1;
    }
    len
}

/// Find staves among lines sorted by `(y, x1)`. Only runs of exactly five
/// evenly spaced lines with the same x-span count.
pub(super) fn detect_staves(lines: &[HLine]) -> Vec<StaffFrame> {
    let mut frames = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let len = run_length(lines, i);
        if len == STAFF_LINES {
            let top = lines[i];
            let bottom = lines[i + STAFF_LINES - 1];
            frames.push(StaffFrame {
                x: top.x1,
                y: top.y,
                width: top.x2 - top.x1,
                height: bottom.y - top.y,
            });
            i += STAFF_LINES;
        } else {
            // the last line of a broken run may start a new one
            i += (len - 1).max(1);
        }
    }

    frames
}

/// Index of the skyline with the greatest top not below `y`.
fn top_skyline_index(skylines: &[Skyline], y: Coord) -> Option<usize> {
    skylines
        .iter()
        .enumerate()
        .filter(|(_, s)| s.top <= y)
        .max_by_key(|(i, s)| (s.top, *i))
        .map(|(i, _)| i)
}

/// Index of the skyline with the smallest bottom not above `y`.
fn bottom_skyline_index(skylines: &[Skyline], y: Coord) -> Option<usize> {
    skylines
        .iter()
        .enumerate()
        .filter(|(_, s)| s.bottom >= y)
        .min_by_key(|(i, s)| (s.bottom, *i))
        .map(|(i, _)| i)
}

/// Attach the staff skylines to every detected frame.
pub(super) fn attach_skylines(
    frames: &[StaffFrame],
    staff_top: &[Skyline],
    staff_bottom: &[Skyline],
    ctx: &PageContext,
) -> Result<Vec<Staff>> {
    if staff_top.len() != staff_bottom.len() {
        return Err(ctx.geometry(format!(
            "mismatched skyline counts: {} staff top skylines but {} staff bottom skylines",
            staff_top.len(),
            staff_bottom.len()
        )));
    }

    frames
        .iter()
        .enumerate()
        .map(|(n, frame)| {
            let top_idx = top_skyline_index(staff_top, frame.y);
            let bottom_idx = bottom_skyline_index(staff_bottom, frame.bottom());
            let idx = match (top_idx, bottom_idx) {
                (Some(t), Some(b)) if t == b => t,
                (t, b) => {
                    return Err(ctx.geometry(format!(
                        "staff {n} (y: {}, height: {}) has inconsistent skylines \
                         (top skyline {t:?}, bottom skyline {b:?})",
                        frame.y, frame.height
                    )))
                }
            };

            let (lo, hi) = (frame.x, frame.x + frame.width);
            let full_top_skyline = clip_segments(&staff_top[idx].segments, lo, hi);
            let full_bottom_skyline = clip_segments(&staff_bottom[idx].segments, lo, hi);

            let top_skyline = full_top_skyline.iter().map(|s| s.y).min();
            let bottom_skyline = full_bottom_skyline.iter().map(|s| s.y).max();
            let (Some(top_skyline), Some(bottom_skyline)) = (top_skyline, bottom_skyline) else {
                return Err(ctx.geometry(format!(
                    "skylines of staff {n} don't overlap its horizontal extent"
                )));
            };

            Ok(Staff {
                x: frame.x,
                y: frame.y,
                width: frame.width,
                height: frame.height,
                top_skyline,
                bottom_skyline,
                full_top_skyline,
                full_bottom_skyline,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evenly_spaced(count: usize, y0: Coord, gap: Coord) -> Vec<HLine> {
        (0..count)
            .map(|i| HLine { x1: 100, x2: 900, y: y0 + i as Coord * gap })
            .collect()
    }

    #[test]
    fn five_lines_make_one_staff() {
        let frames = detect_staves(&evenly_spaced(5, 1000, 10));
        assert_eq!(frames, vec![StaffFrame { x: 100, y: 1000, width: 800, height: 40 }]);
    }

    #[test]
    fn four_or_six_lines_make_none() {
        assert!(detect_staves(&evenly_spaced(4, 1000, 10)).is_empty());
        assert!(detect_staves(&evenly_spaced(6, 1000, 10)).is_empty());
    }

    #[test]
    fn two_staves_with_larger_gap_between() {
        let mut lines = evenly_spaced(5, 0, 10);
        lines.extend(evenly_spaced(5, 200, 10));
        let frames = detect_staves(&lines);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].y, 200);
    }

    #[test]
    fn stray_line_before_staff_is_skipped() {
        let mut lines = vec![HLine { x1: 100, x2: 900, y: -25 }];
        lines.extend(evenly_spaced(5, 0, 10));
        let frames = detect_staves(&lines);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].y, 0);
    }

    #[test]
    fn different_spans_break_the_run() {
        let mut lines = evenly_spaced(5, 0, 10);
        lines[2].x2 = 800;
        assert!(detect_staves(&lines).is_empty());
    }

    #[test]
    fn skyline_lookups() {
        let sky = |top, bottom| Skyline {
            segments: Vec::new(),
            left: 0,
            right: 10,
            top,
            bottom,
        };
        let list = [sky(0, 50), sky(100, 150)];
        assert_eq!(top_skyline_index(&list, 120), Some(1));
        assert_eq!(top_skyline_index(&list, 20), Some(0));
        assert_eq!(top_skyline_index(&list, -1), None);
        assert_eq!(bottom_skyline_index(&list, 40), Some(0));
        assert_eq!(bottom_skyline_index(&list, 140), Some(1));
        assert_eq!(bottom_skyline_index(&list, 151), None);
    }
}
