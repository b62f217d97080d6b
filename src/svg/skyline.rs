//! Skylines: the ink boundaries the typesetter draws as coloured groups
//! of line segments above and below every staff and system.

use roxmltree::Node;

use super::lines::{is_line, read_line};
use super::PageContext;
use crate::config::SkylineColors;
use crate::error::Result;
use crate::model::{Coord, Segment};

/// The horizontal segments of one coloured group and their bounding box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Skyline {
    pub segments: Vec<Segment>,
    pub left: Coord,
    pub right: Coord,
    pub top: Coord,
    pub bottom: Coord,
}

impl Skyline {
    fn from_segments(mut segments: Vec<Segment>) -> Option<Self> {
        segments.sort_by_key(|s| (s.x1, s.x2, s.y));
        Some(Self {
            left: segments.iter().map(|s| s.x1).min()?,
            right: segments.iter().map(|s| s.x2).max()?,
            top: segments.iter().map(|s| s.y).min()?,
            bottom: segments.iter().map(|s| s.y).max()?,
            segments,
        })
    }
}

/// The four skyline families of a page, each sorted top to bottom.
#[derive(Debug, Default)]
pub(super) struct Skylines {
    pub system_top: Vec<Skyline>,
    pub system_bottom: Vec<Skyline>,
    pub staff_top: Vec<Skyline>,
    pub staff_bottom: Vec<Skyline>,
}

#[derive(Clone, Copy)]
enum Family {
    SystemTop,
    SystemBottom,
    StaffTop,
    StaffBottom,
}

fn normalize_color(c: &str) -> String {
    c.trim().to_ascii_lowercase()
}

fn family_of(color: &str, colors: &SkylineColors) -> Option<Family> {
    let color = normalize_color(color);
    if color == normalize_color(&colors.system_top) {
        Some(Family::SystemTop)
    } else if color == normalize_color(&colors.system_bottom) {
        Some(Family::SystemBottom)
    } else if color == normalize_color(&colors.staff_top) {
        Some(Family::StaffTop)
    } else if color == normalize_color(&colors.staff_bottom) {
        Some(Family::StaffBottom)
    } else {
        None
    }
}

fn read_skyline(group: &Node, ctx: &PageContext) -> Result<Skyline> {
    let mut segments = Vec::new();
    for child in group.children().filter(is_line) {
        let line = read_line(&child, ctx)?;
        if line.is_horizontal() {
            if let Some(h) = line.to_horizontal().filter(|h| h.x1 != h.x2) {
                segments.push(Segment { x1: h.x1, x2: h.x2, y: h.y });
            }
        } else if !line.is_vertical() {
            return Err(ctx.geometry_at(
                &child,
                format!(
                    "a skyline segment should be either horizontal or vertical, \
                     found (x1: {}, y1: {}), (x2: {}, y2: {})",
                    line.x1, line.y1, line.x2, line.y2
                ),
            ));
        }
    }

    Skyline::from_segments(segments)
        .ok_or_else(|| ctx.geometry_at(group, "skyline group without any horizontal segment"))
}

/// Collect every skyline group of the page.
pub(super) fn collect_skylines(ctx: &PageContext, colors: &SkylineColors) -> Result<Skylines> {
    let mut skylines = Skylines::default();

    for group in ctx.doc.descendants() {
        if !(group.is_element() && group.tag_name().name() == "g") {
            continue;
        }
        let Some(family) = group.attribute("color").and_then(|c| family_of(c, colors)) else {
            continue;
        };

        let skyline = read_skyline(&group, ctx)?;
        match family {
            Family::SystemTop => skylines.system_top.push(skyline),
            Family::SystemBottom => skylines.system_bottom.push(skyline),
            Family::StaffTop => skylines.staff_top.push(skyline),
            Family::StaffBottom => skylines.staff_bottom.push(skyline),
        }
    }

    for list in [
        &mut skylines.system_top,
        &mut skylines.system_bottom,
        &mut skylines.staff_top,
        &mut skylines.staff_bottom,
    ] {
        list.sort_by_key(|s| (s.top, s.left));
    }

    Ok(skylines)
}

/// Segments overlapping `[lo, hi]`, cut down to that range.
pub(super) fn clip_segments(segments: &[Segment], lo: Coord, hi: Coord) -> Vec<Segment> {
    segments
        .iter()
        .filter(|s| s.x2 >= lo && s.x1 <= hi)
        .map(|s| Segment {
            x1: s.x1.max(lo),
            x2: s.x2.min(hi),
            y: s.y,
        })
        .collect()
}
