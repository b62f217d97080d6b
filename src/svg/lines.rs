//! `<line>` primitives in absolute page coordinates.

use roxmltree::Node;

use super::numbers::{parse_fixed, parse_translate};
use super::PageContext;
use crate::error::Result;
use crate::model::Coord;

/// A line with its translate transform applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct RawLine {
    pub x1: Coord,
    pub y1: Coord,
    pub x2: Coord,
    pub y2: Coord,
}

/// A horizontal line, normalized so that `x1 <= x2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct HLine {
    pub x1: Coord,
    pub x2: Coord,
    pub y: Coord,
}

impl RawLine {
    pub fn is_horizontal(&self) -> bool {
        self.y1 == self.y2
    }

    pub fn is_vertical(&self) -> bool {
        self.x1 == self.x2
    }

    pub fn to_horizontal(self) -> Option<HLine> {
        self.is_horizontal().then(|| HLine {
            x1: self.x1.min(self.x2),
            x2: self.x1.max(self.x2),
            y: self.y1,
        })
    }
}

pub(super) fn is_line(node: &Node) -> bool {
    node.is_element() && node.tag_name().name() == "line"
}

/// True when some enclosing `<g>` carries a `color` attribute. Such
/// groups hold the skyline markers, never engraved staff lines.
pub(super) fn in_colored_group(node: &Node) -> bool {
    node.ancestors()
        .skip(1)
        .any(|a| a.is_element() && a.tag_name().name() == "g" && a.attribute("color").is_some())
}

/// Read a `<line>` element. Missing coordinates default to 0 as in SVG.
pub(super) fn read_line(node: &Node, ctx: &PageContext) -> Result<RawLine> {
    let coord = |name: &str| -> Result<Coord> {
        match node.attribute(name) {
            None => Ok(0),
            Some(raw) => parse_fixed(raw).ok_or_else(|| {
                ctx.malformed(node, format!("a decimal number for '{name}'"), format!("'{raw}'"))
            }),
        }
    };

    let (tx, ty) = match node.attribute("transform") {
        None => (0, 0),
        Some(raw) => parse_translate(raw).ok_or_else(|| {
            ctx.malformed(node, "a 'translate(x, y)' transform", format!("'{raw}'"))
        })?,
    };

    Ok(RawLine {
        x1: coord("x1")? + tx,
        y1: coord("y1")? + ty,
        x2: coord("x2")? + tx,
        y2: coord("y2")? + ty,
    })
}

/// All horizontal lines outside coloured groups, sorted by `(y, x1)`.
pub(super) fn staff_line_candidates(ctx: &PageContext) -> Result<Vec<HLine>> {
    let mut lines = Vec::new();
    for node in ctx.doc.descendants().filter(is_line) {
        if in_colored_group(&node) {
            continue;
        }
        if let Some(h) = read_line(&node, ctx)?.to_horizontal() {
            lines.push(h);
        }
    }
    lines.sort_by_key(|l| (l.y, l.x1));
    Ok(lines)
}
