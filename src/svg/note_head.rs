//! Note heads: `<g>` groups whose id carries the head's half extents, its
//! bar number and the source location of the note.

use roxmltree::Node;

use super::numbers::{parse_fixed, parse_leading_translate};
use super::PageContext;
use crate::error::Result;
use crate::id_record::{IdLocation, IdRecord};
use crate::model::{Coord, NoteHead};

fn is_marked_group(node: &Node) -> bool {
    node.is_element()
        && node.tag_name().name() == "g"
        && node.attribute("id").is_some_and(|id| id.starts_with('#'))
}

/// First `path` or `use` element below the group; the translation its
/// transform starts with is the head's centre.
fn glyph_center(group: &Node, ctx: &PageContext) -> Result<(Coord, Coord)> {
    let glyph = group
        .descendants()
        .skip(1)
        .find(|n| n.is_element() && matches!(n.tag_name().name(), "path" | "use"))
        .ok_or_else(|| ctx.geometry_at(group, "note head group without any glyph"))?;

    let transform = glyph
        .attribute("transform")
        .ok_or_else(|| ctx.geometry_at(&glyph, "note head glyph without a transform"))?;

    parse_leading_translate(transform).ok_or_else(|| {
        ctx.malformed(&glyph, "a transform starting with 'translate(x, y)'", format!("'{transform}'"))
    })
}

fn read_note_head(group: &Node, ctx: &PageContext) -> Result<NoteHead> {
    let raw_id = group.attribute("id").unwrap_or_default();
    let location = IdLocation::new(ctx.path.display().to_string(), ctx.line_of(group));
    let record = IdRecord::parse(raw_id, location)?;

    let half_extent = |field: &str| -> Result<Coord> {
        let raw = record.str(field)?;
        parse_fixed(raw)
            .filter(|v| *v >= 0)
            .ok_or_else(|| {
                ctx.malformed(group, format!("a non-negative number for '{field}'"), format!("'{raw}'"))
            })
    };
    let half_width = half_extent("x-width")?;
    let half_height = half_extent("y-height")?;
    let bar_number: u16 = record.value("bar-number")?;
    let id = record.str("origin")?.to_string();

    let (cx, cy) = glyph_center(group, ctx)?;

    Ok(NoteHead {
        id,
        left: cx - half_width,
        right: cx + half_width,
        top: cy - half_height,
        bottom: cy + half_height,
        bar_number,
    })
}

/// Every note head of the page, in document order.
pub(super) fn collect_note_heads(ctx: &PageContext) -> Result<Vec<NoteHead>> {
    ctx.doc
        .descendants()
        .filter(is_marked_group)
        .map(|group| read_note_head(&group, ctx))
        .collect()
}
