//! Cursor boxes: maps every chord to the system it is engraved in.
//!
//! The cursor is a rectangle spanning the chord's note heads horizontally
//! and the whole system vertically:
//!   `left/right = union of head boxes`, `top/bottom = system band`
//!
//! Notes and note heads are joined on their source id. A note that shows
//! up on several pages almost always comes from repeats that were not
//! unfolded before typesetting.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Chord, Coord, CursorBox, NoteHead, Page, System};

/// Largest number of pages a track can refer to.
pub const MAX_PAGES: usize = 256;

const REPEAT_HINT: &str =
    "the score probably contains repeats; unfold them before typesetting (\\unfoldRepeats)";
const VOICE_HINT: &str =
    "voices are probably out of sync; look for unbalanced ties or missing rests in multi-voice passages";

/// Note heads of every page, by source id.
struct HeadIndex<'a> {
    pages: Vec<HashMap<&'a str, Vec<&'a NoteHead>>>,
}

impl<'a> HeadIndex<'a> {
    fn new(pages: &'a [Page]) -> Self {
        let pages = pages
            .iter()
            .map(|page| {
                let mut by_id: HashMap<&str, Vec<&NoteHead>> = HashMap::new();
                for head in &page.note_heads {
                    by_id.entry(head.id.as_str()).or_default().push(head);
                }
                by_id
            })
            .collect();
        Self { pages }
    }

    /// Indices of the pages holding `id`.
    fn pages_of(&self, id: &str) -> Vec<usize> {
        self.pages
            .iter()
            .enumerate()
            .filter(|(_, heads)| heads.contains_key(id))
            .map(|(i, _)| i)
            .collect()
    }

    fn heads(&self, page: usize, id: &str) -> &[&'a NoteHead] {
        self.pages[page].get(id).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Union of head boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BoundingBox {
    left: Coord,
    right: Coord,
    top: Coord,
    bottom: Coord,
}

impl BoundingBox {
    fn of(head: &NoteHead) -> Self {
        Self {
            left: head.left,
            right: head.right,
            top: head.top,
            bottom: head.bottom,
        }
    }

    fn union(self, other: Self) -> Self {
        Self {
            left: self.left.min(other.left),
            right: self.right.max(other.right),
            top: self.top.min(other.top),
            bottom: self.bottom.max(other.bottom),
        }
    }

    fn x_mid(&self) -> Coord {
        (self.left + self.right) / 2
    }

    fn y_mid(&self) -> Coord {
        (self.top + self.bottom) / 2
    }
}

/// Resolve one cursor box per chord.
pub fn resolve_cursor_boxes(chords: &[Chord], pages: &[Page]) -> Result<Vec<CursorBox>> {
    if pages.len() > MAX_PAGES {
        return Err(Error::Capacity {
            what: "pages",
            limit: MAX_PAGES,
        });
    }

    let index = HeadIndex::new(pages);
    let boxes = chords
        .iter()
        .map(|chord| resolve_chord(chord, pages, &index))
        .collect::<Result<Vec<_>>>()?;

    debug!(chords = chords.len(), boxes = boxes.len(), "cursor boxes resolved");
    Ok(boxes)
}

fn chord_ids(chord: &Chord) -> String {
    chord
        .notes
        .iter()
        .map(|n| format!("'{}'", n.source_id))
        .collect::<Vec<_>>()
        .join(", ")
}

fn page_names(pages: &[Page], indices: &[usize]) -> String {
    indices
        .iter()
        .map(|&i| format!("'{}'", pages[i].path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn resolve_chord(chord: &Chord, pages: &[Page], index: &HeadIndex) -> Result<CursorBox> {
    let time = chord.start_time();
    let first = &chord.notes[0];

    // ─── Page ────────────────────────────────────────────────────────
    let page_index = match index.pages_of(&first.source_id).as_slice() {
        [] => {
            return Err(Error::cross_reference(
                format!(
                    "no note head found for the chord at {time} ns (ids {})",
                    chord_ids(chord)
                ),
                None,
            ))
        }
        [single] => *single,
        several => {
            return Err(Error::cross_reference(
                format!(
                    "note '{}' found in several pages: {}",
                    first.source_id,
                    page_names(pages, several)
                ),
                Some(REPEAT_HINT),
            ))
        }
    };
    let page = &pages[page_index];

    for note in &chord.notes[1..] {
        let found = index.pages_of(&note.source_id);
        if found != [page_index] {
            return Err(Error::cross_reference(
                format!(
                    "notes of the chord at {time} ns are not on a single page: '{}' is on '{}' \
                     but '{}' is on [{}]",
                    first.source_id,
                    page.path.display(),
                    note.source_id,
                    page_names(pages, &found)
                ),
                (found.len() > 1).then_some(REPEAT_HINT),
            ));
        }
    }

    // ─── Heads ───────────────────────────────────────────────────────
    let mut heads = Vec::with_capacity(chord.notes.len());
    for note in &chord.notes {
        match index.heads(page_index, &note.source_id) {
            [head] => heads.push(*head),
            found => {
                return Err(Error::cross_reference(
                    format!(
                        "note '{}' has {} note heads on page '{}' instead of one",
                        note.source_id,
                        found.len(),
                        page.path.display()
                    ),
                    Some(REPEAT_HINT),
                ))
            }
        }
    }

    let bar_number = heads[0].bar_number;
    if let Some(odd) = heads.iter().find(|h| h.bar_number != bar_number) {
        return Err(Error::cross_reference(
            format!(
                "the chord at {time} ns spans bars {bar_number} ('{}') and {} ('{}')",
                heads[0].id, odd.bar_number, odd.id
            ),
            Some(VOICE_HINT),
        ));
    }

    let bbox = heads[1..]
        .iter()
        .fold(BoundingBox::of(heads[0]), |acc, h| acc.union(BoundingBox::of(h)));
    if bbox.left >= bbox.right || bbox.top >= bbox.bottom {
        return Err(Error::geometry(
            &page.path,
            format!("degenerate note-head box {bbox:?} for the chord at {time} ns"),
        ));
    }

    // ─── System ──────────────────────────────────────────────────────
    let system_index = find_system(page, &bbox).map_err(|message| {
        Error::cross_reference(
            format!(
                "chord at {time} ns ({}) on page '{}': {message}",
                chord_ids(chord),
                page.path.display()
            ),
            None,
        )
    })?;
    let (top, bottom) = page.system_band(&page.systems[system_index]);

    let to_u32 = |v: Coord, what: &str| {
        u32::try_from(v).map_err(|_| {
            Error::geometry(
                &page.path,
                format!("cursor {what} coordinate {v} of the chord at {time} ns is out of range"),
            )
        })
    };

    Ok(CursorBox {
        left: to_u32(bbox.left, "left")?,
        right: to_u32(bbox.right, "right")?,
        top: to_u32(top, "top")?,
        bottom: to_u32(bottom, "bottom")?,
        start_time: time,
        page_index: u16::try_from(page_index).map_err(|_| Error::Capacity {
            what: "pages",
            limit: MAX_PAGES,
        })?,
        system_index,
        bar_number,
    })
}

/// Refined system lookup: the band must contain the box's vertical middle,
/// and when bands overlap, the staff skylines at the box's horizontal
/// middle decide.
fn find_system(page: &Page, bbox: &BoundingBox) -> std::result::Result<usize, String> {
    let (x, y) = (bbox.x_mid(), bbox.y_mid());

    let candidates: Vec<usize> = page
        .systems
        .iter()
        .enumerate()
        .filter(|(_, s)| {
            let (top, bottom) = page.system_band(s);
            top <= y && y <= bottom
        })
        .map(|(k, _)| k)
        .collect();

    match candidates.as_slice() {
        [] => return Err(format!("no system contains y {y}")),
        [single] => return Ok(*single),
        _ => {}
    }

    let refined: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&k| skylines_enclose(page, &page.systems[k], x, y))
        .collect();

    match refined.as_slice() {
        [single] => Ok(*single),
        [] => Err(format!(
            "systems {candidates:?} overlap at y {y} but none of their skylines encloses x {x}"
        )),
        several => Err(format!("ambiguous system: {several:?} all enclose ({x}, {y})")),
    }
}

fn skylines_enclose(page: &Page, system: &System, x: Coord, y: Coord) -> bool {
    let top = page.staves[system.first]
        .full_top_skyline
        .iter()
        .filter(|s| s.covers(x))
        .map(|s| s.y)
        .min();
    let bottom = page.staves[system.last]
        .full_bottom_skyline
        .iter()
        .filter(|s| s.covers(x))
        .map(|s| s.y)
        .max();

    matches!((top, bottom), (Some(top), Some(bottom)) if top <= y && y <= bottom)
}
