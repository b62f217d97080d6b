//! Data model shared by the pipeline stages.
//!
//! Times are nanoseconds from the beginning of the piece. Page coordinates
//! are SVG user units scaled by [`COORD_SCALE`] so that all geometry is
//! done with exact integer arithmetic.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Time in nanoseconds.
pub type Nanos = u64;

/// Page coordinate in sub-units (SVG user unit × [`COORD_SCALE`]).
pub type Coord = i64;

/// Number of sub-units per SVG user unit.
pub const COORD_SCALE: Coord = 10_000;

// ─── Pitch ───────────────────────────────────────────────────────────

/// One key of an 88-key keyboard, stored as its MIDI note number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Pitch(u8);

impl Pitch {
    /// A0, the lowest key.
    pub const LOWEST: Pitch = Pitch(21);
    /// C8, the highest key.
    pub const HIGHEST: Pitch = Pitch(108);

    /// Returns `None` when `midi` is not on the keyboard.
    pub fn new(midi: u8) -> Option<Self> {
        (Self::LOWEST.0..=Self::HIGHEST.0)
            .contains(&midi)
            .then_some(Pitch(midi))
    }

    pub fn midi(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Pitch {
    type Error = String;

    fn try_from(midi: u8) -> Result<Self, Self::Error> {
        Pitch::new(midi).ok_or_else(|| format!("pitch {midi} is outside the 88-key range"))
    }
}

impl From<Pitch> for u8 {
    fn from(p: Pitch) -> u8 {
        p.0
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];
        let octave = i32::from(self.0) / 12 - 1;
        write!(f, "{}{}", NAMES[usize::from(self.0 % 12)], octave)
    }
}

// ─── Notes & chords ──────────────────────────────────────────────────

/// A note from the timing log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub start_time: Nanos,
    pub stop_time: Nanos,
    pub pitch: Pitch,
    /// False once the note is absorbed by a tie chain or duplicates an
    /// overlapping note of the same pitch. Such notes still move the cursor.
    pub is_played: bool,
    pub staff_number: u8,
    /// Originating source location; matches [`NoteHead::id`].
    pub source_id: String,
    /// The note is tied to the next note of the same pitch. Cleared once
    /// the chain has been folded into this note.
    pub tied_to_next: bool,
    pub is_grace: bool,
}

impl Note {
    pub fn duration(&self) -> Nanos {
        self.stop_time.saturating_sub(self.start_time)
    }
}

/// Notes starting at the same time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chord {
    /// Never empty.
    pub notes: Vec<Note>,
}

impl Chord {
    pub fn start_time(&self) -> Nanos {
        self.notes[0].start_time
    }
}

// ─── Page geometry ───────────────────────────────────────────────────

/// A horizontal segment, always with `x1 <= x2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub x1: Coord,
    pub x2: Coord,
    pub y: Coord,
}

impl Segment {
    /// True when `x` lies within the segment's horizontal extent.
    pub fn covers(&self, x: Coord) -> bool {
        self.x1 <= x && x <= self.x2
    }
}

/// One five-line staff and the ink boundaries around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    /// Left end of the staff lines
    pub x: Coord,
    /// y of the top staff line
    pub y: Coord,
    pub width: Coord,
    /// Distance between the top and bottom staff lines
    pub height: Coord,
    /// Highest ink above the staff
    pub top_skyline: Coord,
    /// Lowest ink below the staff
    pub bottom_skyline: Coord,
    /// Top skyline segments clipped to the staff's x-range, sorted by x
    pub full_top_skyline: Vec<Segment>,
    /// Bottom skyline segments clipped to the staff's x-range, sorted by x
    pub full_bottom_skyline: Vec<Segment>,
}

/// A line of music: staves `first..=last` of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct System {
    pub first: usize,
    pub last: usize,
}

/// Bounding box of one engraved note head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteHead {
    /// Originating source location; matches [`Note::source_id`].
    pub id: String,
    pub left: Coord,
    pub right: Coord,
    pub top: Coord,
    pub bottom: Coord,
    pub bar_number: u16,
}

/// Everything extracted from one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub path: PathBuf,
    /// Sorted top to bottom
    pub staves: Vec<Staff>,
    /// Sorted top to bottom, partitioning `staves`
    pub systems: Vec<System>,
    pub note_heads: Vec<NoteHead>,
}

impl Page {
    /// Vertical band of a system: from the top skyline of its first staff
    /// to the bottom skyline of its last one.
    pub fn system_band(&self, system: &System) -> (Coord, Coord) {
        (
            self.staves[system.first].top_skyline,
            self.staves[system.last].bottom_skyline,
        )
    }
}

// ─── Events ──────────────────────────────────────────────────────────

/// Cursor rectangle shown while a chord sounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorBox {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
    pub start_time: Nanos,
    pub page_index: u16,
    pub system_index: usize,
    pub bar_number: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyEventKind {
    /// `staff_number` lets the player colour keys per staff.
    Pressed { staff_number: u8 },
    Released,
}

impl KeyEventKind {
    pub fn is_pressed(self) -> bool {
        matches!(self, KeyEventKind::Pressed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub time: Nanos,
    pub pitch: Pitch,
    pub kind: KeyEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarNumberEvent {
    pub time: Nanos,
    pub bar_number: u16,
}
