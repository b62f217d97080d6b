//! The LPYP playback track.
//!
//! Layout, big-endian throughout:
//!
//! ```text
//! "LPYP" u8 version
//! u8 N, N × (name bytes, 0x00)
//! u64 group_count
//! group_count × (u64 time, u8 count, count × event)
//! u16 P, P × (u32 size, size bytes)
//! ```

mod decode;
mod encode;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::Nanos;

pub use decode::decode;
pub use encode::{encode, merge_events};

pub const MAGIC: &[u8; 4] = b"LPYP";
pub const VERSION: u8 = 0;

/// Largest number of events sharing one timestamp.
pub const MAX_GROUP_EVENTS: usize = u8::MAX as usize;

// Event tags
pub const TAG_PRESS_KEY: u8 = 0;
pub const TAG_RELEASE_KEY: u8 = 1;
pub const TAG_SET_BAR_NUMBER: u8 = 2;
pub const TAG_SET_CURSOR: u8 = 3;
pub const TAG_SET_SVG_FILE: u8 = 4;

/// One event of the track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackEvent {
    PressKey { pitch: u8, staff_number: u8 },
    ReleaseKey { pitch: u8 },
    SetBarNumber { bar_number: u16 },
    SetCursor { left: u32, right: u32, top: u32, bottom: u32 },
    SetSvgFile { page: u16 },
}

impl TrackEvent {
    pub fn tag(&self) -> u8 {
        match self {
            TrackEvent::PressKey { .. } => TAG_PRESS_KEY,
            TrackEvent::ReleaseKey { .. } => TAG_RELEASE_KEY,
            TrackEvent::SetBarNumber { .. } => TAG_SET_BAR_NUMBER,
            TrackEvent::SetCursor { .. } => TAG_SET_CURSOR,
            TrackEvent::SetSvgFile { .. } => TAG_SET_SVG_FILE,
        }
    }
}

/// Events sharing one timestamp, in playback order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventGroup {
    pub time: Nanos,
    pub events: Vec<TrackEvent>,
}

/// A whole track in structured form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Instrument names by staff number
    pub instruments: Vec<String>,
    pub groups: Vec<EventGroup>,
    /// Raw page files, in page order
    #[serde(skip)]
    pub pages: Vec<Vec<u8>>,
}

/// Write an encoded track, replacing any existing file.
pub fn write_track(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).map_err(|e| Error::io(path, e))
}

/// Read and decode a track file.
pub fn read_track(path: &Path) -> Result<Track> {
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    decode(&bytes)
}
