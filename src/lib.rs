//! scoretrack: turns engraved score pages and a note-timing log into a
//! synchronized playback track (the LPYP format).
//!
//! The pages are SVG files in which the typesetter drew skyline markers and
//! tagged every note head with its source location. The note log lists the
//! same notes with their timings. Joining the two gives, for every chord,
//! the rectangle of the score to highlight while it sounds.
//!
//! # Example
//! ```no_run
//! use scoretrack::{pipeline, Inputs, Options};
//!
//! let inputs = Inputs::new("song.notes", "song.instruments", "song.lpyp")
//!     .page("song-page1.svg")
//!     .page("song-page2.svg");
//! let summary = pipeline::run_with_options(&inputs, &Options::default()).unwrap();
//! println!("{} chords, {} bytes", summary.chords, summary.bytes);
//! ```

pub mod bar_numbers;
pub mod chords;
pub mod config;
pub mod cursor;
pub mod debug_dump;
pub mod error;
pub mod id_record;
pub mod instruments;
pub mod keyboard;
pub mod model;
pub mod notes;
pub mod pipeline;
pub mod svg;
pub mod track;

use std::path::Path;

pub use config::Options;
pub use debug_dump::DebugDump;
pub use error::{Error, Result};
pub use model::*;
pub use pipeline::{Inputs, Summary};
pub use track::{EventGroup, Track, TrackEvent};

/// Decode a track file.
pub fn inspect_file<P: AsRef<Path>>(path: P) -> Result<Track> {
    track::read_track(path.as_ref())
}
