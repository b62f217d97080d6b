//! The whole conversion, from input files to the written track.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::bar_numbers::bar_number_events;
use crate::chords::group_chords;
use crate::config::Options;
use crate::cursor::{resolve_cursor_boxes, MAX_PAGES};
use crate::debug_dump::DebugDump;
use crate::error::{Error, Result};
use crate::instruments::read_instruments;
use crate::keyboard::key_events;
use crate::model::Page;
use crate::notes::read_notes;
use crate::svg::read_page;
use crate::track::{self, Track};

/// Input and output files of one conversion.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    /// Note timing log
    pub notes: PathBuf,
    /// Staff number → instrument name table
    pub instruments: PathBuf,
    /// Page SVGs with skyline markers, in page order
    pub pages: Vec<PathBuf>,
    /// Page files embedded in the track. Empty means `pages`.
    pub display_pages: Vec<PathBuf>,
    pub output: PathBuf,
}

impl Inputs {
    pub fn new(notes: impl AsRef<Path>, instruments: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            notes: notes.as_ref().to_path_buf(),
            instruments: instruments.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn page(mut self, path: impl AsRef<Path>) -> Self {
        self.pages.push(path.as_ref().to_path_buf());
        self
    }

    pub fn display_page(mut self, path: impl AsRef<Path>) -> Self {
        self.display_pages.push(path.as_ref().to_path_buf());
        self
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub notes: usize,
    pub chords: usize,
    pub key_events: usize,
    pub bar_changes: usize,
    pub groups: usize,
    pub bytes: usize,
}

/// Analyse the inputs and assemble the track in memory.
pub fn build_track(inputs: &Inputs, options: &Options, dump: &DebugDump) -> Result<(Track, Summary)> {
    options.validate()?;

    if inputs.pages.len() > MAX_PAGES {
        return Err(Error::Capacity {
            what: "pages",
            limit: MAX_PAGES,
        });
    }
    let display_pages = if inputs.display_pages.is_empty() {
        &inputs.pages
    } else {
        &inputs.display_pages
    };
    if display_pages.len() != inputs.pages.len() {
        return Err(Error::Config(format!(
            "{} display pages given for {} analysed pages",
            display_pages.len(),
            inputs.pages.len()
        )));
    }

    // ─── Pages ───────────────────────────────────────────────────────
    let pages = inputs
        .pages
        .iter()
        .enumerate()
        .map(|(n, path)| {
            let page = read_page(path, options)?;
            dump.write(&format!("page-{}", n + 1), &page)?;
            Ok(page)
        })
        .collect::<Result<Vec<Page>>>()?;
    info!(
        pages = pages.len(),
        staves = pages.iter().map(|p| p.staves.len()).sum::<usize>(),
        note_heads = pages.iter().map(|p| p.note_heads.len()).sum::<usize>(),
        "pages analysed"
    );

    // ─── Notes ───────────────────────────────────────────────────────
    let notes = read_notes(&inputs.notes, options)?;
    dump.write("notes", &notes)?;

    let chords = group_chords(&notes)?;
    dump.write("chords", &chords)?;

    let cursor_boxes = resolve_cursor_boxes(&chords, &pages)?;
    dump.write("cursor_boxes", &cursor_boxes)?;

    let bars = bar_number_events(&cursor_boxes);
    dump.write("bar_numbers", &bars)?;

    let keys = key_events(&notes, options.release_shortening_cap_ns)?;
    dump.write("key_events", &keys)?;
    info!(
        notes = notes.len(),
        chords = chords.len(),
        key_events = keys.len(),
        bar_changes = bars.len(),
        "timeline built"
    );

    // ─── Track ───────────────────────────────────────────────────────
    let instruments = read_instruments(&inputs.instruments)?;
    let page_files = display_pages
        .iter()
        .map(|path| std::fs::read(path).map_err(|e| Error::io(path, e)))
        .collect::<Result<Vec<_>>>()?;

    let track = Track {
        instruments,
        groups: track::merge_events(&keys, &cursor_boxes, &bars)?,
        pages: page_files,
    };
    let summary = Summary {
        notes: notes.len(),
        chords: chords.len(),
        key_events: keys.len(),
        bar_changes: bars.len(),
        groups: track.groups.len(),
        bytes: 0,
    };
    Ok((track, summary))
}

/// Run the whole conversion and write the track to `inputs.output`.
/// Nothing is written unless every stage succeeds.
pub fn run(inputs: &Inputs, options: &Options, dump: &DebugDump) -> Result<Summary> {
    let (track, mut summary) = build_track(inputs, options, dump)?;
    let bytes = track::encode(&track)?;
    track::write_track(&inputs.output, &bytes)?;
    summary.bytes = bytes.len();

    info!(
        output = %inputs.output.display(),
        bytes = bytes.len(),
        groups = summary.groups,
        "track written"
    );
    Ok(summary)
}

/// Convenience for the common case of dumps configured in `options`.
pub fn run_with_options(inputs: &Inputs, options: &Options) -> Result<Summary> {
    let dump = match &options.debug_dump_dir {
        Some(dir) => DebugDump::to_dir(dir)?,
        None => DebugDump::disabled(),
    };
    run(inputs, options, &dump)
}
