//! Note timeline: parses the typesetter's note log and normalizes it.
//!
//! Log lines look like:
//!
//! ```text
//! note start-time: 0 stop-time: 500000000 id: "#origin=song.ly:3:4:5#pitch=60#staff-number=0#"
//! ```
//!
//! After parsing, notes are stable-sorted by start time and run through
//! three passes: grace retiming, tie extension and overlap fixing.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::Options;
use crate::error::{Error, Result};
use crate::id_record::{IdLocation, IdRecord};
use crate::model::{Nanos, Note, Pitch};

// ═══════════════════════════════════════════════════════════════════════
// Parsing
// ═══════════════════════════════════════════════════════════════════════

/// Whitespace-separated tokens of one log line.
struct LineTokens<'a> {
    source_name: &'a str,
    line: usize,
    words: std::str::SplitWhitespace<'a>,
}

impl<'a> LineTokens<'a> {
    fn error(&self, expected: impl Into<String>, found: impl Into<String>) -> Error {
        Error::malformed(self.source_name, self.line, expected, found)
    }

    fn word(&mut self, expected: &str) -> Result<&'a str> {
        self.words
            .next()
            .ok_or_else(|| self.error(expected, "end of line"))
    }

    fn keyword(&mut self, keyword: &str) -> Result<()> {
        let expected = format!("'{keyword}'");
        let word = self.word(&expected)?;
        if word != keyword {
            return Err(self.error(expected, format!("'{word}'")));
        }
        Ok(())
    }

    fn time(&mut self) -> Result<Nanos> {
        let word = self.word("a time in nanoseconds")?;
        word.parse()
            .map_err(|_| self.error("a time in nanoseconds", format!("'{word}'")))
    }

    fn quoted(&mut self) -> Result<&'a str> {
        let word = self.word("a quoted id")?;
        word.strip_prefix('"')
            .and_then(|w| w.strip_suffix('"'))
            .ok_or_else(|| self.error("a quoted id", format!("'{word}'")))
    }

    fn end(&mut self) -> Result<()> {
        match self.words.next() {
            None => Ok(()),
            Some(extra) => Err(self.error("end of line", format!("'{extra}'"))),
        }
    }
}

fn parse_line(source_name: &str, line: usize, text: &str) -> Result<Note> {
    let mut tokens = LineTokens {
        source_name,
        line,
        words: text.split_whitespace(),
    };

    tokens.keyword("note")?;
    tokens.keyword("start-time:")?;
    let start_time = tokens.time()?;
    tokens.keyword("stop-time:")?;
    let stop_time = tokens.time()?;
    tokens.keyword("id:")?;
    let raw_id = tokens.quoted()?;
    tokens.end()?;

    if stop_time < start_time {
        return Err(tokens.error(
            format!("a stop-time not before start-time {start_time}"),
            stop_time.to_string(),
        ));
    }

    let id = IdRecord::parse(raw_id, IdLocation::new(source_name, line))?;
    let midi: u8 = id.value("pitch")?;
    let pitch = Pitch::new(midi).ok_or_else(|| {
        tokens.error("a pitch within the 88-key range (21..=108)", midi.to_string())
    })?;

    Ok(Note {
        start_time,
        stop_time,
        pitch,
        is_played: true,
        staff_number: id.value("staff-number")?,
        source_id: id.str("origin")?.to_string(),
        tied_to_next: id.flag("has-tie-attached")?,
        is_grace: id.flag("is-grace-note")?,
    })
}

/// Parse a whole note log and stable-sort it by start time. Blank lines
/// are skipped.
pub fn parse_notes(source_name: &str, text: &str) -> Result<Vec<Note>> {
    let mut notes = text
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| parse_line(source_name, i + 1, l))
        .collect::<Result<Vec<_>>>()?;
    notes.sort_by_key(|n| n.start_time);
    Ok(notes)
}

/// Read, parse and normalize a note log.
pub fn read_notes(path: &Path, options: &Options) -> Result<Vec<Note>> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let notes = parse_notes(&path.display().to_string(), &text)?;
    info!(path = %path.display(), notes = notes.len(), "note log parsed");
    normalize_notes(notes, options)
}

/// Run the three normalization passes in order.
pub fn normalize_notes(mut notes: Vec<Note>, options: &Options) -> Result<Vec<Note>> {
    retime_grace_notes(&mut notes, options.grace_note_unit_ns)?;
    extend_ties(&mut notes)?;
    fix_overlaps(&mut notes);

    check_sorted(&notes)?;
    debug!(
        notes = notes.len(),
        played = notes.iter().filter(|n| n.is_played).count(),
        "note timeline normalized"
    );
    Ok(notes)
}

fn check_sorted(notes: &[Note]) -> Result<()> {
    match notes.windows(2).position(|w| w[0].start_time > w[1].start_time) {
        None => Ok(()),
        Some(i) => Err(Error::Precondition(format!(
            "note timeline not sorted: note {i} starts at {} but note {} starts at {}",
            notes[i].start_time,
            i + 1,
            notes[i + 1].start_time
        ))),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Grace notes
// ═══════════════════════════════════════════════════════════════════════

/// Slot of each grace note of a run. Notes sharing an original start time
/// share a slot. Returns the slot indices and the slot count.
fn grace_slots(run: &[Note]) -> (Vec<u64>, u64) {
    let mut slots = Vec::with_capacity(run.len());
    let mut slot = 0;
    for (k, note) in run.iter().enumerate() {
        if k > 0 && note.start_time != run[k - 1].start_time {
            slot += 1;
        }
        slots.push(slot);
    }
    (slots, slot + 1)
}

/// Give grace notes synthetic timings.
///
/// A run before any normal note is laid out from 0 with `unit` slots and
/// pushes every later note back. So is a run whose only earlier normal
/// notes start together with the next one, except that it is laid out
/// from their start and pushes them back as well. A run between two normal notes is spread
/// over the gap between their starts, with slots capped at `unit` and then
/// right-aligned against the next note. A run after the last normal note
/// follows its stop with `unit` slots.
pub fn retime_grace_notes(notes: &mut [Note], unit: Nanos) -> Result<()> {
    if unit == 0 {
        return Err(Error::Precondition("grace note unit must be positive".into()));
    }

    let mut i = 0;
    while i < notes.len() {
        if !notes[i].is_grace {
            i += 1;
            continue;
        }

        let run_start = i;
        let run_end = notes[i..]
            .iter()
            .position(|n| !n.is_grace)
            .map_or(notes.len(), |p| i + p);
        let (slots, count) = grace_slots(&notes[run_start..run_end]);

        let next = (run_end < notes.len()).then_some(run_end);
        let prev = notes[..run_start].iter().rposition(|n| !n.is_grace);

        match (prev, next) {
            (Some(_), Some(next)) => {
                let next_start = notes[next].start_time;
                let anchor = notes[..run_start]
                    .iter()
                    .rev()
                    .find(|n| !n.is_grace && n.start_time < next_start)
                    .map(|n| n.start_time);
                match anchor {
                    Some(prev_start) => {
                        let slot = ((next_start - prev_start) / count).max(1);
                        for (note, k) in notes[run_start..run_end].iter_mut().zip(&slots) {
                            let (start, len) = if slot > unit {
                                (next_start - (count - k) * unit, unit)
                            } else {
                                (prev_start + k * slot, slot)
                            };
                            note.start_time = start;
                            note.stop_time = start + len;
                        }
                    }
                    // every normal note so far starts with N_next
                    None => lay_out_leading(notes, run_start, run_end, &slots, count, unit, next_start),
                }
            }
            (Some(prev), None) => {
                let base = notes[prev].stop_time;
                for (note, k) in notes[run_start..run_end].iter_mut().zip(&slots) {
                    note.start_time = base + k * unit;
                    note.stop_time = note.start_time + unit;
                }
            }
            (None, _) => lay_out_leading(notes, run_start, run_end, &slots, count, unit, 0),
        }

        i = run_end;
    }

    notes.sort_by_key(|n| n.start_time);
    Ok(())
}

/// Lay a run out from `base` and delay every note starting at or after
/// `base` by the run's length. Normal notes logged before the run at
/// `base` are delayed too, so they stay in the chord they belong to.
fn lay_out_leading(
    notes: &mut [Note],
    run_start: usize,
    run_end: usize,
    slots: &[u64],
    count: u64,
    unit: Nanos,
    base: Nanos,
) {
    for (note, k) in notes[run_start..run_end].iter_mut().zip(slots) {
        note.start_time = base + k * unit;
        note.stop_time = note.start_time + unit;
    }
    let shift = count * unit;
    let (before, rest) = notes.split_at_mut(run_start);
    let earlier = before
        .iter_mut()
        .filter(|n| !n.is_grace && n.start_time >= base);
    for note in earlier.chain(&mut rest[run_end - run_start..]) {
        note.start_time += shift;
        note.stop_time += shift;
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Ties
// ═══════════════════════════════════════════════════════════════════════

/// Fold tie chains into their first note. Chained notes stay in the
/// timeline as not-played so that they still move the cursor.
pub fn extend_ties(notes: &mut [Note]) -> Result<()> {
    for head in 0..notes.len() {
        if !(notes[head].is_played && notes[head].tied_to_next) {
            continue;
        }

        let (pitch, staff) = (notes[head].pitch, notes[head].staff_number);
        let mut stop = notes[head].stop_time;
        let mut tied = true;

        while tied {
            let next = (head + 1..notes.len()).find(|&k| {
                let n = &notes[k];
                n.is_played && n.pitch == pitch && n.staff_number == staff && n.start_time == stop
            });
            let Some(k) = next else {
                warn!(
                    id = %notes[head].source_id,
                    pitch = %pitch,
                    time = stop,
                    "tie doesn't lead to any note"
                );
                break;
            };

            if notes[k].duration() == 0 {
                return Err(Error::cross_reference(
                    format!(
                        "zero-duration note '{}' ({pitch} at {}) in the tie chain of '{}'",
                        notes[k].source_id, notes[k].start_time, notes[head].source_id
                    ),
                    None,
                ));
            }

            notes[k].is_played = false;
            stop = notes[k].stop_time;
            tied = notes[k].tied_to_next;
        }

        notes[head].stop_time = stop;
        notes[head].tied_to_next = false;
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Overlaps
// ═══════════════════════════════════════════════════════════════════════

/// Make same-pitch played notes disjoint. A note starting together with
/// an earlier one of the same pitch is a duplicate; otherwise the earlier
/// note is cut where the later one starts.
///
/// On sorted input a cut always lands strictly after the cut note's start,
/// so no played note collapses to zero duration here.
pub fn fix_overlaps(notes: &mut [Note]) {
    let mut duplicates = 0;

    for i in 0..notes.len() {
        if !notes[i].is_played {
            continue;
        }

        for j in i + 1..notes.len() {
            if !notes[j].is_played || notes[j].pitch != notes[i].pitch {
                continue;
            }
            if notes[j].start_time > notes[i].stop_time {
                break;
            }
            if notes[j].start_time == notes[i].start_time {
                notes[j].is_played = false;
                notes[i].stop_time = notes[i].stop_time.max(notes[j].stop_time);
                duplicates += 1;
            } else {
                notes[i].stop_time = notes[j].start_time;
                break;
            }
        }
    }

    if duplicates > 0 {
        debug!(duplicates, "duplicate notes silenced by overlap fixing");
    }
}
