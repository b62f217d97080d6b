//! Chord grouping: consecutive notes with the same start time.

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Chord, Note};

/// Partition a sorted note sequence into chords.
///
/// Every note ends up in exactly one chord and chords are strictly
/// increasing by start time.
pub fn group_chords(notes: &[Note]) -> Result<Vec<Chord>> {
    if let Some(i) = notes
        .windows(2)
        .position(|w| w[0].start_time > w[1].start_time)
    {
        return Err(Error::Precondition(format!(
            "chord grouping needs sorted notes, but note {} ('{}') starts after note {} ('{}')",
            i,
            notes[i].source_id,
            i + 1,
            notes[i + 1].source_id
        )));
    }

    let chords: Vec<Chord> = notes
        .chunk_by(|a, b| a.start_time == b.start_time)
        .map(|notes| Chord {
            notes: notes.to_vec(),
        })
        .collect();

    check_chords(&chords, notes.len())?;
    debug!(notes = notes.len(), chords = chords.len(), "notes grouped into chords");
    Ok(chords)
}

fn check_chords(chords: &[Chord], note_count: usize) -> Result<()> {
    let total: usize = chords.iter().map(|c| c.notes.len()).sum();
    if total != note_count {
        return Err(Error::Precondition(format!(
            "chords hold {total} notes instead of {note_count}"
        )));
    }

    for (k, chord) in chords.iter().enumerate() {
        let Some(first) = chord.notes.first() else {
            return Err(Error::Precondition(format!("chord {k} is empty")));
        };
        if let Some(odd) = chord.notes.iter().find(|n| n.start_time != first.start_time) {
            return Err(Error::Precondition(format!(
                "chord {k} mixes start times {} and {}",
                first.start_time, odd.start_time
            )));
        }
    }

    if let Some(k) = chords
        .windows(2)
        .position(|w| w[0].start_time() >= w[1].start_time())
    {
        return Err(Error::Precondition(format!(
            "chords {k} and {} are not strictly increasing ({} then {})",
            k + 1,
            chords[k].start_time(),
            chords[k + 1].start_time()
        )));
    }
    Ok(())
}
