//! Keyboard press/release events.
//!
//! A note released exactly when the same key is pressed again would put a
//! release and a press of one key at the same instant. Such releases are
//! moved slightly earlier so the player always sees the key come up.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{KeyEvent, KeyEventKind, Nanos, Note, Pitch};

/// Build the key events of the played notes. `cap` bounds how far a
/// colliding release is moved earlier.
pub fn key_events(notes: &[Note], cap: Nanos) -> Result<Vec<KeyEvent>> {
    let mut events = Vec::with_capacity(notes.len() * 2);
    for note in notes.iter().filter(|n| n.is_played && n.duration() > 0) {
        events.push(KeyEvent {
            time: note.start_time,
            pitch: note.pitch,
            kind: KeyEventKind::Pressed {
                staff_number: note.staff_number,
            },
        });
        events.push(KeyEvent {
            time: note.stop_time,
            pitch: note.pitch,
            kind: KeyEventKind::Released,
        });
    }
    events.sort_by_key(|e| e.time);

    let moved = separate_retriggers(&mut events, cap)?;
    events.sort_by_key(|e| e.time);

    check_events(&events)?;
    debug!(events = events.len(), moved, "key events built");
    Ok(events)
}

/// Move every release that coincides with a press of the same key. Events
/// must be sorted by time. Returns how many releases moved.
fn separate_retriggers(events: &mut [KeyEvent], cap: Nanos) -> Result<usize> {
    // first release of each key at each instant
    let releases: HashMap<(Nanos, Pitch), usize> = events
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, e)| !e.kind.is_pressed())
        .map(|(i, e)| ((e.time, e.pitch), i))
        .collect();

    let mut last_press: HashMap<Pitch, Nanos> = HashMap::new();
    let mut moves = Vec::new();

    for group in events.chunk_by(|a, b| a.time == b.time) {
        let t = group[0].time;
        let presses = || group.iter().filter(|e| e.kind.is_pressed());

        for press in presses() {
            let Some(&release) = releases.get(&(t, press.pitch)) else {
                continue;
            };
            let opened = last_press.get(&press.pitch).ok_or_else(|| {
                Error::Precondition(format!(
                    "release of {} at {t} ns without an earlier press",
                    press.pitch
                ))
            })?;
            let shortening = cap.min((t - opened) / 4);
            moves.push((release, t - shortening));
        }
        for press in presses() {
            last_press.insert(press.pitch, t);
        }
    }

    for &(index, time) in &moves {
        events[index].time = time;
    }
    Ok(moves.len())
}

/// Per key: no simultaneous press and release, no duplicate events, and
/// presses alternating with releases.
fn check_events(events: &[KeyEvent]) -> Result<()> {
    let mut seen: HashMap<(Nanos, Pitch, bool), usize> = HashMap::new();
    for (i, e) in events.iter().enumerate() {
        if let Some(prev) = seen.insert((e.time, e.pitch, e.kind.is_pressed()), i) {
            return Err(Error::Precondition(format!(
                "duplicate key events {prev} and {i}: {} {} at {} ns",
                if e.kind.is_pressed() { "press" } else { "release" },
                e.pitch,
                e.time
            )));
        }
        if seen.contains_key(&(e.time, e.pitch, !e.kind.is_pressed())) {
            return Err(Error::Precondition(format!(
                "{} is both pressed and released at {} ns",
                e.pitch, e.time
            )));
        }
    }

    let mut down: HashMap<Pitch, bool> = HashMap::new();
    for e in events {
        let is_down = down.entry(e.pitch).or_insert(false);
        match (e.kind.is_pressed(), *is_down) {
            (true, true) => {
                return Err(Error::Precondition(format!(
                    "{} pressed at {} ns while already down",
                    e.pitch, e.time
                )))
            }
            (false, false) => {
                return Err(Error::Precondition(format!(
                    "{} released at {} ns while not down",
                    e.pitch, e.time
                )))
            }
            (pressed, _) => *is_down = pressed,
        }
    }
    Ok(())
}
