use tracing::debug;

use super::{EventGroup, Track, TrackEvent, MAGIC, MAX_GROUP_EVENTS, VERSION};
use crate::cursor::MAX_PAGES;
use crate::error::{Error, Result};
use crate::instruments::MAX_INSTRUMENTS;
use crate::model::{BarNumberEvent, CursorBox, KeyEvent, KeyEventKind, Nanos};

// ═══════════════════════════════════════════════════════════════════════
// Merging
// ═══════════════════════════════════════════════════════════════════════

fn check_order(name: &str, times: impl Iterator<Item = Nanos>, strict: bool) -> Result<()> {
    let mut prev: Option<Nanos> = None;
    for (i, t) in times.enumerate() {
        if let Some(p) = prev {
            if t < p || (strict && t == p) {
                let need = if strict { "strictly increasing" } else { "sorted" };
                return Err(Error::Precondition(format!(
                    "{name} must be {need} by time: entry {i} at {t} ns follows {p} ns"
                )));
            }
        }
        prev = Some(t);
    }
    Ok(())
}

/// Interleave the three event streams into timestamp groups.
///
/// Within a group: page change (when the cursor moves to another page),
/// cursor move, bar number, then key events in stream order.
pub fn merge_events(
    keys: &[KeyEvent],
    cursors: &[CursorBox],
    bars: &[BarNumberEvent],
) -> Result<Vec<EventGroup>> {
    check_order("key events", keys.iter().map(|e| e.time), false)?;
    check_order("cursor boxes", cursors.iter().map(|c| c.start_time), true)?;
    check_order("bar number events", bars.iter().map(|b| b.time), true)?;

    let (mut k, mut c, mut b) = (0, 0, 0);
    let mut current_page: Option<u16> = None;
    let mut groups = Vec::new();

    loop {
        let next = [
            keys.get(k).map(|e| e.time),
            cursors.get(c).map(|x| x.start_time),
            bars.get(b).map(|x| x.time),
        ]
        .into_iter()
        .flatten()
        .min();
        let Some(time) = next else { break };

        let mut events = Vec::new();

        if let Some(cursor) = cursors.get(c).filter(|x| x.start_time == time) {
            if current_page != Some(cursor.page_index) {
                events.push(TrackEvent::SetSvgFile {
                    page: cursor.page_index,
                });
                current_page = Some(cursor.page_index);
            }
            events.push(TrackEvent::SetCursor {
                left: cursor.left,
                right: cursor.right,
                top: cursor.top,
                bottom: cursor.bottom,
            });
            c += 1;
        }

        if let Some(bar) = bars.get(b).filter(|x| x.time == time) {
            events.push(TrackEvent::SetBarNumber {
                bar_number: bar.bar_number,
            });
            b += 1;
        }

        while let Some(key) = keys.get(k).filter(|e| e.time == time) {
            events.push(match key.kind {
                KeyEventKind::Pressed { staff_number } => TrackEvent::PressKey {
                    pitch: key.pitch.midi(),
                    staff_number,
                },
                KeyEventKind::Released => TrackEvent::ReleaseKey {
                    pitch: key.pitch.midi(),
                },
            });
            k += 1;
        }

        if events.len() > MAX_GROUP_EVENTS {
            return Err(Error::Capacity {
                what: "events at one timestamp",
                limit: MAX_GROUP_EVENTS,
            });
        }
        groups.push(EventGroup { time, events });
    }

    Ok(groups)
}

// ═══════════════════════════════════════════════════════════════════════
// Byte encoding
// ═══════════════════════════════════════════════════════════════════════

fn write_event(out: &mut Vec<u8>, event: &TrackEvent) {
    out.push(event.tag());
    match *event {
        TrackEvent::PressKey {
            pitch,
            staff_number,
        } => {
            out.push(pitch);
            out.push(staff_number);
        }
        TrackEvent::ReleaseKey { pitch } => out.push(pitch),
        TrackEvent::SetBarNumber { bar_number } => {
            out.extend_from_slice(&bar_number.to_be_bytes())
        }
        TrackEvent::SetCursor {
            left,
            right,
            top,
            bottom,
        } => {
            for v in [left, right, top, bottom] {
                out.extend_from_slice(&v.to_be_bytes());
            }
        }
        TrackEvent::SetSvgFile { page } => out.extend_from_slice(&page.to_be_bytes()),
    }
}

/// Encode a track to bytes.
pub fn encode(track: &Track) -> Result<Vec<u8>> {
    let mut out = Vec::new();

    // Header
    out.extend_from_slice(MAGIC);
    out.push(VERSION);

    // Instrument table
    let instrument_count = u8::try_from(track.instruments.len()).map_err(|_| Error::Capacity {
        what: "instruments",
        limit: MAX_INSTRUMENTS,
    })?;
    out.push(instrument_count);
    for name in &track.instruments {
        if name.contains('\0') {
            return Err(Error::Precondition(format!(
                "instrument name {name:?} contains a NUL byte"
            )));
        }
        out.extend_from_slice(name.as_bytes());
        out.push(0);
    }

    // Event groups, count patched once known
    let count_at = out.len();
    out.extend_from_slice(&0u64.to_be_bytes());
    let mut group_count: u64 = 0;
    for group in &track.groups {
        let event_count = u8::try_from(group.events.len()).map_err(|_| Error::Capacity {
            what: "events at one timestamp",
            limit: MAX_GROUP_EVENTS,
        })?;
        out.extend_from_slice(&group.time.to_be_bytes());
        out.push(event_count);
        for event in &group.events {
            if let TrackEvent::SetSvgFile { page } = event {
                if usize::from(*page) >= track.pages.len() {
                    return Err(Error::Precondition(format!(
                        "event at {} ns shows page {page} but the track has {} pages",
                        group.time,
                        track.pages.len()
                    )));
                }
            }
            write_event(&mut out, event);
        }
        group_count += 1;
    }
    out[count_at..count_at + 8].copy_from_slice(&group_count.to_be_bytes());

    // Page files
    if track.pages.len() > MAX_PAGES {
        return Err(Error::Capacity {
            what: "pages",
            limit: MAX_PAGES,
        });
    }
    out.extend_from_slice(&(track.pages.len() as u16).to_be_bytes());
    for page in &track.pages {
        let size = u32::try_from(page.len()).map_err(|_| Error::Capacity {
            what: "bytes in one page file",
            limit: u32::MAX as usize,
        })?;
        out.extend_from_slice(&size.to_be_bytes());
        out.extend_from_slice(page);
    }

    debug!(
        bytes = out.len(),
        groups = group_count,
        pages = track.pages.len(),
        "track encoded"
    );
    Ok(out)
}
