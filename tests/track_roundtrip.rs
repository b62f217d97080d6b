//! Encoding then decoding a track gives back the same structured data.

use pretty_assertions::assert_eq;
use scoretrack::model::{BarNumberEvent, CursorBox, KeyEvent, KeyEventKind, Pitch};
use scoretrack::track::{self, Track, TrackEvent};

fn key(time: u64, midi: u8, staff: Option<u8>) -> KeyEvent {
    KeyEvent {
        time,
        pitch: Pitch::new(midi).unwrap(),
        kind: match staff {
            Some(staff_number) => KeyEventKind::Pressed { staff_number },
            None => KeyEventKind::Released,
        },
    }
}

fn cursor(start_time: u64, page_index: u16, bar_number: u16) -> CursorBox {
    CursorBox {
        left: 120_000 + start_time as u32,
        right: 140_000 + start_time as u32,
        top: 80_000,
        bottom: u32::MAX,
        start_time,
        page_index,
        system_index: 0,
        bar_number,
    }
}

#[test]
fn round_trip_recovers_everything() {
    let keys = vec![
        key(0, 60, Some(0)),
        key(0, 36, Some(1)),
        key(400, 60, None),
        key(500, 62, Some(0)),
        key(900, 62, None),
        key(900, 36, None),
        key(1_000, 108, Some(0)),
        key(u64::MAX, 108, None),
    ];
    let cursors = vec![cursor(0, 0, 1), cursor(500, 0, 1), cursor(1_000, 1, 2)];
    let bars = vec![
        BarNumberEvent { time: 0, bar_number: 1 },
        BarNumberEvent { time: 1_000, bar_number: u16::MAX },
    ];

    let groups = track::merge_events(&keys, &cursors, &bars).unwrap();
    let original = Track {
        instruments: vec!["Flûte".into(), String::new(), "Contrebasse".into()],
        groups,
        pages: vec![b"<svg>1</svg>".to_vec(), Vec::new()],
    };

    let bytes = track::encode(&original).unwrap();
    let decoded = track::decode(&bytes).unwrap();
    assert_eq!(decoded, original);

    // every key event, cursor and bar change made it into some group
    let events: Vec<&TrackEvent> = decoded.groups.iter().flat_map(|g| &g.events).collect();
    let count = |f: fn(&TrackEvent) -> bool| events.iter().filter(|e| f(**e)).count();
    assert_eq!(count(|e| matches!(e, TrackEvent::PressKey { .. } | TrackEvent::ReleaseKey { .. })), keys.len());
    assert_eq!(count(|e| matches!(e, TrackEvent::SetCursor { .. })), cursors.len());
    assert_eq!(count(|e| matches!(e, TrackEvent::SetBarNumber { .. })), bars.len());
    assert_eq!(count(|e| matches!(e, TrackEvent::SetSvgFile { .. })), 2);

    let times: Vec<u64> = decoded.groups.iter().map(|g| g.time).collect();
    assert_eq!(times, vec![0, 400, 500, 900, 1_000, u64::MAX]);
}

#[test]
fn empty_track_round_trips() {
    let original = Track {
        instruments: Vec::new(),
        groups: Vec::new(),
        pages: Vec::new(),
    };
    let bytes = track::encode(&original).unwrap();
    assert_eq!(bytes.len(), 4 + 1 + 1 + 8 + 2);
    assert_eq!(track::decode(&bytes).unwrap(), original);
}

#[test]
fn written_file_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.lpyp");
    std::fs::write(&path, b"stale content that is longer than the track").unwrap();

    let original = Track {
        instruments: vec!["Piano".into()],
        groups: Vec::new(),
        pages: vec![b"<svg/>".to_vec()],
    };
    track::write_track(&path, &track::encode(&original).unwrap()).unwrap();
    assert_eq!(track::read_track(&path).unwrap(), original);
}
