//! End-to-end conversion tests on synthetic typesetter output.

mod common;

use common::{note_line, write, PageBuilder};
use pretty_assertions::assert_eq;
use scoretrack::{pipeline, DebugDump, Error, EventGroup, Inputs, Options, TrackEvent};

const MS: u64 = 1_000_000;

/// One page, one system of two staves; a two-staff chord, a retriggered
/// key and a tie across the bar line.
struct Fixture {
    dir: tempfile::TempDir,
    inputs: Inputs,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();

    let page = PageBuilder::new()
        .system(10.0, 2)
        .head("song.ly:3:2:3", 1, 30.0, 12.0)
        .head("song.ly:9:2:3", 1, 30.0, 24.0)
        .head("song.ly:3:5:6", 1, 50.0, 12.0)
        .head("song.ly:4:2:3", 2, 70.0, 12.0)
        .head("song.ly:4:7:8", 2, 90.0, 12.0)
        .build();
    let page = write(dir.path(), "song-page1.svg", page);

    let log = [
        note_line(0, 500 * MS, "song.ly:3:2:3", 60, 0, false),
        note_line(0, 500 * MS, "song.ly:9:2:3", 48, 1, false),
        note_line(500 * MS, 1000 * MS, "song.ly:3:5:6", 60, 0, false),
        note_line(1000 * MS, 1500 * MS, "song.ly:4:2:3", 64, 0, true),
        note_line(1500 * MS, 2000 * MS, "song.ly:4:7:8", 64, 0, false),
    ]
    .concat();
    let notes = write(dir.path(), "song.notes", log);
    let instruments = write(dir.path(), "song.instruments", "0 Piano right hand\n1 Piano left hand\n");

    let inputs = Inputs::new(notes, instruments, dir.path().join("song.lpyp")).page(page);
    Fixture { dir, inputs }
}

fn cursor(left: u32, right: u32) -> TrackEvent {
    TrackEvent::SetCursor {
        left,
        right,
        top: 80_000,
        bottom: 280_000,
    }
}

#[test]
fn builds_track_from_page_and_log() {
    let f = fixture();
    let summary = pipeline::run(&f.inputs, &Options::default(), &DebugDump::disabled()).unwrap();

    assert_eq!(summary.notes, 5);
    assert_eq!(summary.chords, 4);
    assert_eq!(summary.key_events, 8);
    assert_eq!(summary.bar_changes, 2);

    let track = scoretrack::inspect_file(&f.inputs.output).unwrap();
    assert_eq!(track.instruments, vec!["Piano right hand", "Piano left hand"]);
    assert_eq!(
        track.groups,
        vec![
            EventGroup {
                time: 0,
                events: vec![
                    TrackEvent::SetSvgFile { page: 0 },
                    cursor(293_500, 306_500),
                    TrackEvent::SetBarNumber { bar_number: 1 },
                    TrackEvent::PressKey { pitch: 60, staff_number: 0 },
                    TrackEvent::PressKey { pitch: 48, staff_number: 1 },
                ],
            },
            EventGroup {
                time: 425 * MS,
                events: vec![TrackEvent::ReleaseKey { pitch: 60 }],
            },
            EventGroup {
                time: 500 * MS,
                events: vec![
                    cursor(493_500, 506_500),
                    TrackEvent::ReleaseKey { pitch: 48 },
                    TrackEvent::PressKey { pitch: 60, staff_number: 0 },
                ],
            },
            EventGroup {
                time: 1000 * MS,
                events: vec![
                    cursor(693_500, 706_500),
                    TrackEvent::SetBarNumber { bar_number: 2 },
                    TrackEvent::ReleaseKey { pitch: 60 },
                    TrackEvent::PressKey { pitch: 64, staff_number: 0 },
                ],
            },
            EventGroup {
                time: 1500 * MS,
                events: vec![cursor(893_500, 906_500)],
            },
            EventGroup {
                time: 2000 * MS,
                events: vec![TrackEvent::ReleaseKey { pitch: 64 }],
            },
        ]
    );

    let embedded = std::fs::read(&f.inputs.pages[0]).unwrap();
    assert_eq!(track.pages, vec![embedded]);
    assert_eq!(summary.bytes, std::fs::metadata(&f.inputs.output).unwrap().len() as usize);
}

#[test]
fn display_pages_are_embedded_instead() {
    let f = fixture();
    let display = write(f.dir.path(), "song-page1-plain.svg", "<svg/>");
    let inputs = f.inputs.clone().display_page(&display);

    pipeline::run(&inputs, &Options::default(), &DebugDump::disabled()).unwrap();
    let track = scoretrack::inspect_file(&inputs.output).unwrap();
    assert_eq!(track.pages, vec![b"<svg/>".to_vec()]);
}

#[test]
fn display_page_count_must_match() {
    let f = fixture();
    let display = write(f.dir.path(), "plain.svg", "<svg/>");
    let inputs = f.inputs.clone().display_page(&display).display_page(&display);

    let err = pipeline::run(&inputs, &Options::default(), &DebugDump::disabled()).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "{err}");
}

#[test]
fn debug_dump_writes_every_stage() {
    let f = fixture();
    let dump_dir = f.dir.path().join("dump");
    let options = Options {
        debug_dump_dir: Some(dump_dir.clone()),
        ..Options::default()
    };
    pipeline::run_with_options(&f.inputs, &options).unwrap();

    for name in [
        "page-1",
        "notes",
        "chords",
        "cursor_boxes",
        "bar_numbers",
        "key_events",
    ] {
        let path = dump_dir.join(format!("{name}.json"));
        let text = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{name}: {e}"));
        let _: serde_json::Value = serde_json::from_str(&text).unwrap();
    }

    let chords: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dump_dir.join("chords.json")).unwrap()).unwrap();
    assert_eq!(chords.as_array().unwrap().len(), 4);
}

#[test]
fn note_on_two_pages_fails_without_output() {
    let f = fixture();
    let second = PageBuilder::new()
        .system(10.0, 1)
        .head("song.ly:3:2:3", 1, 30.0, 12.0)
        .build();
    let second = write(f.dir.path(), "song-page2.svg", second);
    let inputs = f.inputs.clone().page(second);

    let err = pipeline::run(&inputs, &Options::default(), &DebugDump::disabled()).unwrap_err();
    let text = err.to_string();
    assert!(text.contains("found in several pages"), "{text}");
    assert!(text.contains("hint:"), "{text}");
    assert!(!inputs.output.exists());
}

#[test]
fn unknown_note_is_reported() {
    let f = fixture();
    let mut log = std::fs::read_to_string(&f.inputs.notes).unwrap();
    log.push_str(&note_line(3000 * MS, 3500 * MS, "song.ly:99:1:2", 72, 0, false));
    std::fs::write(&f.inputs.notes, log).unwrap();

    let err = pipeline::run(&f.inputs, &Options::default(), &DebugDump::disabled()).unwrap_err();
    assert!(err.to_string().contains("song.ly:99:1:2"), "{err}");
}

#[test]
fn malformed_log_line_is_located() {
    let f = fixture();
    std::fs::write(&f.inputs.notes, "note start-time: 0 stop: 5 id: \"#origin=a#\"\n").unwrap();

    match pipeline::run(&f.inputs, &Options::default(), &DebugDump::disabled()).unwrap_err() {
        Error::Malformed { line, expected, .. } => {
            assert_eq!(line, 1);
            assert_eq!(expected, "'stop-time:'");
        }
        other => panic!("unexpected error {other}"),
    }
}
