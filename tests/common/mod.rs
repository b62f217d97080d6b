//! Synthetic typesetter output for the integration tests.
//!
//! Pages mimic what the typesetter writes: five-line staves drawn as
//! translated `<line>`s, skylines as coloured groups and note heads as
//! `<g id="#...#">` groups around a glyph path.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const SYSTEM_TOP: &str = "#ff0000";
pub const SYSTEM_BOTTOM: &str = "#00ff00";
pub const STAFF_TOP: &str = "#0000ff";
pub const STAFF_BOTTOM: &str = "#ff00ff";

/// Staff lines run from x = 10 to x = 110.
pub const STAFF_LEFT: f64 = 10.0;
pub const STAFF_RIGHT: f64 = 110.0;

/// Vertical distance between the tops of consecutive staves of a system.
pub const STAFF_SPACING: f64 = 12.0;

#[derive(Default)]
pub struct PageBuilder {
    body: String,
}

impl PageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        let _ = writeln!(
            self.body,
            r#"<line x1="{x1:.4}" y1="{y1:.4}" x2="{x2:.4}" y2="{y2:.4}" stroke-width="0.1000"/>"#
        );
    }

    fn skyline(&mut self, color: &str, x1: f64, x2: f64, y: f64) {
        let _ = writeln!(
            self.body,
            r#"<g color="{color}"><line x1="{x1:.4}" y1="{y:.4}" x2="{x2:.4}" y2="{y:.4}"/></g>"#
        );
    }

    /// A system of `staves` staves whose first staff's top line is at `y`.
    pub fn system(mut self, y: f64, staves: usize) -> Self {
        for k in 0..staves {
            let top = y + k as f64 * STAFF_SPACING;
            for i in 0..5 {
                let _ = writeln!(
                    self.body,
                    r#"<line transform="translate({STAFF_LEFT:.4}, {:.4})" stroke-width="0.1000" x1="0.0000" y1="-0.0000" x2="{:.4}" y2="-0.0000"/>"#,
                    top + i as f64,
                    STAFF_RIGHT - STAFF_LEFT
                );
            }
            self.skyline(STAFF_TOP, STAFF_LEFT, STAFF_RIGHT, top - 2.0);
            self.skyline(STAFF_BOTTOM, STAFF_LEFT, STAFF_RIGHT, top + 6.0);
        }
        let last = y + (staves - 1) as f64 * STAFF_SPACING;
        self.skyline(SYSTEM_TOP, STAFF_LEFT - 5.0, STAFF_RIGHT + 5.0, y - 2.0);
        self.skyline(SYSTEM_BOTTOM, STAFF_LEFT - 5.0, STAFF_RIGHT + 5.0, last + 6.0);
        // a bar line, vertical, must not disturb staff detection
        self.line(STAFF_RIGHT, y, STAFF_RIGHT, last + 4.0);
        self
    }

    /// A note head of half extents 0.65 × 0.5 centred on `(x, y)`.
    pub fn head(mut self, origin: &str, bar: u16, x: f64, y: f64) -> Self {
        let _ = writeln!(
            self.body,
            r##"<g id="#x-width=0.6500#y-height=0.5000#bar-number={bar}#origin={origin}#"><path transform="translate({x:.4}, {y:.4})" d="M0.2 0.1C0.5 0.3 0.7 0.2 0.6 0Z"/></g>"##
        );
        self
    }

    pub fn build(self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">
<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" version="1.2" width="210.00mm" height="297.00mm" viewBox="0 0 119.5016 169.0094">
<style text="style/css">
<![CDATA[
tspan {{ white-space: pre; }}
]]>
</style>
{}</svg>
"#,
            self.body
        )
    }
}

/// One line of the note log.
pub fn note_line(start: u64, stop: u64, origin: &str, pitch: u8, staff: u8, tie: bool) -> String {
    format!(
        "note start-time: {start} stop-time: {stop} id: \"#origin={origin}#pitch={pitch}#staff-number={staff}#has-tie-attached={}#is-grace-note=no#\"\n",
        if tie { "yes" } else { "no" }
    )
}

pub fn write(dir: &Path, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}
