//! Page geometry extraction: turns one engraved page (SVG) into staves,
//! systems and note-head bounding boxes.
//!
//! The typesetter draws three kinds of things we care about:
//!   - the staff lines themselves (plain `<line>` elements),
//!   - skylines, as `<line>` children of `<g color=...>` groups, one
//!     colour per skyline family (see [`SkylineColors`]),
//!   - note heads, as `<g id="#...#">` groups wrapping the head glyph.
//!
//! All coordinates are converted to integer sub-units on the way in.

mod lines;
mod note_head;
pub(crate) mod numbers;
mod skyline;
mod staff;
mod system;

use std::path::Path;

use roxmltree::{Document, Node};
use tracing::debug;

use crate::config::{Options, SkylineColors};
use crate::error::{Error, Result};
use crate::model::{Coord, Page};

/// Parse context of one page, used to attach file and line to errors.
pub(crate) struct PageContext<'a, 'input> {
    pub path: &'a Path,
    pub doc: &'a Document<'input>,
}

impl PageContext<'_, '_> {
    pub fn line_of(&self, node: &Node) -> usize {
        self.doc.text_pos_at(node.range().start).row as usize
    }

    pub fn malformed(
        &self,
        node: &Node,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Error {
        Error::malformed(
            self.path.display().to_string(),
            self.line_of(node),
            expected,
            found,
        )
    }

    pub fn geometry(&self, message: impl Into<String>) -> Error {
        Error::geometry(self.path, message)
    }

    pub fn geometry_at(&self, node: &Node, message: impl AsRef<str>) -> Error {
        Error::geometry(
            self.path,
            format!("line {}: {}", self.line_of(node), message.as_ref()),
        )
    }
}

/// Read and analyse one page file.
pub fn read_page(path: &Path, options: &Options) -> Result<Page> {
    let svg = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_page(path, &svg, options)
}

/// Analyse one page from its SVG text. `path` is only used for reporting.
pub fn parse_page(path: &Path, svg: &str, options: &Options) -> Result<Page> {
    // The typesetter may emit a DOCTYPE declaration
    let parsing = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = Document::parse_with_options(svg, parsing).map_err(|e| Error::Xml {
        path: path.to_path_buf(),
        source: e,
    })?;
    let ctx = PageContext { path, doc: &doc };

    extract(&ctx, &options.skyline_colors, options.system_tolerance)
}

fn extract(ctx: &PageContext, colors: &SkylineColors, tolerance: Coord) -> Result<Page> {
    let lines = lines::staff_line_candidates(ctx)?;
    let frames = staff::detect_staves(&lines);
    let skylines = skyline::collect_skylines(ctx, colors)?;

    let staves = staff::attach_skylines(&frames, &skylines.staff_top, &skylines.staff_bottom, ctx)?;
    let systems = system::group_systems(
        &staves,
        &skylines.system_top,
        &skylines.system_bottom,
        tolerance,
        ctx,
    )?;
    let note_heads = note_head::collect_note_heads(ctx)?;

    debug!(
        page = %ctx.path.display(),
        lines = lines.len(),
        staves = staves.len(),
        systems = systems.len(),
        note_heads = note_heads.len(),
        "page analysed"
    );

    Ok(Page {
        path: ctx.path.to_path_buf(),
        staves,
        systems,
        note_heads,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Segment, System};
    use std::path::PathBuf;

    const STAFF_TOP: &str = "#0000ff";
    const STAFF_BOTTOM: &str = "#ff00ff";
    const SYSTEM_TOP: &str = "#ff0000";
    const SYSTEM_BOTTOM: &str = "#00ff00";

    fn staff_lines(x: f64, y: f64, width: f64) -> String {
        (0..5)
            .map(|i| {
                format!(
                    r#"<line transform="translate({x:.4}, {:.4})" x1="0.0000" y1="-0.0000" x2="{width:.4}" y2="-0.0000"/>"#,
                    y + i as f64
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn skyline(color: &str, x1: f64, x2: f64, y: f64) -> String {
        format!(
            r#"<g color="{color}"><line x1="{x1:.4}" y1="{y:.4}" x2="{x2:.4}" y2="{y:.4}"/><line x1="{x2:.4}" y1="{y:.4}" x2="{x2:.4}" y2="{:.4}"/></g>"#,
            y + 0.5
        )
    }

    fn note_head(origin: &str, bar: u16, cx: f64, cy: f64) -> String {
        format!(
            r##"<g id="#x-width=0.6500#y-height=0.5000#bar-number={bar}#origin={origin}#"><path transform="translate({cx:.4}, {cy:.4})" d="M0 0"/></g>"##
        )
    }

    /// A page with two systems of one staff each, plus one note head per staff.
    fn two_system_page() -> String {
        let mut body = Vec::new();
        for (k, y) in [10.0, 30.0].into_iter().enumerate() {
            body.push(staff_lines(5.0, y, 100.0));
            body.push(skyline(STAFF_TOP, 5.0, 105.0, y - 2.0));
            body.push(skyline(STAFF_BOTTOM, 5.0, 105.0, y + 6.0));
            body.push(skyline(SYSTEM_TOP, 0.0, 110.0, y - 2.0));
            body.push(skyline(SYSTEM_BOTTOM, 0.0, 110.0, y + 6.0));
            body.push(note_head(&format!("song.ly:{k}:1:2"), k as u16 + 1, 20.0, y + 2.0));
        }
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="210.00mm" height="297.00mm" viewBox="0 0 119.5016 169.0094">
{}
</svg>
"#,
            body.join("\n")
        )
    }

    fn parse(svg: &str) -> Result<Page> {
        parse_page(&PathBuf::from("page-1.svg"), svg, &Options::default())
    }

    #[test]
    fn extracts_staves_systems_and_heads() {
        let page = parse(&two_system_page()).unwrap();

        assert_eq!(page.staves.len(), 2);
        let staff = &page.staves[0];
        assert_eq!((staff.x, staff.y, staff.width, staff.height), (50_000, 100_000, 1_000_000, 40_000));
        assert_eq!(staff.top_skyline, 80_000);
        assert_eq!(staff.bottom_skyline, 160_000);
        assert_eq!(
            staff.full_top_skyline,
            vec![Segment { x1: 50_000, x2: 1_050_000, y: 80_000 }]
        );

        assert_eq!(page.systems, vec![System { first: 0, last: 0 }, System { first: 1, last: 1 }]);

        assert_eq!(page.note_heads.len(), 2);
        let head = &page.note_heads[1];
        assert_eq!(head.id, "song.ly:1:1:2");
        assert_eq!(head.bar_number, 2);
        assert_eq!((head.left, head.right, head.top, head.bottom), (193_500, 206_500, 315_000, 325_000));
    }

    #[test]
    fn staff_lines_inside_colored_groups_are_ignored() {
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><g color="black">{}</g></svg>"#,
            staff_lines(5.0, 10.0, 100.0)
        );
        let page = parse(&svg).unwrap();
        assert!(page.staves.is_empty());
        assert!(page.systems.is_empty());
    }

    #[test]
    fn missing_bottom_skyline_is_fatal() {
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg">{}{}</svg>"#,
            staff_lines(5.0, 10.0, 100.0),
            skyline(STAFF_TOP, 5.0, 105.0, 8.0)
        );
        let err = parse(&svg).unwrap_err();
        assert!(err.to_string().contains("mismatched skyline counts"), "{err}");
    }

    #[test]
    fn system_without_staff_is_fatal() {
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg">{}{}</svg>"#,
            skyline(SYSTEM_TOP, 0.0, 110.0, 8.0),
            skyline(SYSTEM_BOTTOM, 0.0, 110.0, 16.0)
        );
        let err = parse(&svg).unwrap_err();
        assert!(matches!(err, Error::Geometry { .. }));
        assert!(err.to_string().contains("contains no staff"), "{err}");
    }

    #[test]
    fn diagonal_skyline_segment_is_fatal() {
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><g color="{STAFF_TOP}"><line x1="0.0000" y1="0.0000" x2="1.0000" y2="1.0000"/></g></svg>"#
        );
        let err = parse(&svg).unwrap_err();
        assert!(err.to_string().contains("horizontal or vertical"), "{err}");
    }

    #[test]
    fn staff_skylines_must_pair_up() {
        // the closest top skyline is the second one, the closest bottom one the first
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg">{}{}{}{}{}</svg>"#,
            staff_lines(5.0, 10.0, 100.0),
            skyline(STAFF_TOP, 5.0, 105.0, 8.0),
            skyline(STAFF_TOP, 5.0, 105.0, 9.0),
            skyline(STAFF_BOTTOM, 5.0, 105.0, 16.0),
            skyline(STAFF_BOTTOM, 5.0, 105.0, 30.0)
        );
        let err = parse(&svg).unwrap_err();
        assert!(matches!(err, Error::Geometry { .. }));
        assert!(err.to_string().contains("top skyline Some(1), bottom skyline Some(0)"), "{err}");
    }

    #[test]
    fn head_glyph_may_be_scaled() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg"><g id="#x-width=0.6500#y-height=0.5000#bar-number=3#origin=a#"><path transform="translate(20.0000, 12.0000) scale(0.0040, -0.0040)" d="M0 0"/></g></svg>"##;
        let page = parse(svg).unwrap();
        let head = &page.note_heads[0];
        assert_eq!((head.left, head.right, head.top, head.bottom), (193_500, 206_500, 115_000, 125_000));
        assert_eq!(head.bar_number, 3);
    }

    #[test]
    fn malformed_head_id_reports_line() {
        let svg = "<svg xmlns=\"http://www.w3.org/2000/svg\">\n<g id=\"#bar-number=1#origin=a\"><path transform=\"translate(1, 1)\"/></g>\n</svg>";
        match parse(svg).unwrap_err() {
            Error::Malformed { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn malformed_coordinate_is_fatal() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><line x1="1,5" y1="0" x2="3" y2="0"/></svg>"#;
        assert!(matches!(parse(svg), Err(Error::Malformed { .. })));
    }
}
