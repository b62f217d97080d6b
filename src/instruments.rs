//! Staff number → instrument name table.
//!
//! One record per line, `<staff-number> <name...>`. Staff numbers must be
//! exactly `0..N` in any order.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Largest number of instruments the track header can hold.
pub const MAX_INSTRUMENTS: usize = 255;

/// Parse an instrument table; names come back ordered by staff number.
pub fn parse_instruments(source_name: &str, text: &str) -> Result<Vec<String>> {
    let mut by_staff: BTreeMap<u8, (usize, String)> = BTreeMap::new();

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let record = raw.trim();
        if record.is_empty() {
            continue;
        }

        let (number, name) = record
            .split_once(char::is_whitespace)
            .map_or((record, ""), |(n, rest)| (n, rest.trim()));
        let staff: u8 = number.parse().map_err(|_| {
            Error::malformed(source_name, line, "a staff number", format!("'{number}'"))
        })?;

        if name.contains('\0') {
            return Err(Error::malformed(
                source_name,
                line,
                "an instrument name without NUL bytes",
                format!("{name:?}"),
            ));
        }
        if name.is_empty() {
            warn!(source = source_name, line, staff, "instrument without a name");
        }

        if let Some((first, _)) = by_staff.insert(staff, (line, name.to_string())) {
            return Err(Error::malformed(
                source_name,
                line,
                format!("a single record for staff {staff}"),
                format!("another one (first on line {first})"),
            ));
        }
    }

    if by_staff.len() > MAX_INSTRUMENTS {
        return Err(Error::Capacity {
            what: "instruments",
            limit: MAX_INSTRUMENTS,
        });
    }

    if let Some((expected, (&staff, (line, _)))) = by_staff
        .iter()
        .enumerate()
        .find(|(k, (staff, _))| usize::from(**staff) != *k)
    {
        return Err(Error::malformed(
            source_name,
            *line,
            format!("staff number {expected} (numbers must run from 0 without gaps)"),
            staff.to_string(),
        ));
    }

    let names: Vec<String> = by_staff.into_values().map(|(_, name)| name).collect();
    debug!(source = source_name, instruments = names.len(), "instrument table parsed");
    Ok(names)
}

/// Read and parse an instrument table file.
pub fn read_instruments(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_instruments(&path.display().to_string(), &text)
}
