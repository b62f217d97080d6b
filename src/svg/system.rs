//! Grouping of staves into systems using the system skylines.

use super::skyline::Skyline;
use super::PageContext;
use crate::error::Result;
use crate::model::{Coord, Staff, System};

/// For each pair of system skylines, the range of staves lying between
/// them (within `tolerance`). The result is checked to partition the
/// staves.
pub(super) fn group_systems(
    staves: &[Staff],
    system_top: &[Skyline],
    system_bottom: &[Skyline],
    tolerance: Coord,
    ctx: &PageContext,
) -> Result<Vec<System>> {
    if system_top.len() != system_bottom.len() {
        return Err(ctx.geometry(format!(
            "mismatched skyline counts: {} system top skylines but {} system bottom skylines",
            system_top.len(),
            system_bottom.len()
        )));
    }

    let mut systems = Vec::with_capacity(system_top.len());
    for (k, (top, bottom)) in system_top.iter().zip(system_bottom).enumerate() {
        let upper = top.top - tolerance;
        let lower = bottom.bottom + tolerance;

        let inside: Vec<usize> = staves
            .iter()
            .enumerate()
            .filter(|(_, s)| s.top_skyline >= upper && s.bottom_skyline <= lower)
            .map(|(i, _)| i)
            .collect();

        match (inside.first(), inside.last()) {
            (Some(&first), Some(&last)) => systems.push(System { first, last }),
            _ => {
                return Err(ctx.geometry(format!(
                    "system {k} (between y {upper} and {lower}) contains no staff"
                )))
            }
        }
    }

    check_partition(&systems, staves.len()).map_err(|msg| ctx.geometry(msg))?;
    Ok(systems)
}

/// Systems must cover staves `0..staff_count` in ascending, contiguous,
/// non-overlapping ranges.
fn check_partition(systems: &[System], staff_count: usize) -> std::result::Result<(), String> {
    let mut expected_first = 0;
    for (k, system) in systems.iter().enumerate() {
        if system.first > system.last {
            return Err(format!("system {k} has an empty staff range"));
        }
        if system.first < expected_first {
            return Err(format!(
                "staff {} belongs to more than one system (systems {} and {k})",
                system.first,
                k.saturating_sub(1)
            ));
        }
        if system.first > expected_first {
            return Err(format!("staff {expected_first} doesn't belong to any system"));
        }
        expected_first = system.last + 1;
    }

    if expected_first != staff_count {
        return Err(format!("staff {expected_first} doesn't belong to any system"));
    }
    Ok(())
}
