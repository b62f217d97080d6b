//! Decimal literals and transforms as written by the typesetter.

use crate::model::{Coord, COORD_SCALE};

/// Number of decimals kept when converting to sub-units.
const DECIMALS: usize = 4;

/// Convert a decimal literal (`-?digits[.digits]`) to sub-units.
///
/// The conversion is exact up to the fourth decimal; further digits are
/// truncated. Returns `None` on any other syntax or on overflow.
pub(crate) fn parse_fixed(s: &str) -> Option<Coord> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) if !f.is_empty() => (i, f),
        Some(_) => return None,
        None => (digits, ""),
    };

    let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if int_part.is_empty() || !all_digits(int_part) || !all_digits(frac_part) {
        return None;
    }

    let int_value: Coord = int_part.parse().ok()?;
    let frac_bytes = frac_part.as_bytes();
    let frac_value = (0..DECIMALS).fold(0, |acc, i| {
        acc * 10 + frac_bytes.get(i).map_or(0, |b| Coord::from(b - b'0'))
    });

    let value = int_value.checked_mul(COORD_SCALE)?.checked_add(frac_value)?;
    Some(if negative { -value } else { value })
}

/// Parse `translate(X, Y)` or `translate(X)`; the separator may be a comma,
/// whitespace, or both.
pub(crate) fn parse_translate(s: &str) -> Option<(Coord, Coord)> {
    let inner = s
        .trim()
        .strip_prefix("translate(")?
        .strip_suffix(')')?;
    translate_args(inner)
}

/// The offset of a transform list starting with `translate(...)`. Later
/// functions such as `scale(...)` act around the translated origin and
/// are ignored.
pub(crate) fn parse_leading_translate(s: &str) -> Option<(Coord, Coord)> {
    let (inner, rest) = s
        .trim()
        .strip_prefix("translate(")?
        .split_once(')')?;
    if !(rest.is_empty() || rest.starts_with(|c: char| c == ',' || c.is_whitespace())) {
        return None;
    }
    translate_args(inner)
}

fn translate_args(inner: &str) -> Option<(Coord, Coord)> {
    let mut parts = inner
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty());

    let x = parse_fixed(parts.next()?)?;
    let y = match parts.next() {
        Some(p) => parse_fixed(p)?,
        None => 0,
    };

    if parts.next().is_some() {
        return None;
    }
    Some((x, y))
}
