//! Decoding of `#field=value#field=value#` id strings.
//!
//! The typesetter attaches these ids to every note it reports, both in the
//! note log and on the engraved note heads. They are decoded once here;
//! the rest of the crate only sees typed values.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Where an id came from, for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdLocation {
    pub source_name: String,
    pub line: usize,
}

impl IdLocation {
    pub fn new(source_name: impl Into<String>, line: usize) -> Self {
        Self {
            source_name: source_name.into(),
            line,
        }
    }
}

/// A validated id string.
#[derive(Debug, Clone)]
pub struct IdRecord {
    fields: BTreeMap<String, String>,
    location: IdLocation,
}

impl IdRecord {
    /// Parse `raw`, which must start with `#` and end with a `#`
    /// terminator. Every field needs a non-empty name and an `=`. Field
    /// names must be unique.
    pub fn parse(raw: &str, location: IdLocation) -> Result<Self> {
        let fail = |expected: &str, found: String| {
            Error::malformed(&location.source_name, location.line, expected, found)
        };

        let body = raw
            .strip_prefix('#')
            .ok_or_else(|| fail("id starting with '#'", format!("'{raw}'")))?;
        let body = body
            .strip_suffix('#')
            .ok_or_else(|| fail("id terminated by '#'", format!("'{raw}'")))?;

        let mut fields = BTreeMap::new();
        if body.is_empty() {
            return Err(fail("at least one field=value pair", format!("'{raw}'")));
        }

        for pair in body.split('#') {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| fail("field=value", format!("'{pair}' in '{raw}'")))?;
            if name.is_empty() {
                return Err(fail("field name before '='", format!("'{pair}' in '{raw}'")));
            }
            if value.contains('=') {
                return Err(fail("a single '=' per field", format!("'{pair}' in '{raw}'")));
            }
            if fields.insert(name.to_string(), value.to_string()).is_some() {
                return Err(fail("unique field names", format!("duplicate '{name}' in '{raw}'")));
            }
        }

        Ok(Self { fields, location })
    }

    /// Raw value of a required field.
    pub fn str(&self, field: &str) -> Result<&str> {
        self.fields.get(field).map(String::as_str).ok_or_else(|| {
            Error::malformed(
                &self.location.source_name,
                self.location.line,
                format!("field '{field}'"),
                "no such field",
            )
        })
    }

    /// A required field parsed as `T`.
    pub fn value<T: FromStr>(&self, field: &str) -> Result<T> {
        let raw = self.str(field)?;
        raw.parse().map_err(|_| {
            Error::malformed(
                &self.location.source_name,
                self.location.line,
                format!("a {} for field '{field}'", std::any::type_name::<T>()),
                format!("'{raw}'"),
            )
        })
    }

    /// An optional `yes`/`no` field; absent means `no`.
    pub fn flag(&self, field: &str) -> Result<bool> {
        match self.fields.get(field).map(String::as_str) {
            None | Some("no") => Ok(false),
            Some("yes") => Ok(true),
            Some(other) => Err(Error::malformed(
                &self.location.source_name,
                self.location.line,
                format!("'yes' or 'no' for field '{field}'"),
                format!("'{other}'"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<IdRecord> {
        IdRecord::parse(raw, IdLocation::new("test", 1))
    }

    #[test]
    fn decodes_typesetter_id() {
        let id = parse(
            "#x-width=1.389984#y-height=1.100012#origin=././foo.ly:17:25:27#pitch=83#has-tie-attached=no#staff-number=0#",
        )
        .unwrap();
        assert_eq!(id.str("origin").unwrap(), "././foo.ly:17:25:27");
        assert_eq!(id.value::<u8>("pitch").unwrap(), 83);
        assert_eq!(id.value::<u8>("staff-number").unwrap(), 0);
        assert!(!id.flag("has-tie-attached").unwrap());
        assert!(!id.flag("is-grace-note").unwrap());
    }

    #[test]
    fn rejects_missing_terminator() {
        assert!(matches!(parse("#pitch=60"), Err(Error::Malformed { .. })));
        assert!(matches!(parse("pitch=60#"), Err(Error::Malformed { .. })));
        assert!(matches!(parse("##"), Err(Error::Malformed { .. })));
    }

    #[test]
    fn rejects_field_without_value_separator() {
        assert!(parse("#pitch#").is_err());
        assert!(parse("#=60#").is_err());
        assert!(parse("#pitch=60#pitch=61#").is_err());
    }

    #[test]
    fn reports_missing_and_bad_fields() {
        let id = parse("#pitch=high#has-tie-attached=maybe#").unwrap();
        let missing = id.str("origin").unwrap_err().to_string();
        assert!(missing.contains("field 'origin'"), "{missing}");
        assert!(id.value::<u8>("pitch").is_err());
        assert!(id.flag("has-tie-attached").is_err());
    }
}
