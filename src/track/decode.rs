use super::{
    EventGroup, Track, TrackEvent, MAGIC, TAG_PRESS_KEY, TAG_RELEASE_KEY, TAG_SET_BAR_NUMBER,
    TAG_SET_CURSOR, TAG_SET_SVG_FILE, VERSION,
};
use crate::error::{Error, Result};

/// Cursor over the encoded bytes.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn error(&self, expected: impl Into<String>, found: impl Into<String>) -> Error {
        Error::malformed(format!("track at byte {}", self.pos), 0, expected, found)
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.bytes.len());
        let Some(end) = end else {
            return Err(self.error(
                format!("{n} bytes of {what}"),
                format!("{} bytes before the end", self.bytes.len() - self.pos),
            ));
        };
        let bytes = self.bytes;
        let slice = &bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    fn u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.array::<1>(what)?[0])
    }

    fn u16(&mut self, what: &str) -> Result<u16> {
        self.array(what).map(u16::from_be_bytes)
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        self.array(what).map(u32::from_be_bytes)
    }

    fn u64(&mut self, what: &str) -> Result<u64> {
        self.array(what).map(u64::from_be_bytes)
    }

    /// NUL-terminated UTF-8 string.
    fn c_string(&mut self, what: &str) -> Result<String> {
        let bytes = self.bytes;
        let rest = &bytes[self.pos..];
        let Some(len) = rest.iter().position(|&b| b == 0) else {
            return Err(self.error(format!("a NUL-terminated {what}"), "end of data"));
        };
        let text = std::str::from_utf8(&rest[..len])
            .map_err(|_| self.error(format!("a UTF-8 {what}"), format!("{:?}", &rest[..len])))?
            .to_string();
        self.pos += len + 1;
        Ok(text)
    }

    fn event(&mut self) -> Result<TrackEvent> {
        let tag = self.u8("event tag")?;
        Ok(match tag {
            TAG_PRESS_KEY => TrackEvent::PressKey {
                pitch: self.u8("pitch")?,
                staff_number: self.u8("staff number")?,
            },
            TAG_RELEASE_KEY => TrackEvent::ReleaseKey {
                pitch: self.u8("pitch")?,
            },
            TAG_SET_BAR_NUMBER => TrackEvent::SetBarNumber {
                bar_number: self.u16("bar number")?,
            },
            TAG_SET_CURSOR => TrackEvent::SetCursor {
                left: self.u32("cursor left")?,
                right: self.u32("cursor right")?,
                top: self.u32("cursor top")?,
                bottom: self.u32("cursor bottom")?,
            },
            TAG_SET_SVG_FILE => TrackEvent::SetSvgFile {
                page: self.u16("page index")?,
            },
            other => {
                self.pos -= 1;
                return Err(self.error("an event tag (0 to 4)", other.to_string()));
            }
        })
    }
}

/// Decode a whole track. The input must hold exactly one track.
pub fn decode(bytes: &[u8]) -> Result<Track> {
    let mut r = Reader { bytes, pos: 0 };

    let magic = r.take(MAGIC.len(), "magic")?;
    if magic != MAGIC {
        r.pos = 0;
        return Err(r.error("magic 'LPYP'", format!("{magic:?}")));
    }
    let version = r.u8("version")?;
    if version != VERSION {
        r.pos -= 1;
        return Err(r.error(format!("version {VERSION}"), version.to_string()));
    }

    let instrument_count = r.u8("instrument count")?;
    let instruments = (0..instrument_count)
        .map(|_| r.c_string("instrument name"))
        .collect::<Result<Vec<_>>>()?;

    let group_count = r.u64("group count")?;
    let mut groups = Vec::new();
    for _ in 0..group_count {
        let time = r.u64("group time")?;
        let count = r.u8("event count")?;
        let events = (0..count)
            .map(|_| r.event())
            .collect::<Result<Vec<_>>>()?;
        groups.push(EventGroup { time, events });
    }

    let page_count = r.u16("page count")?;
    let mut pages = Vec::with_capacity(usize::from(page_count));
    for _ in 0..page_count {
        let size = r.u32("page size")? as usize;
        pages.push(r.take(size, "page data")?.to_vec());
    }

    if r.pos != bytes.len() {
        return Err(r.error("end of data", format!("{} trailing bytes", bytes.len() - r.pos)));
    }

    Ok(Track {
        instruments,
        groups,
        pages,
    })
}
