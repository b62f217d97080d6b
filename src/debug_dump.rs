//! JSON dumps of intermediate pipeline stages, for troubleshooting.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Where stage dumps go, if anywhere. Passed down explicitly; there is no
/// process-wide switch.
#[derive(Debug, Clone, Default)]
pub struct DebugDump {
    dir: Option<PathBuf>,
}

impl DebugDump {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Dump into `dir`, creating it if needed.
    pub fn to_dir(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        Ok(Self {
            dir: Some(dir.to_path_buf()),
        })
    }

    /// Write `value` as pretty JSON to `<dir>/<name>.json`. Does nothing
    /// when disabled.
    pub fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let path = dir.join(format!("{name}.json"));

        let file = File::create(&path).map_err(|e| Error::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value).map_err(|e| Error::Dump {
            path: path.clone(),
            source: e,
        })?;
        writer.write_all(b"\n").map_err(|e| Error::io(&path, e))?;
        writer.flush().map_err(|e| Error::io(&path, e))?;

        debug!(path = %path.display(), "debug dump written");
        Ok(())
    }
}
