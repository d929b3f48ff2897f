#![allow(dead_code)]

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use quake_ingest::data::Value;
use quake_ingest::rows::Row;
use tempfile::{TempDir, tempdir};

pub const EARTHQUAKE_HEADER: &str = "time,latitude,longitude,depth,mag,magType,nst,gap,dmin,rms,net,id,updated,place,type,horizontalError,depthError,magError,magNst,status,locationSource,magSource";

/// Two events in feed layout. `nst` and `magNst` are integral in the first
/// row and empty in the second.
pub fn earthquake_feed() -> String {
    [
        EARTHQUAKE_HEADER,
        "2024-05-01T12:00:00.000Z,35.7,-117.6,8.2,2.31,ml,23,57,0.05,0.17,ci,ci40000001,2024-05-01T12:10:00.000Z,\"10km NE of Ridgecrest, CA\",earthquake,0.3,0.6,0.15,25,reviewed,ci,ci",
        "2024-05-01T12:05:00.000Z,61.2,-150.1,35,1.8,ml,,120,,0.52,ak,ak0240001,2024-05-01T12:20:00.000Z,\"20 km S of Anchorage, Alaska\",earthquake,,0.4,,,automatic,ak,ak",
    ]
    .join("\n")
        + "\n"
}

/// Builds a row of raw text cells.
pub fn text_row(pairs: &[(&str, &str)]) -> Row {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), Value::text(*value)))
        .collect::<HashMap<_, _>>()
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}
