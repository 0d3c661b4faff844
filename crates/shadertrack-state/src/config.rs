use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shadertrack_hash::MAX_SHADER_BYTECODE_BYTES;
use tracing::warn;

pub const PROFILE_FILE_NAME: &str = "ShaderProfil.json";
pub const DISASSEMBLY_DIR_NAME: &str = "DumpShader";

/// Tracker configuration.
///
/// Every field has a default, so hosts can embed this in their own config files and only spell out
/// what they override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackerConfig {
    /// Profile file. Defaults to [`PROFILE_FILE_NAME`] next to the running executable.
    pub profile_path: PathBuf,
    /// Root of the per-stage disassembly dumps (`<dir>/<Vertex|Pixel>/asm/<hash>.asm`).
    pub disassembly_dir: PathBuf,
    /// Re-derive watched registers from disassembly dumps after loading profiles.
    pub scan_disassembly: bool,
    /// Scan bound for locating the end token of incoming bytecode.
    pub max_bytecode_bytes: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::in_dir(&executable_dir())
    }
}

impl TrackerConfig {
    /// Defaults rooted at `dir` instead of the executable's directory.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            profile_path: dir.join(PROFILE_FILE_NAME),
            disassembly_dir: dir.join(DISASSEMBLY_DIR_NAME),
            scan_disassembly: cfg!(debug_assertions),
            max_bytecode_bytes: MAX_SHADER_BYTECODE_BYTES,
        }
    }

    pub fn with_profile_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.profile_path = path.into();
        self
    }

    pub fn with_disassembly_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.disassembly_dir = dir.into();
        self
    }

    pub fn with_scan_disassembly(mut self, enabled: bool) -> Self {
        self.scan_disassembly = enabled;
        self
    }

    pub fn with_max_bytecode_bytes(mut self, max: usize) -> Self {
        self.max_bytecode_bytes = max;
        self
    }
}

fn executable_dir() -> PathBuf {
    match std::env::current_exe() {
        Ok(exe) => exe
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
        Err(err) => {
            warn!(%err, "executable path unavailable, using working directory");
            PathBuf::from(".")
        }
    }
}
