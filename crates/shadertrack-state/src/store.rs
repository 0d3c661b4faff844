//! Persistence of shader profiles to a hand-editable JSON file.
//!
//! ```json
//! {
//!   "Version": 1,
//!   "VertexShaders": { "2864434397": { "Activate": true, "ShaderFlags": 1, "ConstantVs": [2], "ConstantPs": [] } },
//!   "PixelShaders": {}
//! }
//! ```
//!
//! Keys are decimal fingerprints. A JSON syntax error abandons the whole load; an entry that does
//! not decode (bad key, wrong field type) is reported and skipped while the rest still load.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shadertrack_hash::ShaderHash;
use tracing::{debug, warn};

use crate::config::TrackerConfig;
use crate::disasm;
use crate::error::ProfileError;
use crate::profile::{ShaderFlags, ShaderProfile};
use crate::registry::ShaderRegistry;
use crate::stage::ShaderStage;

/// Newest profile schema this crate reads and the one it writes.
pub const PROFILE_VERSION: u32 = 1;

const VERSION_KEY: &str = "Version";

fn section_name(stage: ShaderStage) -> &'static str {
    match stage {
        ShaderStage::Vertex => "VertexShaders",
        ShaderStage::Pixel => "PixelShaders",
    }
}

fn default_activate() -> bool {
    true
}

/// On-disk form of a [`ShaderProfile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    #[serde(rename = "Activate", default = "default_activate")]
    pub activate: bool,
    #[serde(rename = "ShaderFlags", default)]
    pub shader_flags: u32,
    #[serde(rename = "ConstantVs", default)]
    pub constant_vs: BTreeSet<u32>,
    #[serde(rename = "ConstantPs", default)]
    pub constant_ps: BTreeSet<u32>,
}

impl ProfileRecord {
    pub fn from_profile(profile: &ShaderProfile) -> Self {
        Self {
            activate: profile.activated,
            shader_flags: profile.flags.bits(),
            constant_vs: profile.watched_vs.clone(),
            constant_ps: profile.watched_ps.clone(),
        }
    }

    /// Overwrites the persisted fields of `profile`. Runtime-derived state is reset.
    pub fn apply_to(&self, profile: &mut ShaderProfile) {
        profile.activated = self.activate;
        profile.flags = ShaderFlags::from_bits_retain(self.shader_flags);
        profile.watched_vs = self.constant_vs.clone();
        profile.watched_ps = self.constant_ps.clone();
        profile.binds_world_matrix = false;
    }
}

#[derive(Serialize)]
struct ProfileDocument {
    #[serde(rename = "Version")]
    version: u32,
    #[serde(rename = "VertexShaders")]
    vertex: BTreeMap<u32, ProfileRecord>,
    #[serde(rename = "PixelShaders")]
    pixel: BTreeMap<u32, ProfileRecord>,
}

/// An entry (or section) of the profile file that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeIssue {
    pub section: &'static str,
    pub key: Option<String>,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct DecodedProfiles {
    pub version: u32,
    pub stages: [Vec<(ShaderHash, ProfileRecord)>; ShaderStage::COUNT],
    pub issues: Vec<DecodeIssue>,
}

impl DecodedProfiles {
    pub fn records(&self, stage: ShaderStage) -> &[(ShaderHash, ProfileRecord)] {
        &self.stages[stage.index()]
    }

    pub fn len(&self) -> usize {
        self.stages.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decodes a profile document, collecting per-entry failures instead of aborting on them.
pub fn decode_document(raw: &str) -> Result<DecodedProfiles, ProfileError> {
    let root: Value = serde_json::from_str(raw).map_err(ProfileError::parse)?;
    let Value::Object(root) = root else {
        return Err(ProfileError::NotAnObject);
    };

    let mut decoded = DecodedProfiles {
        version: PROFILE_VERSION,
        ..Default::default()
    };

    match root.get(VERSION_KEY) {
        None => decoded.version = 1,
        Some(value) => match value.as_u64() {
            Some(found) if found > PROFILE_VERSION as u64 => {
                return Err(ProfileError::UnsupportedVersion {
                    found,
                    supported: PROFILE_VERSION,
                });
            }
            Some(found) => decoded.version = found as u32,
            None => decoded.issues.push(DecodeIssue {
                section: VERSION_KEY,
                key: None,
                reason: format!("expected an unsigned integer, found {value}"),
            }),
        },
    }

    for stage in ShaderStage::ALL {
        let section = section_name(stage);
        let entries = match root.get(section) {
            None | Some(Value::Null) => continue,
            Some(Value::Object(entries)) => entries,
            Some(other) => {
                decoded.issues.push(DecodeIssue {
                    section,
                    key: None,
                    reason: format!("expected an object, found {other}"),
                });
                continue;
            }
        };

        for (key, value) in entries {
            let hash = match key.parse::<ShaderHash>() {
                Ok(hash) => hash,
                Err(err) => {
                    decoded.issues.push(DecodeIssue {
                        section,
                        key: Some(key.clone()),
                        reason: format!("invalid fingerprint: {err}"),
                    });
                    continue;
                }
            };
            match ProfileRecord::deserialize(value) {
                Ok(record) => decoded.stages[stage.index()].push((hash, record)),
                Err(err) => decoded.issues.push(DecodeIssue {
                    section,
                    key: Some(key.clone()),
                    reason: err.to_string(),
                }),
            }
        }
    }

    Ok(decoded)
}

/// Serializes every profile in `registry`, ordered by fingerprint.
pub fn encode_document(registry: &ShaderRegistry) -> Result<String, ProfileError> {
    let collect = |stage: ShaderStage| -> BTreeMap<u32, ProfileRecord> {
        registry
            .profiles(stage)
            .iter()
            .map(|(hash, profile)| (hash.get(), ProfileRecord::from_profile(profile)))
            .collect()
    };
    let document = ProfileDocument {
        version: PROFILE_VERSION,
        vertex: collect(ShaderStage::Vertex),
        pixel: collect(ShaderStage::Pixel),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadReport {
    /// No profile file exists yet; the registry was not touched.
    Missing,
    Loaded {
        entries: usize,
        skipped: usize,
        dumps_scanned: usize,
    },
}

/// Loads and saves the registry's profiles at a fixed path.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
    /// Disassembly root scanned after a successful load, if enabled.
    disassembly_dir: Option<PathBuf>,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            disassembly_dir: None,
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self {
            path: config.profile_path.clone(),
            disassembly_dir: config
                .scan_disassembly
                .then(|| config.disassembly_dir.clone()),
        }
    }

    pub fn with_disassembly_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.disassembly_dir = Some(dir.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Merges the profile file into `registry`.
    ///
    /// Entries in the file overwrite the matching profiles' persisted fields; profiles that are
    /// not in the file are left alone. On error nothing has been applied.
    pub fn load(&self, registry: &mut ShaderRegistry) -> Result<LoadReport, ProfileError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no shader profile file");
                return Ok(LoadReport::Missing);
            }
            Err(err) => return Err(err.into()),
        };

        let decoded = decode_document(&raw)?;
        for issue in &decoded.issues {
            warn!(
                path = %self.path.display(),
                section = issue.section,
                key = issue.key.as_deref().unwrap_or("-"),
                reason = %issue.reason,
                "skipping shader profile entry"
            );
        }

        for stage in ShaderStage::ALL {
            for (hash, record) in decoded.records(stage) {
                record.apply_to(registry.profile_entry(stage, *hash));
            }
        }

        let dumps_scanned = match &self.disassembly_dir {
            Some(dir) => disasm::scan_registry(registry, dir),
            None => 0,
        };

        debug!(
            path = %self.path.display(),
            entries = decoded.len(),
            skipped = decoded.issues.len(),
            dumps_scanned,
            "loaded shader profiles"
        );
        Ok(LoadReport::Loaded {
            entries: decoded.len(),
            skipped: decoded.issues.len(),
            dumps_scanned,
        })
    }

    /// Writes every profile in `registry`, replacing the file.
    pub fn save(&self, registry: &ShaderRegistry) -> Result<(), ProfileError> {
        let raw = encode_document(registry)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = Self::tmp_path(&self.path);
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "saved shader profiles");
        Ok(())
    }

    fn tmp_path(path: &Path) -> PathBuf {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}
