use hashbrown::HashMap;
use shadertrack_hash::{fingerprint_with_limit, HashError, ShaderHash, MAX_SHADER_BYTECODE_BYTES};
use tracing::debug;

use crate::profile::ShaderProfile;
use crate::stage::ShaderStage;

/// Host-assigned shader object identifier. Only unique while the object is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderHandle(pub u64);

impl core::fmt::Display for ShaderHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

pub type ProfileMap = HashMap<ShaderHash, ShaderProfile>;

#[derive(Debug, Default)]
struct StageEntries {
    /// hash(token stream) -> profile
    profiles: ProfileMap,
    /// host handle -> hash(token stream)
    handles: HashMap<ShaderHandle, ShaderHash>,
}

/// Per-stage indices from runtime handles to fingerprints and from fingerprints to profiles.
///
/// Profiles are keyed by fingerprint so they outlive the shader objects (and runs) that
/// produced them.
#[derive(Debug)]
pub struct ShaderRegistry {
    stages: [StageEntries; ShaderStage::COUNT],
    max_bytecode_bytes: usize,
}

impl Default for ShaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderRegistry {
    pub fn new() -> Self {
        Self::with_bytecode_limit(MAX_SHADER_BYTECODE_BYTES)
    }

    pub fn with_bytecode_limit(max_bytecode_bytes: usize) -> Self {
        Self {
            stages: Default::default(),
            max_bytecode_bytes,
        }
    }

    /// Fingerprints `bytecode` and maps `handle` to it, creating a default profile the first
    /// time the fingerprint is seen on `stage`.
    ///
    /// Malformed bytecode leaves the registry untouched.
    pub fn register_shader(
        &mut self,
        stage: ShaderStage,
        handle: ShaderHandle,
        bytecode: &[u8],
    ) -> Result<ShaderHash, HashError> {
        let hash = fingerprint_with_limit(bytecode, self.max_bytecode_bytes)?;
        self.register_hash(stage, handle, hash);
        Ok(hash)
    }

    /// Like [`Self::register_shader`] for a fingerprint computed elsewhere.
    pub fn register_hash(&mut self, stage: ShaderStage, handle: ShaderHandle, hash: ShaderHash) {
        let entries = &mut self.stages[stage.index()];
        if !entries.profiles.contains_key(&hash) {
            debug!(?stage, %hash, "new shader profile");
            entries.profiles.insert(hash, ShaderProfile::default());
        }
        if let Some(previous) = entries.handles.insert(handle, hash) {
            if previous != hash {
                debug!(?stage, %handle, %previous, %hash, "shader handle re-registered");
            }
        }
    }

    /// Drops the mapping for a destroyed shader object. The profile is kept.
    pub fn forget_handle(&mut self, stage: ShaderStage, handle: ShaderHandle) -> Option<ShaderHash> {
        self.stages[stage.index()].handles.remove(&handle)
    }

    pub fn lookup_hash(&self, stage: ShaderStage, handle: ShaderHandle) -> Option<ShaderHash> {
        self.stages[stage.index()].handles.get(&handle).copied()
    }

    pub fn lookup_profile(&self, stage: ShaderStage, hash: ShaderHash) -> Option<&ShaderProfile> {
        self.stages[stage.index()].profiles.get(&hash)
    }

    pub fn lookup_profile_mut(
        &mut self,
        stage: ShaderStage,
        hash: ShaderHash,
    ) -> Option<&mut ShaderProfile> {
        self.stages[stage.index()].profiles.get_mut(&hash)
    }

    /// handle -> fingerprint -> profile.
    pub fn resolve(&self, stage: ShaderStage, handle: ShaderHandle) -> Option<&ShaderProfile> {
        let hash = self.lookup_hash(stage, handle)?;
        self.lookup_profile(stage, hash)
    }

    pub fn profiles(&self, stage: ShaderStage) -> &ProfileMap {
        &self.stages[stage.index()].profiles
    }

    pub fn profiles_mut(&mut self, stage: ShaderStage) -> &mut ProfileMap {
        &mut self.stages[stage.index()].profiles
    }

    /// Returns the profile for `hash`, creating a default one if needed.
    pub fn profile_entry(&mut self, stage: ShaderStage, hash: ShaderHash) -> &mut ShaderProfile {
        self.stages[stage.index()].profiles.entry(hash).or_default()
    }
}
