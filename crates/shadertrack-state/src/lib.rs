//! Shader identity and binding-state tracking for intercepted D3D9 shaders.
//!
//! The interception layer reports three events: shader creation (with its token stream), shader
//! binds, and constant uploads. From those this crate maintains:
//!
//! - [`ShaderRegistry`]: runtime handle -> content fingerprint -> [`ShaderProfile`], per stage.
//! - [`BindingTracker`]: the handle bound on each stage, plus what was bound this period.
//! - [`ConstantShadow`]: the last payload uploaded to each constant range, per fingerprint.
//! - [`ProfileStore`]: the on-disk, hand-editable copy of the profiles.
//!
//! [`ShaderTracker`] ties them together and is what a renderer owns. Queries never fail: a handle
//! or fingerprint that cannot be resolved simply means no special behavior applies.

mod binding;
mod config;
mod constants;
pub mod disasm;
mod error;
mod profile;
mod registry;
mod stage;
mod store;
mod tracker;

#[cfg(test)]
mod tests;

pub use crate::binding::BindingTracker;
pub use crate::config::{TrackerConfig, DISASSEMBLY_DIR_NAME, PROFILE_FILE_NAME};
pub use crate::constants::{ConstantRecord, ConstantShadow, FLOATS_PER_REGISTER};
pub use crate::error::{ProfileError, TrackerError};
pub use crate::profile::{ShaderFlags, ShaderProfile, WORLD_MATRIX_REGISTER};
pub use crate::registry::{ProfileMap, ShaderHandle, ShaderRegistry};
pub use crate::stage::{ConstantKind, RawShaderStage, ShaderStage};
pub use crate::store::{
    decode_document, encode_document, DecodeIssue, DecodedProfiles, LoadReport, ProfileRecord,
    ProfileStore, PROFILE_VERSION,
};
pub use crate::tracker::ShaderTracker;

pub use shadertrack_hash::{HashError, ShaderHash};
