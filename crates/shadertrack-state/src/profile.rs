use std::collections::BTreeSet;

use bitflags::bitflags;

use crate::stage::ShaderStage;

bitflags! {
    /// Per-shader behavior flags stored in the profile file.
    ///
    /// Bits without a named constant are kept as-is so files written by newer tools survive a
    /// load/save cycle.
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
    pub struct ShaderFlags: u32 {
        /// Draws using this shader belong to (or precede) the UI pass.
        const UI_HOOK = 1 << 0;
    }
}

/// Register the host uploads the world transform to on the vertex stage.
pub const WORLD_MATRIX_REGISTER: u32 = 195;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderProfile {
    /// Gate for override behavior. Defaults to `true`.
    pub activated: bool,
    pub flags: ShaderFlags,
    pub watched_vs: BTreeSet<u32>,
    pub watched_ps: BTreeSet<u32>,
    /// Set once a world matrix upload is seen while this shader is bound. Never persisted.
    pub binds_world_matrix: bool,
}

impl Default for ShaderProfile {
    fn default() -> Self {
        Self {
            activated: true,
            flags: ShaderFlags::empty(),
            watched_vs: BTreeSet::new(),
            watched_ps: BTreeSet::new(),
            binds_world_matrix: false,
        }
    }
}

impl ShaderProfile {
    pub fn watched(&self, stage: ShaderStage) -> &BTreeSet<u32> {
        match stage {
            ShaderStage::Vertex => &self.watched_vs,
            ShaderStage::Pixel => &self.watched_ps,
        }
    }

    pub fn watched_mut(&mut self, stage: ShaderStage) -> &mut BTreeSet<u32> {
        match stage {
            ShaderStage::Vertex => &mut self.watched_vs,
            ShaderStage::Pixel => &mut self.watched_ps,
        }
    }

    pub fn watches(&self, stage: ShaderStage, register: u32) -> bool {
        self.watched(stage).contains(&register)
    }
}
