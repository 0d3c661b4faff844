use core::fmt;

use crate::error::TrackerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

impl ShaderStage {
    pub const COUNT: usize = 2;
    pub const ALL: [ShaderStage; Self::COUNT] = [ShaderStage::Vertex, ShaderStage::Pixel];

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Vertex => 0,
            Self::Pixel => 1,
        }
    }

    /// Directory name used for per-stage disassembly dumps.
    pub fn dump_dir_name(self) -> &'static str {
        match self {
            Self::Vertex => "Vertex",
            Self::Pixel => "Pixel",
        }
    }
}

/// Stage value as delivered by the interception layer (Vulkan-style stage bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawShaderStage(pub u32);

impl RawShaderStage {
    pub const VERTEX: RawShaderStage = RawShaderStage(0x0000_0001);
    pub const FRAGMENT: RawShaderStage = RawShaderStage(0x0000_0010);
}

impl fmt::Display for RawShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl From<ShaderStage> for RawShaderStage {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => Self::VERTEX,
            ShaderStage::Pixel => Self::FRAGMENT,
        }
    }
}

impl TryFrom<RawShaderStage> for ShaderStage {
    type Error = TrackerError;

    fn try_from(raw: RawShaderStage) -> Result<Self, Self::Error> {
        match raw {
            RawShaderStage::VERTEX => Ok(Self::Vertex),
            RawShaderStage::FRAGMENT => Ok(Self::Pixel),
            other => Err(TrackerError::UnsupportedStage(other)),
        }
    }
}

/// D3D9 constant register file targeted by an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantKind {
    Float,
    Int,
    Bool,
}

impl ConstantKind {
    pub const COUNT: usize = 3;

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Float => 0,
            Self::Int => 1,
            Self::Bool => 2,
        }
    }
}
