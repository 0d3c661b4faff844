//! Watched-register discovery from human-readable disassembly dumps.
//!
//! Development tooling dumps each shader's disassembly to
//! `<dir>/<Vertex|Pixel>/asm/<hash>.asm`. Lines mentioning one of the known constant symbols mark
//! the register that symbol is bound to as watched.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use shadertrack_hash::ShaderHash;
use tracing::debug;

use crate::registry::ShaderRegistry;
use crate::stage::ShaderStage;

const VERTEX_SYMBOLS: &[(&str, u32)] = &[
    ("gFadeColor", 2),
    ("gMaterialDiffuse", 170),
    ("gMaterialAlbedo", 171),
    ("gMatPower", 4),
    ("gAmbientColor", 1),
    ("gDepthView", 186),
];

const PIXEL_SYMBOLS: &[(&str, u32)] = &[("gMaterialDiffuse", 170), ("gMaterialAlbedo", 171)];

pub fn symbol_table(stage: ShaderStage) -> &'static [(&'static str, u32)] {
    match stage {
        ShaderStage::Vertex => VERTEX_SYMBOLS,
        ShaderStage::Pixel => PIXEL_SYMBOLS,
    }
}

pub fn dump_path(dir: &Path, stage: ShaderStage, hash: ShaderHash) -> PathBuf {
    dir.join(stage.dump_dir_name())
        .join("asm")
        .join(format!("{hash}.asm"))
}

/// Registers referenced by known symbols in `source`.
pub fn scan_source(stage: ShaderStage, source: &str) -> BTreeSet<u32> {
    let table = symbol_table(stage);
    let mut registers = BTreeSet::new();
    for line in source.lines() {
        for &(symbol, register) in table {
            if line.contains(symbol) {
                registers.insert(register);
            }
        }
    }
    registers
}

/// Adds the registers found in each profile's dump to its watch set for that stage.
///
/// Missing or unreadable dumps contribute nothing. Returns how many dumps were read.
pub fn scan_registry(registry: &mut ShaderRegistry, dir: &Path) -> usize {
    let mut scanned = 0usize;
    for stage in ShaderStage::ALL {
        for (hash, profile) in registry.profiles_mut(stage).iter_mut() {
            let path = dump_path(dir, stage, *hash);
            let source = match std::fs::read_to_string(&path) {
                Ok(source) => source,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => {
                    debug!(path = %path.display(), %err, "unreadable shader disassembly");
                    continue;
                }
            };
            scanned += 1;
            profile
                .watched_mut(stage)
                .extend(scan_source(stage, &source));
        }
    }
    scanned
}
