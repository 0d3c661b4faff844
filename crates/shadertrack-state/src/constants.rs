use hashbrown::HashMap;
use shadertrack_hash::ShaderHash;

use crate::error::TrackerError;
use crate::stage::ConstantKind;

/// Floats per constant register (`float4`/`int4`).
pub const FLOATS_PER_REGISTER: usize = 4;

/// Last uploaded payload for one start register.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantRecord {
    pub start_register: u32,
    pub register_count: u32,
    pub data: Vec<f32>,
}

impl ConstantRecord {
    /// Payload as raw 32-bit words, for integer and boolean constants.
    pub fn words(&self) -> &[u32] {
        bytemuck::cast_slice(&self.data)
    }

    /// Floats of register `start_register + offset`, if it is covered by this record.
    pub fn register(&self, offset: u32) -> Option<&[f32]> {
        if offset >= self.register_count {
            return None;
        }
        let start = offset as usize * FLOATS_PER_REGISTER;
        self.data.get(start..start + FLOATS_PER_REGISTER)
    }
}

/// Host-side copies of constant uploads, per constant kind and shader fingerprint.
///
/// Records are never evicted. Lookups are linear since a shader only touches a handful of
/// register ranges.
#[derive(Debug, Default)]
pub struct ConstantShadow {
    kinds: [HashMap<ShaderHash, Vec<ConstantRecord>>; ConstantKind::COUNT],
}

impl ConstantShadow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data[..vec4_count * 4]` for `start_register`, replacing the payload of an existing
    /// record with the same start register.
    ///
    /// Fails without recording anything if `data` holds fewer than `vec4_count * 4` floats.
    pub fn record(
        &mut self,
        kind: ConstantKind,
        hash: ShaderHash,
        start_register: u32,
        vec4_count: u32,
        data: &[f32],
    ) -> Result<(), TrackerError> {
        let len = vec4_count as usize * FLOATS_PER_REGISTER;
        let copy = data
            .get(..len)
            .ok_or(TrackerError::ConstantDataTooShort {
                expected: len,
                actual: data.len(),
            })?
            .to_vec();

        let records = self.kinds[kind.index()].entry(hash).or_default();
        match records
            .iter_mut()
            .find(|r| r.start_register == start_register)
        {
            Some(existing) => {
                existing.register_count = vec4_count;
                existing.data = copy;
            }
            None => records.push(ConstantRecord {
                start_register,
                register_count: vec4_count,
                data: copy,
            }),
        }
        Ok(())
    }

    pub fn get(&self, kind: ConstantKind, hash: ShaderHash) -> Option<&[ConstantRecord]> {
        self.kinds[kind.index()].get(&hash).map(Vec::as_slice)
    }

    pub fn record_at(
        &self,
        kind: ConstantKind,
        hash: ShaderHash,
        start_register: u32,
    ) -> Option<&ConstantRecord> {
        self.get(kind, hash)?
            .iter()
            .find(|r| r.start_register == start_register)
    }
}
