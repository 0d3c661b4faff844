use shadertrack_hash::{token_stream_from_raw, ShaderHash};
use tracing::{error, warn};

use crate::binding::BindingTracker;
use crate::config::TrackerConfig;
use crate::constants::{ConstantRecord, ConstantShadow};
use crate::error::{ProfileError, TrackerError};
use crate::profile::{ShaderFlags, ShaderProfile, WORLD_MATRIX_REGISTER};
use crate::registry::{ProfileMap, ShaderHandle, ShaderRegistry};
use crate::stage::{ConstantKind, RawShaderStage, ShaderStage};
use crate::store::{LoadReport, ProfileStore};

/// Shader identity and binding state for one device.
///
/// The renderer owns one of these per device and forwards the interception layer's shader
/// creation, bind and constant upload calls to it. All calls are expected on the render thread.
#[derive(Debug)]
pub struct ShaderTracker {
    registry: ShaderRegistry,
    bindings: BindingTracker,
    constants: ConstantShadow,
    store: ProfileStore,
    config: TrackerConfig,
}

impl ShaderTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            registry: ShaderRegistry::with_bytecode_limit(config.max_bytecode_bytes),
            bindings: BindingTracker::new(),
            constants: ConstantShadow::new(),
            store: ProfileStore::from_config(&config),
            config,
        }
    }

    /// Creates a tracker and loads the profile file into it.
    pub fn open(config: TrackerConfig) -> Self {
        let mut tracker = Self::new(config);
        tracker.load_profiles();
        tracker
    }

    /// Saves profiles and drops the tracker.
    pub fn close(self) -> Result<(), ProfileError> {
        self.save_profiles()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ShaderRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ShaderRegistry {
        &mut self.registry
    }

    pub fn bindings(&self) -> &BindingTracker {
        &self.bindings
    }

    pub fn constants(&self) -> &ConstantShadow {
        &self.constants
    }

    // ---------------------------------------------------------------------
    // Inbound calls from the interception layer
    // ---------------------------------------------------------------------

    pub fn register_shader(
        &mut self,
        stage: ShaderStage,
        handle: ShaderHandle,
        bytecode: &[u8],
    ) -> Result<ShaderHash, TrackerError> {
        self.registry
            .register_shader(stage, handle, bytecode)
            .map_err(|err| {
                error!(?stage, %handle, %err, "rejecting shader bytecode");
                TrackerError::from(err)
            })
    }

    pub fn notify_shader_created(
        &mut self,
        stage: RawShaderStage,
        bytecode: &[u8],
        handle: ShaderHandle,
    ) -> Result<ShaderHash, TrackerError> {
        let stage = checked_stage(stage)?;
        self.register_shader(stage, handle, bytecode)
    }

    /// Pointer form of [`Self::notify_shader_created`] for token streams of unknown length.
    ///
    /// # Safety
    ///
    /// Same contract as [`shadertrack_hash::token_stream_from_raw`]: `bytecode` must be null or a
    /// 4-byte aligned token stream readable up to its end token or the configured scan limit.
    pub unsafe fn notify_shader_created_raw(
        &mut self,
        stage: RawShaderStage,
        bytecode: *const u32,
        handle: ShaderHandle,
    ) -> Result<ShaderHash, TrackerError> {
        let stage = checked_stage(stage)?;
        // SAFETY: forwarded from this function's contract.
        let bytes = unsafe { token_stream_from_raw(bytecode, self.config.max_bytecode_bytes) }
            .map_err(|err| {
                error!(?stage, %handle, %err, "rejecting shader bytecode");
                TrackerError::from(err)
            })?;
        self.register_shader(stage, handle, bytes)
    }

    pub fn bind(&mut self, stage: ShaderStage, handle: ShaderHandle) {
        if self.registry.lookup_hash(stage, handle).is_none() {
            warn!(?stage, %handle, "binding a shader handle that was never hashed");
        }
        self.bindings.bind(stage, handle, &self.registry);
    }

    pub fn notify_shader_bound(&mut self, stage: RawShaderStage, handle: ShaderHandle) {
        if let Ok(stage) = checked_stage(stage) {
            self.bind(stage, handle);
        }
    }

    /// Forgets a destroyed shader object. Unbinds it first if it is still bound.
    pub fn notify_shader_destroyed(&mut self, stage: RawShaderStage, handle: ShaderHandle) {
        let Ok(stage) = checked_stage(stage) else {
            return;
        };
        if self.bindings.bound_handle(stage) == Some(handle) {
            self.bindings.unbind(stage);
        }
        self.registry.forget_handle(stage, handle);
    }

    /// Shadows a constant upload under the fingerprint bound on `stage`, or under
    /// [`ShaderHash::NONE`] if nothing resolvable is bound.
    ///
    /// A vertex upload starting at [`WORLD_MATRIX_REGISTER`] marks the bound shader as one that
    /// consumes a world matrix.
    pub fn record_upload(
        &mut self,
        stage: ShaderStage,
        kind: ConstantKind,
        start_register: u32,
        vec4_count: u32,
        data: &[f32],
    ) -> Result<(), TrackerError> {
        let bound = self.bindings.bound_hash(stage, &self.registry);

        self.constants.record(
            kind,
            bound.unwrap_or(ShaderHash::NONE),
            start_register,
            vec4_count,
            data,
        )?;

        if stage == ShaderStage::Vertex && start_register == WORLD_MATRIX_REGISTER {
            let profile = bound.and_then(|hash| self.registry.lookup_profile_mut(stage, hash));
            if let Some(profile) = profile {
                profile.binds_world_matrix = true;
            }
        }
        Ok(())
    }

    pub fn notify_constant_upload(
        &mut self,
        stage: RawShaderStage,
        kind: ConstantKind,
        start_register: u32,
        vec4_count: u32,
        data: &[f32],
    ) {
        let Ok(stage) = checked_stage(stage) else {
            return;
        };
        if let Err(err) = self.record_upload(stage, kind, start_register, vec4_count, data) {
            error!(?stage, ?kind, start_register, vec4_count, %err, "dropping constant upload");
        }
    }

    /// Ends the current period (frame).
    pub fn end_period(&mut self) {
        self.bindings.reset_period();
    }

    // ---------------------------------------------------------------------
    // Queries for the override layer
    // ---------------------------------------------------------------------

    pub fn is_bound_activated(&self) -> bool {
        self.bindings.is_bound_activated(&self.registry)
    }

    pub fn is_bound_flagged(&self, flags: ShaderFlags) -> bool {
        self.bindings.is_bound_flagged(flags, &self.registry)
    }

    pub fn is_register_watched(&self, register: u32, stage: ShaderStage) -> bool {
        self.bindings
            .is_register_watched(register, stage, &self.registry)
    }

    pub fn is_world_matrix_bound(&self) -> bool {
        self.bindings.is_world_matrix_bound(&self.registry)
    }

    pub fn is_hash_bound(&self, hash: ShaderHash, stage: ShaderStage) -> bool {
        self.bindings.is_hash_bound(hash, stage)
    }

    pub fn is_hash_current(&self, hash: ShaderHash, stage: ShaderStage) -> bool {
        self.bindings.is_hash_current(hash, stage, &self.registry)
    }

    pub fn is_pre_ui_bound(&self) -> bool {
        self.bindings.is_pre_ui_bound()
    }

    pub fn bound_hash(&self, stage: ShaderStage) -> Option<ShaderHash> {
        self.bindings.bound_hash(stage, &self.registry)
    }

    pub fn bound_profile(&self, stage: ShaderStage) -> Option<&ShaderProfile> {
        self.bindings.bound_profile(stage, &self.registry)
    }

    pub fn constants_for(&self, kind: ConstantKind, hash: ShaderHash) -> Option<&[ConstantRecord]> {
        self.constants.get(kind, hash)
    }

    pub fn profiles(&self, stage: ShaderStage) -> &ProfileMap {
        self.registry.profiles(stage)
    }

    pub fn profiles_mut(&mut self, stage: ShaderStage) -> &mut ProfileMap {
        self.registry.profiles_mut(stage)
    }

    // ---------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------

    /// Loads the profile file. Failures are logged and leave the registry as it was.
    ///
    /// Returns `None` if the load was abandoned.
    pub fn load_profiles(&mut self) -> Option<LoadReport> {
        match self.store.load(&mut self.registry) {
            Ok(report) => Some(report),
            Err(err) => {
                error!(path = %self.store.path().display(), %err, "failed to load shader profiles");
                None
            }
        }
    }

    pub fn save_profiles(&self) -> Result<(), ProfileError> {
        self.store.save(&self.registry).inspect_err(|err| {
            error!(path = %self.store.path().display(), %err, "failed to save shader profiles");
        })
    }
}

fn checked_stage(raw: RawShaderStage) -> Result<ShaderStage, TrackerError> {
    ShaderStage::try_from(raw).inspect_err(|err| error!(%err, "ignoring shader call"))
}
