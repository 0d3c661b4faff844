use hashbrown::HashSet;
use shadertrack_hash::ShaderHash;

use crate::profile::{ShaderFlags, ShaderProfile};
use crate::registry::{ShaderHandle, ShaderRegistry};
use crate::stage::ShaderStage;

/// Tracks which shader handle is bound on each stage and which fingerprints were bound during the
/// current period (usually a frame).
///
/// Bindings are stored as handles and resolved through the registry on every query, so profile
/// edits take effect without rebinding and a handle that was never hashed simply resolves to
/// nothing.
#[derive(Debug, Default)]
pub struct BindingTracker {
    current: [Option<ShaderHandle>; ShaderStage::COUNT],
    /// Resolved at bind time, so destroying or reusing a handle later does not rewrite history.
    bound_this_period: [HashSet<ShaderHash>; ShaderStage::COUNT],
    /// Every draw after a UI-hooked shader was bound falls in the UI pass.
    pre_ui_bound: bool,
}

impl BindingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, stage: ShaderStage, handle: ShaderHandle, registry: &ShaderRegistry) {
        self.current[stage.index()] = Some(handle);
        if let Some(hash) = registry.lookup_hash(stage, handle) {
            self.bound_this_period[stage.index()].insert(hash);
        }
        self.pre_ui_bound |= self.is_bound_flagged(ShaderFlags::UI_HOOK, registry);
    }

    pub fn unbind(&mut self, stage: ShaderStage) {
        self.current[stage.index()] = None;
    }

    pub fn bound_handle(&self, stage: ShaderStage) -> Option<ShaderHandle> {
        self.current[stage.index()]
    }

    pub fn bound_hash(&self, stage: ShaderStage, registry: &ShaderRegistry) -> Option<ShaderHash> {
        registry.lookup_hash(stage, self.bound_handle(stage)?)
    }

    pub fn bound_profile<'r>(
        &self,
        stage: ShaderStage,
        registry: &'r ShaderRegistry,
    ) -> Option<&'r ShaderProfile> {
        registry.resolve(stage, self.bound_handle(stage)?)
    }

    fn bound_profiles<'a>(
        &'a self,
        registry: &'a ShaderRegistry,
    ) -> impl Iterator<Item = &'a ShaderProfile> + 'a {
        ShaderStage::ALL
            .into_iter()
            .filter_map(move |stage| self.bound_profile(stage, registry))
    }

    /// False if any stage's bound shader has been deactivated. Stages without a resolvable
    /// binding do not veto.
    pub fn is_bound_activated(&self, registry: &ShaderRegistry) -> bool {
        self.bound_profiles(registry).all(|profile| profile.activated)
    }

    /// True if any stage's bound shader has at least one of `flags` set.
    pub fn is_bound_flagged(&self, flags: ShaderFlags, registry: &ShaderRegistry) -> bool {
        self.bound_profiles(registry).any(|profile| profile.flags.intersects(flags))
    }

    pub fn is_register_watched(
        &self,
        register: u32,
        stage: ShaderStage,
        registry: &ShaderRegistry,
    ) -> bool {
        self.bound_profile(stage, registry)
            .is_some_and(|profile| profile.watches(stage, register))
    }

    pub fn is_world_matrix_bound(&self, registry: &ShaderRegistry) -> bool {
        self.bound_profiles(registry).any(|profile| profile.binds_world_matrix)
    }

    /// Whether some handle with fingerprint `hash` was bound on `stage` during this period.
    pub fn is_hash_bound(&self, hash: ShaderHash, stage: ShaderStage) -> bool {
        self.bound_this_period[stage.index()].contains(&hash)
    }

    /// Whether the handle bound on `stage` right now has fingerprint `hash`.
    pub fn is_hash_current(
        &self,
        hash: ShaderHash,
        stage: ShaderStage,
        registry: &ShaderRegistry,
    ) -> bool {
        self.bound_hash(stage, registry) == Some(hash)
    }

    pub fn is_pre_ui_bound(&self) -> bool {
        self.pre_ui_bound
    }

    /// Starts a new period. Live bindings are kept.
    pub fn reset_period(&mut self) {
        self.pre_ui_bound = false;
        for bound in &mut self.bound_this_period {
            bound.clear();
        }
    }
}
