use pretty_assertions::assert_eq;

use shadertrack_hash::{crc32, HashError, ShaderHash};

use crate::{
    decode_document, disasm, ConstantKind, ProfileError, RawShaderStage, ShaderFlags,
    ShaderHandle, ShaderRegistry, ShaderStage, ShaderTracker, TrackerConfig, TrackerError,
    WORLD_MATRIX_REGISTER,
};

const END: u32 = 0x0000_FFFF;

fn stream(version: u32, body: &[u32]) -> Vec<u8> {
    std::iter::once(&version)
        .chain(body)
        .chain(std::iter::once(&END))
        .flat_map(|w| w.to_le_bytes())
        .collect()
}

fn vs(tag: u32) -> Vec<u8> {
    stream(0xFFFE_0200, &[0x0200_0001, tag])
}

fn ps(tag: u32) -> Vec<u8> {
    stream(0xFFFF_0200, &[0x0200_0001, tag])
}

fn tracker() -> ShaderTracker {
    let dir = std::env::temp_dir().join("shadertrack-unit-tests-unused");
    ShaderTracker::new(TrackerConfig::in_dir(&dir).with_scan_disassembly(false))
}

fn vec4s(values: &[f32]) -> Vec<f32> {
    values.to_vec()
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[test]
fn register_returns_crc_of_stream() {
    let mut registry = ShaderRegistry::new();
    let bytes = vs(1);
    let hash = registry
        .register_shader(ShaderStage::Vertex, ShaderHandle(1), &bytes)
        .unwrap();
    assert_eq!(hash, ShaderHash(crc32(&bytes)));
    assert_eq!(registry.lookup_hash(ShaderStage::Vertex, ShaderHandle(1)), Some(hash));
    assert!(registry.lookup_profile(ShaderStage::Vertex, hash).is_some());
}

#[test]
fn re_registering_a_handle_is_last_write_wins() {
    let mut registry = ShaderRegistry::new();
    let h = ShaderHandle(7);
    let first = registry.register_shader(ShaderStage::Vertex, h, &vs(1)).unwrap();
    let second = registry.register_shader(ShaderStage::Vertex, h, &vs(2)).unwrap();
    assert_ne!(first, second);
    assert_eq!(registry.lookup_hash(ShaderStage::Vertex, h), Some(second));
    assert_eq!(registry.profiles(ShaderStage::Vertex).len(), 2);

    // Another handle with already-seen content does not add a profile.
    registry
        .register_shader(ShaderStage::Vertex, ShaderHandle(8), &vs(1))
        .unwrap();
    assert_eq!(registry.profiles(ShaderStage::Vertex).len(), 2);
}

#[test]
fn re_registering_keeps_existing_profile_state() {
    let mut registry = ShaderRegistry::new();
    let hash = registry
        .register_shader(ShaderStage::Pixel, ShaderHandle(1), &ps(1))
        .unwrap();
    registry
        .lookup_profile_mut(ShaderStage::Pixel, hash)
        .unwrap()
        .activated = false;
    registry
        .register_shader(ShaderStage::Pixel, ShaderHandle(2), &ps(1))
        .unwrap();
    assert!(!registry.lookup_profile(ShaderStage::Pixel, hash).unwrap().activated);
}

#[test]
fn stages_are_indexed_separately() {
    let mut registry = ShaderRegistry::new();
    let bytes = vs(3);
    let hash = registry
        .register_shader(ShaderStage::Vertex, ShaderHandle(1), &bytes)
        .unwrap();
    assert!(registry.lookup_profile(ShaderStage::Pixel, hash).is_none());
    assert_eq!(registry.lookup_hash(ShaderStage::Pixel, ShaderHandle(1)), None);
}

#[test]
fn malformed_bytecode_leaves_registry_untouched() {
    let mut registry = ShaderRegistry::with_bytecode_limit(64);
    let bytes: Vec<u8> = [0xFFFE_0200u32, 0x0200_0001]
        .iter()
        .flat_map(|w| w.to_le_bytes())
        .collect();
    let err = registry
        .register_shader(ShaderStage::Vertex, ShaderHandle(1), &bytes)
        .unwrap_err();
    assert!(matches!(err, HashError::MalformedBytecode { .. }));
    assert!(registry.profiles(ShaderStage::Vertex).is_empty());
    assert_eq!(registry.lookup_hash(ShaderStage::Vertex, ShaderHandle(1)), None);
}

#[test]
fn forgetting_a_handle_keeps_its_profile() {
    let mut registry = ShaderRegistry::new();
    let hash = registry
        .register_shader(ShaderStage::Vertex, ShaderHandle(1), &vs(1))
        .unwrap();
    assert_eq!(registry.forget_handle(ShaderStage::Vertex, ShaderHandle(1)), Some(hash));
    assert_eq!(registry.resolve(ShaderStage::Vertex, ShaderHandle(1)), None);
    assert!(registry.lookup_profile(ShaderStage::Vertex, hash).is_some());
}

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

#[test]
fn deactivated_bound_shader_vetoes_until_reactivated() {
    let mut t = tracker();
    let h = ShaderHandle(1);
    let hash = t.register_shader(ShaderStage::Vertex, h, &vs(1)).unwrap();
    t.bind(ShaderStage::Vertex, h);
    assert!(t.is_bound_activated());

    t.profiles_mut(ShaderStage::Vertex).get_mut(&hash).unwrap().activated = false;
    assert!(!t.is_bound_activated());

    t.profiles_mut(ShaderStage::Vertex).get_mut(&hash).unwrap().activated = true;
    assert!(t.is_bound_activated());
}

#[test]
fn any_stage_can_veto_activation() {
    let mut t = tracker();
    t.register_shader(ShaderStage::Vertex, ShaderHandle(1), &vs(1)).unwrap();
    let ps_hash = t.register_shader(ShaderStage::Pixel, ShaderHandle(2), &ps(1)).unwrap();
    t.bind(ShaderStage::Vertex, ShaderHandle(1));
    t.bind(ShaderStage::Pixel, ShaderHandle(2));
    t.profiles_mut(ShaderStage::Pixel).get_mut(&ps_hash).unwrap().activated = false;
    assert!(!t.is_bound_activated());
}

#[test]
fn never_hashed_binding_resolves_to_nothing() {
    let mut t = tracker();
    t.bind(ShaderStage::Vertex, ShaderHandle(42));
    assert_eq!(t.bindings().bound_handle(ShaderStage::Vertex), Some(ShaderHandle(42)));
    assert_eq!(t.bound_hash(ShaderStage::Vertex), None);
    assert!(t.is_bound_activated());
    assert!(!t.is_bound_flagged(ShaderFlags::UI_HOOK));
    assert!(!t.is_register_watched(2, ShaderStage::Vertex));
    assert!(!t.is_world_matrix_bound());
}

#[test]
fn ui_hook_scenario() {
    let mut t = tracker();
    let ui_hash = ShaderHash(0xAABB_CCDD);
    let ps_handle = ShaderHandle(0x10);
    let vs_handle = ShaderHandle(0x20);
    t.registry_mut()
        .register_hash(ShaderStage::Pixel, ps_handle, ui_hash);
    t.profiles_mut(ShaderStage::Pixel)
        .get_mut(&ui_hash)
        .unwrap()
        .flags |= ShaderFlags::UI_HOOK;
    t.register_shader(ShaderStage::Vertex, vs_handle, &vs(9)).unwrap();

    t.bind(ShaderStage::Pixel, ps_handle);
    t.bind(ShaderStage::Vertex, vs_handle);
    assert!(t.is_bound_flagged(ShaderFlags::UI_HOOK));
    assert!(t.is_pre_ui_bound());
    assert!(t.is_hash_bound(ui_hash, ShaderStage::Pixel));

    t.end_period();
    assert!(!t.is_pre_ui_bound());
    assert!(!t.is_hash_bound(ui_hash, ShaderStage::Pixel));

    // Next frame: fixed-function pixel stage (null handle) and only the vertex shader.
    t.bind(ShaderStage::Pixel, ShaderHandle(0));
    t.bind(ShaderStage::Vertex, vs_handle);
    assert!(!t.is_bound_flagged(ShaderFlags::UI_HOOK));
    assert!(!t.is_pre_ui_bound());
}

#[test]
fn pre_ui_flag_latches_for_the_period() {
    let mut t = tracker();
    let ui = t.register_shader(ShaderStage::Pixel, ShaderHandle(1), &ps(1)).unwrap();
    t.register_shader(ShaderStage::Pixel, ShaderHandle(2), &ps(2)).unwrap();
    t.profiles_mut(ShaderStage::Pixel).get_mut(&ui).unwrap().flags = ShaderFlags::UI_HOOK;

    t.bind(ShaderStage::Pixel, ShaderHandle(1));
    t.bind(ShaderStage::Pixel, ShaderHandle(2));
    assert!(!t.is_bound_flagged(ShaderFlags::UI_HOOK));
    assert!(t.is_pre_ui_bound());
}

#[test]
fn reset_period_keeps_live_bindings() {
    let mut t = tracker();
    let hash = t.register_shader(ShaderStage::Vertex, ShaderHandle(1), &vs(1)).unwrap();
    t.bind(ShaderStage::Vertex, ShaderHandle(1));
    t.profiles_mut(ShaderStage::Vertex).get_mut(&hash).unwrap().activated = false;
    assert!(t.is_hash_bound(hash, ShaderStage::Vertex));

    t.end_period();
    assert!(!t.is_hash_bound(hash, ShaderStage::Vertex));
    assert!(t.is_hash_current(hash, ShaderStage::Vertex));
    assert!(!t.is_bound_activated());
}

#[test]
fn hash_bound_considers_every_handle_with_that_content() {
    let mut t = tracker();
    let hash = t.register_shader(ShaderStage::Vertex, ShaderHandle(1), &vs(1)).unwrap();
    t.register_shader(ShaderStage::Vertex, ShaderHandle(2), &vs(1)).unwrap();
    t.bind(ShaderStage::Vertex, ShaderHandle(2));
    assert!(t.is_hash_bound(hash, ShaderStage::Vertex));
    assert!(!t.is_hash_bound(hash, ShaderStage::Pixel));
}

#[test]
fn destroyed_shader_stays_bound_for_the_rest_of_the_period() {
    let mut t = tracker();
    let hash = t.register_shader(ShaderStage::Pixel, ShaderHandle(1), &ps(1)).unwrap();
    t.bind(ShaderStage::Pixel, ShaderHandle(1));
    t.notify_shader_destroyed(RawShaderStage::FRAGMENT, ShaderHandle(1));

    assert!(t.is_hash_bound(hash, ShaderStage::Pixel));
    assert!(!t.is_hash_current(hash, ShaderStage::Pixel));

    t.end_period();
    assert!(!t.is_hash_bound(hash, ShaderStage::Pixel));
}

#[test]
fn reused_handle_does_not_inherit_period_membership() {
    let mut t = tracker();
    let old = t.register_shader(ShaderStage::Pixel, ShaderHandle(1), &ps(1)).unwrap();
    t.bind(ShaderStage::Pixel, ShaderHandle(1));
    t.notify_shader_destroyed(RawShaderStage::FRAGMENT, ShaderHandle(1));

    let new = t.register_shader(ShaderStage::Pixel, ShaderHandle(1), &ps(2)).unwrap();
    assert_ne!(old, new);
    assert!(!t.is_hash_bound(new, ShaderStage::Pixel));
    assert!(t.is_hash_bound(old, ShaderStage::Pixel));
}

#[test]
fn rehashed_handle_keeps_the_fingerprint_it_was_bound_with() {
    let mut t = tracker();
    let first = t.register_shader(ShaderStage::Vertex, ShaderHandle(1), &vs(1)).unwrap();
    t.bind(ShaderStage::Vertex, ShaderHandle(1));
    let second = t.register_shader(ShaderStage::Vertex, ShaderHandle(1), &vs(2)).unwrap();

    assert!(t.is_hash_bound(first, ShaderStage::Vertex));
    assert!(!t.is_hash_bound(second, ShaderStage::Vertex));
    assert!(t.is_hash_current(second, ShaderStage::Vertex));
}

#[test]
fn watched_register_query_uses_stage_watch_set() {
    let mut t = tracker();
    let hash = t.register_shader(ShaderStage::Vertex, ShaderHandle(1), &vs(1)).unwrap();
    {
        let profile = t.profiles_mut(ShaderStage::Vertex).get_mut(&hash).unwrap();
        profile.watched_vs.insert(170);
        profile.watched_ps.insert(4);
    }
    t.bind(ShaderStage::Vertex, ShaderHandle(1));
    assert!(t.is_register_watched(170, ShaderStage::Vertex));
    assert!(!t.is_register_watched(4, ShaderStage::Vertex));
    assert!(!t.is_register_watched(170, ShaderStage::Pixel));
}

#[test]
fn destroying_bound_shader_unbinds_it() {
    let mut t = tracker();
    t.register_shader(ShaderStage::Vertex, ShaderHandle(1), &vs(1)).unwrap();
    t.bind(ShaderStage::Vertex, ShaderHandle(1));
    t.notify_shader_destroyed(RawShaderStage::VERTEX, ShaderHandle(1));
    assert_eq!(t.bindings().bound_handle(ShaderStage::Vertex), None);
    assert_eq!(t.registry().lookup_hash(ShaderStage::Vertex, ShaderHandle(1)), None);
}

// ---------------------------------------------------------------------------
// Constant shadow
// ---------------------------------------------------------------------------

#[test]
fn same_start_register_overwrites_and_resizes() {
    let mut t = tracker();
    let hash = t.register_shader(ShaderStage::Vertex, ShaderHandle(1), &vs(1)).unwrap();
    t.bind(ShaderStage::Vertex, ShaderHandle(1));

    let first = vec4s(&[1.0; 8]);
    let second = vec4s(&[2.0, 2.5, 3.0, 3.5]);
    t.record_upload(ShaderStage::Vertex, ConstantKind::Float, 10, 2, &first).unwrap();
    t.record_upload(ShaderStage::Vertex, ConstantKind::Float, 10, 1, &second).unwrap();

    let records = t.constants_for(ConstantKind::Float, hash).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].start_register, 10);
    assert_eq!(records[0].register_count, 1);
    assert_eq!(records[0].data, second);
}

#[test]
fn distinct_start_registers_append_in_order() {
    let mut t = tracker();
    let hash = t.register_shader(ShaderStage::Pixel, ShaderHandle(1), &ps(1)).unwrap();
    t.bind(ShaderStage::Pixel, ShaderHandle(1));
    t.record_upload(ShaderStage::Pixel, ConstantKind::Float, 170, 1, &[0.5; 4]).unwrap();
    t.record_upload(ShaderStage::Pixel, ConstantKind::Float, 2, 1, &[0.25; 4]).unwrap();

    let starts: Vec<u32> = t
        .constants_for(ConstantKind::Float, hash)
        .unwrap()
        .iter()
        .map(|r| r.start_register)
        .collect();
    assert_eq!(starts, vec![170, 2]);
    assert_eq!(t.constants_for(ConstantKind::Int, hash), None);
}

#[test]
fn upload_copies_only_the_declared_registers() {
    let mut t = tracker();
    let hash = t.register_shader(ShaderStage::Vertex, ShaderHandle(1), &vs(1)).unwrap();
    t.bind(ShaderStage::Vertex, ShaderHandle(1));
    let data: Vec<f32> = (0..12).map(|i| i as f32).collect();
    t.record_upload(ShaderStage::Vertex, ConstantKind::Float, 0, 2, &data).unwrap();

    let record = t.constants().record_at(ConstantKind::Float, hash, 0).unwrap();
    assert_eq!(record.data.len(), 8);
    assert_eq!(record.register(1), Some(&[4.0, 5.0, 6.0, 7.0][..]));
    assert_eq!(record.register(2), None);
}

#[test]
fn integer_constants_round_trip_as_words() {
    let mut t = tracker();
    let hash = t.register_shader(ShaderStage::Vertex, ShaderHandle(1), &vs(1)).unwrap();
    t.bind(ShaderStage::Vertex, ShaderHandle(1));
    let words = [1u32, 2, 3, 0xFFFF_FFFF];
    let floats: Vec<f32> = words.iter().map(|w| f32::from_bits(*w)).collect();
    t.record_upload(ShaderStage::Vertex, ConstantKind::Int, 0, 1, &floats).unwrap();
    let record = t.constants().record_at(ConstantKind::Int, hash, 0).unwrap();
    assert_eq!(record.words(), &words[..]);
}

#[test]
fn world_matrix_upload_marks_bound_vertex_shader() {
    let mut t = tracker();
    let hash = t.register_shader(ShaderStage::Vertex, ShaderHandle(1), &vs(1)).unwrap();
    t.bind(ShaderStage::Vertex, ShaderHandle(1));
    assert!(!t.is_world_matrix_bound());

    t.record_upload(
        ShaderStage::Vertex,
        ConstantKind::Float,
        WORLD_MATRIX_REGISTER,
        4,
        &[1.0; 16],
    )
    .unwrap();
    assert!(t.profiles(ShaderStage::Vertex)[&hash].binds_world_matrix);
    assert!(t.is_world_matrix_bound());

    t.record_upload(ShaderStage::Vertex, ConstantKind::Float, 0, 1, &[0.0; 4]).unwrap();
    assert!(t.profiles(ShaderStage::Vertex)[&hash].binds_world_matrix);
}

#[test]
fn world_matrix_register_on_pixel_stage_is_ignored() {
    let mut t = tracker();
    let hash = t.register_shader(ShaderStage::Pixel, ShaderHandle(1), &ps(1)).unwrap();
    t.bind(ShaderStage::Pixel, ShaderHandle(1));
    t.record_upload(
        ShaderStage::Pixel,
        ConstantKind::Float,
        WORLD_MATRIX_REGISTER,
        4,
        &[1.0; 16],
    )
    .unwrap();
    assert!(!t.profiles(ShaderStage::Pixel)[&hash].binds_world_matrix);
}

#[test]
fn uploads_without_a_bound_shader_use_the_none_bucket() {
    let mut t = tracker();
    t.record_upload(ShaderStage::Vertex, ConstantKind::Float, 5, 1, &[3.0; 4]).unwrap();
    let records = t.constants_for(ConstantKind::Float, ShaderHash::NONE).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].start_register, 5);
}

#[test]
fn short_upload_is_rejected_without_recording() {
    let mut t = tracker();
    let err = t
        .record_upload(ShaderStage::Vertex, ConstantKind::Float, 0, 2, &[0.0; 5])
        .unwrap_err();
    assert_eq!(
        err,
        TrackerError::ConstantDataTooShort {
            expected: 8,
            actual: 5
        }
    );
    assert_eq!(t.constants_for(ConstantKind::Float, ShaderHash::NONE), None);
}

// ---------------------------------------------------------------------------
// Raw interception entry points
// ---------------------------------------------------------------------------

#[test]
fn unsupported_stage_is_rejected_without_state_change() {
    let mut t = tracker();
    let compute = RawShaderStage(0x20);
    let err = t
        .notify_shader_created(compute, &vs(1), ShaderHandle(1))
        .unwrap_err();
    assert_eq!(err, TrackerError::UnsupportedStage(compute));
    for stage in ShaderStage::ALL {
        assert!(t.profiles(stage).is_empty());
    }

    t.notify_shader_bound(compute, ShaderHandle(1));
    t.notify_constant_upload(compute, ConstantKind::Float, 0, 1, &[0.0; 4]);
    for stage in ShaderStage::ALL {
        assert_eq!(t.bindings().bound_handle(stage), None);
    }
    assert_eq!(t.constants_for(ConstantKind::Float, ShaderHash::NONE), None);
}

#[test]
fn raw_stage_bits_map_to_stages() {
    assert_eq!(ShaderStage::try_from(RawShaderStage::VERTEX), Ok(ShaderStage::Vertex));
    assert_eq!(ShaderStage::try_from(RawShaderStage::FRAGMENT), Ok(ShaderStage::Pixel));
    assert_eq!(RawShaderStage::from(ShaderStage::Pixel), RawShaderStage::FRAGMENT);
}

#[test]
fn raw_pointer_creation_hashes_up_to_end_token() {
    let mut t = tracker();
    let words = [0xFFFE_0200u32, 0x0200_0001, 0x1234, END, 0xDEAD_BEEF];
    let hash = unsafe {
        t.notify_shader_created_raw(RawShaderStage::VERTEX, words.as_ptr(), ShaderHandle(3))
    }
    .unwrap();
    assert_eq!(hash, ShaderHash(crc32(&stream(0xFFFE_0200, &[0x0200_0001, 0x1234]))));
}

// ---------------------------------------------------------------------------
// Profile documents
// ---------------------------------------------------------------------------

#[test]
fn decode_skips_bad_entries_and_keeps_good_ones() {
    let raw = r#"{
        "VertexShaders": {
            "123": { "Activate": false, "ShaderFlags": 1, "ConstantVs": [2, 170], "ConstantPs": [] },
            "not-a-hash": { "Activate": true, "ShaderFlags": 0, "ConstantVs": [], "ConstantPs": [] },
            "456": { "Activate": "yes", "ShaderFlags": 0, "ConstantVs": [], "ConstantPs": [] }
        },
        "PixelShaders": { "789": { "ShaderFlags": 1 } }
    }"#;
    let decoded = decode_document(raw).unwrap();
    assert_eq!(decoded.version, 1);
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded.issues.len(), 2);

    let (hash, record) = &decoded.records(ShaderStage::Vertex)[0];
    assert_eq!(*hash, ShaderHash(123));
    assert!(!record.activate);
    assert_eq!(record.constant_vs.iter().copied().collect::<Vec<_>>(), vec![2, 170]);

    let (hash, record) = &decoded.records(ShaderStage::Pixel)[0];
    assert_eq!(*hash, ShaderHash(789));
    assert!(record.activate);
    assert_eq!(record.shader_flags, 1);
}

#[test]
fn decode_reports_padded_keys_instead_of_merging_them() {
    let raw = r#"{
        "PixelShaders": {
            "42": { "Activate": false },
            " 42": { "Activate": true },
            "042": { "Activate": true }
        }
    }"#;
    let decoded = decode_document(raw).unwrap();
    assert_eq!(decoded.records(ShaderStage::Pixel).len(), 1);
    let (hash, record) = &decoded.records(ShaderStage::Pixel)[0];
    assert_eq!(*hash, ShaderHash(42));
    assert!(!record.activate);

    let mut bad_keys: Vec<_> = decoded
        .issues
        .iter()
        .filter_map(|issue| issue.key.clone())
        .collect();
    bad_keys.sort();
    assert_eq!(bad_keys, vec![" 42".to_owned(), "042".to_owned()]);
}

#[test]
fn decode_rejects_newer_versions() {
    let err = decode_document(r#"{ "Version": 99, "VertexShaders": {} }"#).unwrap_err();
    assert!(matches!(
        err,
        ProfileError::UnsupportedVersion {
            found: 99,
            supported: 1
        }
    ));
}

#[test]
fn decode_reports_syntax_error_position() {
    let err = decode_document("{\n  \"VertexShaders\": {,\n}").unwrap_err();
    match err {
        ProfileError::Parse { line, .. } => assert_eq!(line, 2),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn decode_rejects_non_object_root() {
    assert!(matches!(
        decode_document("[1, 2, 3]"),
        Err(ProfileError::NotAnObject)
    ));
}

// ---------------------------------------------------------------------------
// Disassembly scan
// ---------------------------------------------------------------------------

#[test]
fn disassembly_symbols_map_to_registers() {
    let source = "\
//   gAmbientColor c1 1
//   gFadeColor    c2 1
//   gMaterialDiffuse c170 1
    vs_3_0
    mul r0, v0, c170
";
    let vs_regs: Vec<u32> = disasm::scan_source(ShaderStage::Vertex, source)
        .into_iter()
        .collect();
    assert_eq!(vs_regs, vec![1, 2, 170]);

    let ps_regs: Vec<u32> = disasm::scan_source(ShaderStage::Pixel, source)
        .into_iter()
        .collect();
    assert_eq!(ps_regs, vec![170]);
}
