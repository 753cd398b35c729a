//! Uniform Tree Tests
//!
//! Tests for:
//! - reflection-name parsing into single / pure-array / structured nodes
//! - typed upload dispatch recorded against the headless driver
//! - sparse structured updates and silent no-ops on absent names
//! - texture unit allocation for samplers
//! - dirty-flag driven `upload` over precomputed index sequences

use glam::{Mat4, Vec2, Vec3};
use rustc_hash::FxHashMap;

use glint::driver::headless::{DriverCall, HeadlessDriver};
use glint::driver::{ActiveUniform, GpuDriver, ProgramHandle, TextureHandle, UniformLocation, gl};
use glint::errors::GlintError;
use glint::uniforms::setter::UniformNode;
use glint::uniforms::value::{UniformEntry, UniformValue};
use glint::uniforms::UniformTree;

fn uniform(name: &str, gl_type: u32, size: usize, location: i32) -> ActiveUniform {
    ActiveUniform {
        name: name.to_string(),
        gl_type,
        size,
        location: UniformLocation(location),
    }
}

fn struct_value(members: &[(&str, UniformValue)]) -> UniformValue {
    let mut map = FxHashMap::default();
    for (key, value) in members {
        map.insert((*key).to_string(), value.clone());
    }
    UniformValue::Struct(map)
}

/// Driver seeded with a typical lit-material reflection table.
fn lit_driver() -> (HeadlessDriver, UniformTree) {
    let _ = env_logger::builder().is_test(true).try_init();
    let driver = HeadlessDriver::new().with_uniforms(vec![
        uniform("opacity", gl::FLOAT, 1, 0),
        uniform("diffuse", gl::FLOAT_VEC3, 1, 1),
        uniform("modelViewMatrix", gl::FLOAT_MAT4, 1, 2),
        uniform("map", gl::SAMPLER_2D, 1, 3),
        uniform("directionalLights[0].direction", gl::FLOAT_VEC3, 1, 4),
        uniform("directionalLights[0].color", gl::FLOAT_VEC3, 1, 5),
        uniform("directionalLights[1].direction", gl::FLOAT_VEC3, 1, 6),
        uniform("directionalLights[1].color", gl::FLOAT_VEC3, 1, 7),
        uniform("spotDirections[0]", gl::FLOAT_VEC3, 2, 8),
        uniform("shadowMaps[0]", gl::SAMPLER_2D, 2, 9),
        uniform("boneMatrices[0]", gl::FLOAT_MAT4, 2, 10),
    ]);
    let tree = UniformTree::from_program(&driver, ProgramHandle(1)).unwrap();
    (driver, tree)
}

// ============================================================================
// Tree construction
// ============================================================================

#[test]
fn reflection_names_build_the_expected_top_level() {
    let (_, tree) = lit_driver();
    let ids: Vec<&str> = tree.nodes().iter().map(UniformNode::id).collect();
    assert_eq!(
        ids,
        [
            "opacity",
            "diffuse",
            "modelViewMatrix",
            "map",
            "directionalLights",
            "spotDirections",
            "shadowMaps",
            "boneMatrices"
        ]
    );
}

#[test]
fn structured_chain_descends_by_index_then_member() {
    let (_, tree) = lit_driver();
    let Some(UniformNode::Structured(lights)) = tree.get("directionalLights") else {
        panic!("directionalLights should be structured");
    };
    assert_eq!(lights.children().len(), 2);
    let Some(UniformNode::Structured(first)) = lights.child("0") else {
        panic!("element 0 should be structured");
    };
    assert!(first.child("direction").is_some());
    assert!(first.child("color").is_some());
}

#[test]
fn pure_array_node_keeps_the_reflected_size() {
    let (_, tree) = lit_driver();
    let Some(UniformNode::PureArray(node)) = tree.get("spotDirections") else {
        panic!("spotDirections should be a pure array");
    };
    assert_eq!(node.size(), 2);
}

#[test]
fn leaf_and_container_path_conflict_fails_reflection() {
    let driver = HeadlessDriver::new().with_uniforms(vec![
        uniform("light", gl::FLOAT, 1, 0),
        uniform("light.color", gl::FLOAT_VEC3, 1, 1),
    ]);
    let err = UniformTree::from_program(&driver, ProgramHandle(1)).unwrap_err();
    assert!(matches!(
        err,
        GlintError::UniformPathConflict { name, segment }
            if name == "light.color" && segment == "light"
    ));
}

#[test]
fn unknown_gl_type_fails_reflection() {
    let driver =
        HeadlessDriver::new().with_uniforms(vec![uniform("weird", 0xDEAD, 1, 0)]);
    let err = UniformTree::from_program(&driver, ProgramHandle(1)).unwrap_err();
    assert!(matches!(
        err,
        GlintError::UnknownUniformType { gl_type: 0xDEAD, .. }
    ));
}

// ============================================================================
// Upload dispatch
// ============================================================================

#[test]
fn scalar_and_vector_uploads_hit_the_typed_entry_points() {
    let (mut driver, mut tree) = lit_driver();

    tree.set_value(&mut driver, "opacity", &UniformValue::Float(0.5));
    tree.set_value(&mut driver, "diffuse", &Vec3::new(1.0, 0.5, 0.25).into());
    tree.set_value(&mut driver, "modelViewMatrix", &Mat4::IDENTITY.into());

    assert_eq!(driver.calls[0], DriverCall::Uniform1f(UniformLocation(0), 0.5));
    assert_eq!(
        driver.calls[1],
        DriverCall::Uniform3fv(UniformLocation(1), vec![1.0, 0.5, 0.25])
    );
    assert_eq!(
        driver.calls[2],
        DriverCall::UniformMatrix4fv(UniformLocation(2), Mat4::IDENTITY.to_cols_array().to_vec())
    );
}

#[test]
fn absent_name_is_a_silent_no_op() {
    let (mut driver, mut tree) = lit_driver();
    tree.set_value(&mut driver, "eliminatedByLinker", &UniformValue::Float(1.0));
    assert!(driver.calls.is_empty());
}

#[test]
fn pure_array_flattens_a_vector_list() {
    let (mut driver, mut tree) = lit_driver();
    let list = UniformValue::List(vec![
        Vec3::new(1.0, 2.0, 3.0).into(),
        Vec3::new(4.0, 5.0, 6.0).into(),
    ]);
    tree.set_value(&mut driver, "spotDirections", &list);
    assert_eq!(
        driver.calls[0],
        DriverCall::Uniform3fv(UniformLocation(8), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
    );
}

#[test]
fn pure_array_flattens_a_matrix_list() {
    let (mut driver, mut tree) = lit_driver();
    let second = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    let list = UniformValue::List(vec![Mat4::IDENTITY.into(), second.into()]);
    tree.set_value(&mut driver, "boneMatrices", &list);

    let mut expected = Mat4::IDENTITY.to_cols_array().to_vec();
    expected.extend_from_slice(&second.to_cols_array());
    assert_eq!(
        driver.calls,
        vec![DriverCall::UniformMatrix4fv(UniformLocation(10), expected)]
    );
}

#[test]
fn texture_array_allocates_one_unit_per_element() {
    let (mut driver, mut tree) = lit_driver();
    let value = UniformValue::TextureArray(vec![Some(TextureHandle(7)), None]);
    tree.set_value(&mut driver, "shadowMaps", &value);

    assert_eq!(
        driver.calls,
        vec![
            DriverCall::Uniform1iv(UniformLocation(9), vec![0, 1]),
            DriverCall::BindTexture2d(0, Some(TextureHandle(7))),
            DriverCall::BindTexture2d(1, None),
        ]
    );
}

#[test]
fn structured_update_is_sparse() {
    let (mut driver, mut tree) = lit_driver();
    // Only element 1, and only its color, is supplied.
    let value = UniformValue::List(vec![
        struct_value(&[]),
        struct_value(&[("color", Vec3::ONE.into())]),
    ]);
    tree.set_value(&mut driver, "directionalLights", &value);
    assert_eq!(
        driver.calls,
        vec![DriverCall::Uniform3fv(UniformLocation(7), vec![1.0, 1.0, 1.0])]
    );
}

#[test]
fn mismatched_value_shape_is_skipped() {
    let (mut driver, mut tree) = lit_driver();
    tree.set_value(&mut driver, "opacity", &Vec2::new(1.0, 2.0).into());
    assert!(driver.calls.is_empty());
}

#[test]
fn sampler_allocates_a_unit_and_binds() {
    let (mut driver, mut tree) = lit_driver();
    let texture = TextureHandle(42);
    tree.set_value(&mut driver, "map", &UniformValue::Texture(Some(texture)));
    assert_eq!(
        driver.calls,
        vec![
            DriverCall::Uniform1i(UniformLocation(3), 0),
            DriverCall::BindTexture2d(0, Some(texture)),
        ]
    );

    // A missing texture binds the driver's default.
    driver.clear_calls();
    driver.reset_texture_units();
    tree.set_value(&mut driver, "map", &UniformValue::Texture(None));
    assert_eq!(
        driver.calls,
        vec![
            DriverCall::Uniform1i(UniformLocation(3), 0),
            DriverCall::BindTexture2d(0, None),
        ]
    );
}

// ============================================================================
// Sequenced upload
// ============================================================================

#[test]
fn seq_with_value_filters_to_backed_uniforms() {
    let (_, tree) = lit_driver();
    let mut values = FxHashMap::default();
    values.insert("opacity".to_string(), UniformEntry::new(1.0_f32));
    values.insert("diffuse".to_string(), UniformEntry::new(Vec3::ONE));

    let seq = tree.seq_with_value(&values);
    assert_eq!(seq, vec![0, 1]);
}

#[test]
fn set_optional_uploads_only_backed_names() {
    let (mut driver, mut tree) = lit_driver();
    let mut values = FxHashMap::default();
    values.insert("opacity".to_string(), UniformEntry::new(0.75_f32));

    tree.set_optional(&mut driver, &values, "diffuse");
    assert!(driver.calls.is_empty());

    tree.set_optional(&mut driver, &values, "opacity");
    assert_eq!(
        driver.calls,
        vec![DriverCall::Uniform1f(UniformLocation(0), 0.75)]
    );
}

#[test]
fn upload_skips_clean_entries() {
    let (mut driver, mut tree) = lit_driver();
    let mut values = FxHashMap::default();
    values.insert("opacity".to_string(), UniformEntry::clean(0.25_f32));
    values.insert("diffuse".to_string(), UniformEntry::new(Vec3::ONE));

    let seq = tree.seq_with_value(&values);
    tree.upload(&mut driver, &seq, &values);

    assert_eq!(
        driver.calls,
        vec![DriverCall::Uniform3fv(UniformLocation(1), vec![1.0, 1.0, 1.0])]
    );

    // Flipping the flag re-sends the value on the next pass.
    driver.clear_calls();
    values.get_mut("opacity").unwrap().needs_update = Some(true);
    tree.upload(&mut driver, &seq, &values);
    assert_eq!(
        driver.calls,
        vec![
            DriverCall::Uniform1f(UniformLocation(0), 0.25),
            DriverCall::Uniform3fv(UniformLocation(1), vec![1.0, 1.0, 1.0]),
        ]
    );
}
