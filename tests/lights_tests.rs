//! Light Aggregation Tests
//!
//! Tests for:
//! - per-category slot arrays rebuilt each frame, truncating removed lights
//! - ambient accumulation and intensity scaling
//! - view-space transforms of positions, directions and rect-area extents
//! - layout hash stability and shadow-count participation
//! - cached slot identity across frames

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use glam::{Mat4, Vec3};

use glint::lights::{Camera, Light, LightStateAggregator};

const EPSILON: f32 = 1e-5;

fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

// ============================================================================
// Ambient and layout hash
// ============================================================================

#[test]
fn ambient_sums_intensity_scaled_colors() {
    let mut aggregator = LightStateAggregator::new();
    let lights = [
        Light::new_ambient(Vec3::new(1.0, 0.0, 0.0), 1.0),
        Light::new_ambient(Vec3::new(0.0, 1.0, 0.0), 0.5),
    ];
    let state = aggregator.setup(&lights, false, &Camera::default());
    assert!(approx_vec3(state.ambient, Vec3::new(1.0, 0.5, 0.0)));
}

#[test]
fn hash_encodes_counts_and_shadow_casting() {
    let mut aggregator = LightStateAggregator::new();
    let mut shadowed = Light::new_directional(Vec3::ONE, 1.0);
    shadowed.cast_shadow = true;
    let lights = [
        shadowed,
        Light::new_directional(Vec3::ONE, 1.0),
        Light::new_point(Vec3::ONE, 1.0, 10.0, 2.0),
    ];

    let state = aggregator.setup(&lights, false, &Camera::default());
    assert_eq!(state.hash, "2,1,0,0,0,0");

    let state = aggregator.setup(&lights, true, &Camera::default());
    assert_eq!(state.hash, "2,1,0,0,0,1");
}

#[test]
fn removed_lights_truncate_the_arrays() {
    let mut aggregator = LightStateAggregator::new();
    let lights = vec![
        Light::new_point(Vec3::ONE, 1.0, 10.0, 2.0),
        Light::new_point(Vec3::ONE, 1.0, 20.0, 2.0),
        Light::new_hemisphere(Vec3::ONE, Vec3::ZERO, 1.0),
    ];
    let state = aggregator.setup(&lights, false, &Camera::default());
    assert_eq!(state.counts(), (0, 2, 0, 0, 1));

    let state = aggregator.setup(&lights[..1], false, &Camera::default());
    assert_eq!(state.counts(), (0, 1, 0, 0, 0));
    assert_eq!(state.hash, "0,1,0,0,0,0");
}

// ============================================================================
// View-space transforms
// ============================================================================

#[test]
fn point_position_is_transformed_into_view_space() {
    let mut aggregator = LightStateAggregator::new();
    let light = Light::new_point(Vec3::ONE, 1.0, 0.0, 1.0);
    let camera = Camera::new(Mat4::from_translation(Vec3::new(0.0, 0.0, 10.0)));

    let state = aggregator.setup(&[light], false, &camera);
    assert!(approx_vec3(state.point[0].position, Vec3::new(0.0, 0.0, -10.0)));
}

#[test]
fn directional_direction_follows_the_camera_rotation() {
    let mut aggregator = LightStateAggregator::new();
    // Light looks down its local -Z; identity transform gives (0, 0, -1).
    let light = Light::new_directional(Vec3::ONE, 1.0);
    let camera = Camera::new(Mat4::from_rotation_y(FRAC_PI_2));

    let state = aggregator.setup(&[light], false, &camera);
    assert!(approx_vec3(state.directional[0].direction, Vec3::new(1.0, 0.0, 0.0)));
}

#[test]
fn spot_slot_carries_cone_cosines_and_position() {
    let mut aggregator = LightStateAggregator::new();
    let mut light = Light::new_spot(Vec3::ONE, 2.0, 15.0, 1.0, FRAC_PI_4, 0.0);
    light.world_matrix = Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0));

    let state = aggregator.setup(&[light], false, &Camera::default());
    let slot = &state.spot[0];
    assert!(approx_vec3(slot.position, Vec3::new(0.0, 5.0, 0.0)));
    assert!(approx_vec3(slot.color, Vec3::splat(2.0)));
    assert!((slot.cone_cos - FRAC_PI_4.cos()).abs() < EPSILON);
    // Zero penumbra collapses both cosines.
    assert!((slot.penumbra_cos - slot.cone_cos).abs() < EPSILON);
}

#[test]
fn rect_area_half_vectors_span_the_panel() {
    let mut aggregator = LightStateAggregator::new();
    let light = Light::new_rect_area(Vec3::ONE, 1.0, 4.0, 2.0);

    let state = aggregator.setup(&[light], false, &Camera::default());
    let slot = &state.rect_area[0];
    assert!(approx_vec3(slot.half_width, Vec3::new(2.0, 0.0, 0.0)));
    assert!(approx_vec3(slot.half_height, Vec3::new(0.0, 1.0, 0.0)));
}

#[test]
fn hemisphere_direction_is_normalized_view_space_position() {
    let mut aggregator = LightStateAggregator::new();
    let mut light = Light::new_hemisphere(Vec3::ONE, Vec3::new(0.2, 0.2, 0.2), 2.0);
    light.world_matrix = Mat4::from_translation(Vec3::new(0.0, 7.0, 0.0));

    let state = aggregator.setup(&[light], false, &Camera::default());
    let slot = &state.hemisphere[0];
    assert!(approx_vec3(slot.direction, Vec3::Y));
    assert!(approx_vec3(slot.sky_color, Vec3::splat(2.0)));
    assert!(approx_vec3(slot.ground_color, Vec3::splat(0.4)));
}

// ============================================================================
// Shadows and slot identity
// ============================================================================

#[test]
fn shadow_slot_requires_global_enable_and_cast_flag() {
    let mut aggregator = LightStateAggregator::new();
    let mut light = Light::new_directional(Vec3::ONE, 1.0);
    light.cast_shadow = true;
    light.shadow.bias = 0.001;
    light.shadow.radius = 4.0;

    let state = aggregator.setup(std::slice::from_ref(&light), false, &Camera::default());
    assert!(state.directional[0].shadow.is_none());

    let state = aggregator.setup(std::slice::from_ref(&light), true, &Camera::default());
    let shadow = state.directional[0].shadow.as_ref().unwrap();
    assert!((shadow.bias - 0.001).abs() < EPSILON);
    assert!((shadow.radius - 4.0).abs() < EPSILON);
}

#[test]
fn cached_slots_keep_their_identity_across_frames() {
    let mut aggregator = LightStateAggregator::new();
    let a = Light::new_point(Vec3::ONE, 1.0, 10.0, 2.0);
    let b = Light::new_point(Vec3::ONE, 1.0, 20.0, 2.0);
    let lights = [a.clone(), b.clone()];

    aggregator.setup(&lights, false, &Camera::default());
    let slot_a = aggregator.slot_id(a.id).unwrap();
    let slot_b = aggregator.slot_id(b.id).unwrap();
    assert_ne!(slot_a, slot_b);

    // Reordering the list does not reassign cached slots.
    let reordered = [b.clone(), a.clone()];
    aggregator.setup(&reordered, false, &Camera::default());
    assert_eq!(aggregator.slot_id(a.id), Some(slot_a));
    assert_eq!(aggregator.slot_id(b.id), Some(slot_b));
}

#[test]
fn distinct_lights_get_distinct_ids() {
    let a = Light::new_directional(Vec3::ONE, 1.0);
    let b = Light::new_directional(Vec3::ONE, 1.0);
    assert_ne!(a.id, b.id);
    assert_ne!(a.uuid, b.uuid);
}
