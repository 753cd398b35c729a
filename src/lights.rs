//! Lights
//!
//! Scene-side light descriptions plus [`LightStateAggregator`], which folds
//! the visible lights of a frame into the flat, view-space slot arrays the
//! shader uniforms consume. Slot structs are cached per light id so repeated
//! frames rewrite the same allocations instead of churning.

use std::hash::{Hash, Hasher};

use glam::{Mat4, Vec2, Vec3};
use rustc_hash::FxHashMap;
use uuid::Uuid;

/// Camera pose needed for view-space light transforms.
#[derive(Debug, Clone)]
pub struct Camera {
    pub world_matrix: Mat4,
}

impl Camera {
    #[must_use]
    pub fn new(world_matrix: Mat4) -> Self {
        Self { world_matrix }
    }

    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        self.world_matrix.inverse()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            world_matrix: Mat4::IDENTITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightShadow {
    pub bias: f32,
    pub normal_bias: f32,
    pub radius: f32,
    pub map_size: Vec2,
    pub camera_near: f32,
    pub camera_far: f32,
}

impl Default for LightShadow {
    fn default() -> Self {
        Self {
            bias: 0.0,
            normal_bias: 0.0,
            radius: 1.0,
            map_size: Vec2::new(512.0, 512.0),
            camera_near: 0.5,
            camera_far: 500.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LightKind {
    Ambient,
    Directional,
    Point {
        distance: f32,
        decay: f32,
    },
    Spot {
        distance: f32,
        decay: f32,
        /// Half-angle of the cone, radians.
        angle: f32,
        /// 0.0 = hard edge, 1.0 = fully feathered.
        penumbra: f32,
    },
    RectArea {
        width: f32,
        height: f32,
    },
    Hemisphere {
        ground_color: Vec3,
    },
}

#[derive(Debug, Clone)]
pub struct Light {
    pub uuid: Uuid,
    pub id: u64,
    pub color: Vec3,
    pub intensity: f32,
    pub world_matrix: Mat4,
    pub kind: LightKind,
    pub cast_shadow: bool,
    pub shadow: LightShadow,
}

impl Light {
    fn generate_id_from_uuid(uuid: &Uuid) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        uuid.hash(&mut hasher);
        hasher.finish()
    }

    #[must_use]
    pub fn new(color: Vec3, intensity: f32, kind: LightKind) -> Self {
        let uuid = Uuid::new_v4();
        Self {
            uuid,
            id: Self::generate_id_from_uuid(&uuid),
            color,
            intensity,
            world_matrix: Mat4::IDENTITY,
            kind,
            cast_shadow: false,
            shadow: LightShadow::default(),
        }
    }

    #[must_use]
    pub fn new_ambient(color: Vec3, intensity: f32) -> Self {
        Self::new(color, intensity, LightKind::Ambient)
    }

    #[must_use]
    pub fn new_directional(color: Vec3, intensity: f32) -> Self {
        Self::new(color, intensity, LightKind::Directional)
    }

    #[must_use]
    pub fn new_point(color: Vec3, intensity: f32, distance: f32, decay: f32) -> Self {
        Self::new(color, intensity, LightKind::Point { distance, decay })
    }

    #[must_use]
    pub fn new_spot(
        color: Vec3,
        intensity: f32,
        distance: f32,
        decay: f32,
        angle: f32,
        penumbra: f32,
    ) -> Self {
        Self::new(
            color,
            intensity,
            LightKind::Spot {
                distance,
                decay,
                angle,
                penumbra,
            },
        )
    }

    #[must_use]
    pub fn new_rect_area(color: Vec3, intensity: f32, width: f32, height: f32) -> Self {
        Self::new(color, intensity, LightKind::RectArea { width, height })
    }

    #[must_use]
    pub fn new_hemisphere(sky_color: Vec3, ground_color: Vec3, intensity: f32) -> Self {
        Self::new(sky_color, intensity, LightKind::Hemisphere { ground_color })
    }

    #[must_use]
    pub fn world_position(&self) -> Vec3 {
        self.world_matrix.w_axis.truncate()
    }

    /// Forward axis of the light, pointing down its local -Z like a camera.
    #[must_use]
    pub fn world_direction(&self) -> Vec3 {
        -self.world_matrix.z_axis.truncate().normalize_or_zero()
    }
}

// ─── Shader-facing slots ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShadowSlot {
    pub bias: f32,
    pub normal_bias: f32,
    pub radius: f32,
    pub map_size: Vec2,
    /// Shadow camera range; consumed by the point-light depth packing.
    pub camera_near: f32,
    pub camera_far: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DirectionalLightSlot {
    pub direction: Vec3,
    pub color: Vec3,
    pub shadow: Option<ShadowSlot>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointLightSlot {
    pub position: Vec3,
    pub color: Vec3,
    pub distance: f32,
    pub decay: f32,
    pub shadow: Option<ShadowSlot>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpotLightSlot {
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    pub distance: f32,
    pub decay: f32,
    pub cone_cos: f32,
    pub penumbra_cos: f32,
    pub shadow: Option<ShadowSlot>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RectAreaLightSlot {
    pub position: Vec3,
    pub color: Vec3,
    pub half_width: Vec3,
    pub half_height: Vec3,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HemisphereLightSlot {
    pub direction: Vec3,
    pub sky_color: Vec3,
    pub ground_color: Vec3,
}

/// Flat per-frame light arrays, ready for the uniform layer.
#[derive(Debug, Default)]
pub struct LightFrameState {
    pub ambient: Vec3,
    pub directional: Vec<DirectionalLightSlot>,
    pub point: Vec<PointLightSlot>,
    pub spot: Vec<SpotLightSlot>,
    pub rect_area: Vec<RectAreaLightSlot>,
    pub hemisphere: Vec<HemisphereLightSlot>,
    /// `"directional,point,spot,rectArea,hemi,shadows"`, rebuilt only when a
    /// count changes. Distinct hashes force distinct program variants.
    pub hash: String,
}

impl LightFrameState {
    #[must_use]
    pub fn counts(&self) -> (usize, usize, usize, usize, usize) {
        (
            self.directional.len(),
            self.point.len(),
            self.spot.len(),
            self.rect_area.len(),
            self.hemisphere.len(),
        )
    }
}

#[derive(Debug)]
struct CachedSlot {
    slot_id: u64,
}

/// Folds the frame's light list into [`LightFrameState`].
#[derive(Debug, Default)]
pub struct LightStateAggregator {
    cache: FxHashMap<u64, CachedSlot>,
    next_slot_id: u64,
    state: LightFrameState,
    prev_counts: Option<(usize, usize, usize, usize, usize, usize)>,
}

impl LightStateAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &LightFrameState {
        &self.state
    }

    /// Stable identity of the cached slot backing `light_id`, if any.
    #[must_use]
    pub fn slot_id(&self, light_id: u64) -> Option<u64> {
        self.cache.get(&light_id).map(|cached| cached.slot_id)
    }

    fn slot_for(&mut self, light_id: u64) -> u64 {
        let next = &mut self.next_slot_id;
        self.cache
            .entry(light_id)
            .or_insert_with(|| {
                let slot_id = *next;
                *next += 1;
                CachedSlot { slot_id }
            })
            .slot_id
    }

    fn shadow_slot(light: &Light, shadows_enabled: bool) -> Option<ShadowSlot> {
        if !(shadows_enabled && light.cast_shadow) {
            return None;
        }
        Some(ShadowSlot {
            bias: light.shadow.bias,
            normal_bias: light.shadow.normal_bias,
            radius: light.shadow.radius,
            map_size: light.shadow.map_size,
            camera_near: light.shadow.camera_near,
            camera_far: light.shadow.camera_far,
        })
    }

    /// Rebuild the frame state from `lights` as seen from `camera`.
    ///
    /// Directions and positions come out in view space. Arrays are truncated
    /// and repopulated each call, so a light removed from the list simply
    /// stops appearing.
    pub fn setup(
        &mut self,
        lights: &[Light],
        shadows_enabled: bool,
        camera: &Camera,
    ) -> &LightFrameState {
        let view = camera.view_matrix();
        let view_rotation = glam::Mat3::from_mat4(view);

        self.state.ambient = Vec3::ZERO;
        self.state.directional.clear();
        self.state.point.clear();
        self.state.spot.clear();
        self.state.rect_area.clear();
        self.state.hemisphere.clear();

        let mut shadow_count = 0usize;

        for light in lights {
            let color = light.color * light.intensity;
            match &light.kind {
                LightKind::Ambient => {
                    self.state.ambient += color;
                }
                LightKind::Directional => {
                    self.slot_for(light.id);
                    let shadow = Self::shadow_slot(light, shadows_enabled);
                    shadow_count += usize::from(shadow.is_some());
                    self.state.directional.push(DirectionalLightSlot {
                        direction: (view_rotation * light.world_direction()).normalize_or_zero(),
                        color,
                        shadow,
                    });
                }
                LightKind::Point { distance, decay } => {
                    self.slot_for(light.id);
                    let shadow = Self::shadow_slot(light, shadows_enabled);
                    shadow_count += usize::from(shadow.is_some());
                    self.state.point.push(PointLightSlot {
                        position: view.transform_point3(light.world_position()),
                        color,
                        distance: *distance,
                        decay: *decay,
                        shadow,
                    });
                }
                LightKind::Spot {
                    distance,
                    decay,
                    angle,
                    penumbra,
                } => {
                    self.slot_for(light.id);
                    let shadow = Self::shadow_slot(light, shadows_enabled);
                    shadow_count += usize::from(shadow.is_some());
                    self.state.spot.push(SpotLightSlot {
                        position: view.transform_point3(light.world_position()),
                        direction: (view_rotation * light.world_direction()).normalize_or_zero(),
                        color,
                        distance: *distance,
                        decay: *decay,
                        cone_cos: angle.cos(),
                        penumbra_cos: (angle * (1.0 - penumbra)).cos(),
                        shadow,
                    });
                }
                LightKind::RectArea { width, height } => {
                    self.slot_for(light.id);
                    let rotation = view_rotation * glam::Mat3::from_mat4(light.world_matrix);
                    self.state.rect_area.push(RectAreaLightSlot {
                        position: view.transform_point3(light.world_position()),
                        color,
                        half_width: rotation * Vec3::new(0.5 * width, 0.0, 0.0),
                        half_height: rotation * Vec3::new(0.0, 0.5 * height, 0.0),
                    });
                }
                LightKind::Hemisphere { ground_color } => {
                    self.slot_for(light.id);
                    self.state.hemisphere.push(HemisphereLightSlot {
                        direction: (view_rotation * light.world_position()).normalize_or_zero(),
                        sky_color: color,
                        ground_color: *ground_color * light.intensity,
                    });
                }
            }
        }

        let counts = self.state.counts();
        let key = (
            counts.0,
            counts.1,
            counts.2,
            counts.3,
            counts.4,
            shadow_count,
        );
        if self.prev_counts != Some(key) {
            self.state.hash = format!(
                "{},{},{},{},{},{}",
                counts.0, counts.1, counts.2, counts.3, counts.4, shadow_count
            );
            self.prev_counts = Some(key);
            log::trace!("light layout changed: {}", self.state.hash);
        }

        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambient_accumulates_scaled_colors() {
        let mut aggregator = LightStateAggregator::new();
        let lights = [
            Light::new_ambient(Vec3::new(1.0, 0.0, 0.0), 1.0),
            Light::new_ambient(Vec3::new(0.0, 1.0, 0.0), 1.0),
        ];
        let state = aggregator.setup(&lights, false, &Camera::default());
        assert_eq!(state.ambient, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(state.hash, "0,0,0,0,0,0");
    }

    #[test]
    fn spot_cone_cosines() {
        let mut aggregator = LightStateAggregator::new();
        let lights = [Light::new_spot(
            Vec3::ONE,
            1.0,
            10.0,
            2.0,
            std::f32::consts::FRAC_PI_4,
            0.5,
        )];
        let state = aggregator.setup(&lights, false, &Camera::default());
        let slot = &state.spot[0];
        assert!((slot.cone_cos - std::f32::consts::FRAC_PI_4.cos()).abs() < 1e-6);
        assert!(
            (slot.penumbra_cos - (std::f32::consts::FRAC_PI_4 * 0.5).cos()).abs() < 1e-6
        );
        assert!(slot.penumbra_cos > slot.cone_cos);
    }
}
