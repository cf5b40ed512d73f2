//! Fixed studio surroundings handed to the renderer: backdrop, ground plane,
//! light rig and orbit camera limits. Nothing here changes after startup.

use std::f32::consts::PI;

/// Spot light data - matches what the renderer consumes
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpotLightData {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: [f32; 3],
    pub angle: f32,
    pub penumbra: f32,
    pub decay: f32,
    pub distance: f32,
    pub cast_shadow: bool,
}

/// Rectangular area light aimed at `target`
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AreaLightData {
    pub color: [f32; 3],
    pub intensity: f32,
    pub width: f32,
    pub height: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GroundData {
    pub size: [f32; 2],
    pub height: f32,
    pub color: [f32; 3],
    pub roughness: f32,
    pub metalness: f32,
    pub emissive: [f32; 3],
    pub receive_shadow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrbitLimits {
    pub damping: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub max_polar_angle: f32,
    pub enable_pan: bool,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraData {
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub orbit: OrbitLimits,
    /// Replaces `orbit` on touch devices.
    pub touch_orbit: OrbitLimits,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Stage {
    pub background: [f32; 3],
    pub ground: GroundData,
    pub spot_lights: Vec<SpotLightData>,
    pub area_light: Option<AreaLightData>,
    pub camera: CameraData,
}

impl Stage {
    /// Soft five-spot showroom rig with no shadow casters.
    pub fn studio() -> Self {
        let spot = |intensity: f32, position: [f32; 3], angle: f32, penumbra: f32| SpotLightData {
            color: [1.0, 1.0, 1.0],
            intensity,
            position,
            angle,
            penumbra,
            decay: 2.0,
            distance: 50.0,
            cast_shadow: false,
        };

        Self {
            background: rgb(0xcccccc),
            ground: GroundData {
                size: [100.0, 100.0],
                height: -1.0,
                color: rgb(0xffffff),
                roughness: 0.5,
                metalness: 0.1,
                emissive: rgb(0x222222),
                receive_shadow: true,
            },
            spot_lights: vec![
                spot(0.8, [10.0, 20.0, 10.0], PI / 4.0, 3.0),
                spot(3.0, [0.0, 10.0, 20.0], PI, 1.5),
                spot(2.3, [0.0, 10.0, -20.0], PI / 3.5, 1.5),
                spot(2.6, [-20.0, 10.0, 0.0], PI, 1.5),
                spot(2.6, [20.0, 10.0, 0.0], PI, 1.5),
            ],
            area_light: Some(AreaLightData {
                color: [1.0, 1.0, 1.0],
                intensity: 0.2,
                width: 20.0,
                height: 20.0,
                position: [0.0, 15.0, 20.0],
                target: [0.0, 0.0, 0.0],
            }),
            camera: CameraData {
                fov_deg: 60.0,
                near: 0.1,
                far: 1000.0,
                position: [0.0, 15.0, 25.0],
                orbit: OrbitLimits {
                    damping: 0.25,
                    min_distance: 8.0,
                    max_distance: 60.0,
                    max_polar_angle: PI / 1.8,
                    enable_pan: true,
                },
                touch_orbit: OrbitLimits {
                    damping: 0.25,
                    min_distance: 10.0,
                    max_distance: 50.0,
                    max_polar_angle: PI / 2.0,
                    enable_pan: false,
                },
            },
        }
    }

    pub fn orbit_limits(&self, touch: bool) -> OrbitLimits {
        if touch {
            self.camera.touch_orbit
        } else {
            self.camera.orbit
        }
    }
}

/// Unpack a 0xRRGGBB literal into linear 0..1 channels.
pub fn rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::{rgb, Stage};

    #[test]
    fn rgb_unpacks_channels() {
        assert_eq!(rgb(0xffffff), [1.0, 1.0, 1.0]);
        assert_eq!(rgb(0x000000), [0.0, 0.0, 0.0]);
        let grey = rgb(0xcccccc);
        assert!((grey[0] - 0.8).abs() < 1e-6);
        assert_eq!(grey[0], grey[2]);
    }

    #[test]
    fn studio_rig_casts_no_shadows() {
        let stage = Stage::studio();
        assert_eq!(stage.spot_lights.len(), 5);
        assert!(stage.spot_lights.iter().all(|light| !light.cast_shadow));
        assert!(stage.ground.receive_shadow);
    }

    #[test]
    fn touch_orbit_is_tighter() {
        let stage = Stage::studio();
        let desk = stage.orbit_limits(false);
        let touch = stage.orbit_limits(true);
        assert!(touch.min_distance > desk.min_distance);
        assert!(touch.max_distance < desk.max_distance);
        assert!(!touch.enable_pan);
    }
}
