use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::motion::{MotionProfile, MotionProfiles};
use crate::tier::RenderTier;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid viewport XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("root element must be <viewport>, found <{0}>")]
    UnexpectedRoot(String),
    #[error("<{tag}> expects {expected} numbers, got {found:?}")]
    Arity {
        tag: String,
        expected: usize,
        found: String,
    },
    #[error("<{tag}> holds an invalid number {value:?}")]
    Number { tag: String, value: String },
    #[error("<profile> names unknown tier {0:?}")]
    UnknownTier(String),
    #[error("the {0} tier does not animate")]
    StaticTier(RenderTier),
}

/// Perspective camera aimed at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub position: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 5.0),
            fov: 50.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Everything a host needs to mount a viewport.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewportConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_url: Option<String>,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub profiles: MotionProfiles,
}

impl ViewportConfig {
    /// Parses a `<viewport>` document. Missing elements keep their defaults.
    pub fn from_xml(xml: &str) -> Result<Self, ConfigError> {
        let document = Document::parse(xml)?;
        let root = document.root_element();
        if !root.has_tag_name("viewport") {
            return Err(ConfigError::UnexpectedRoot(
                root.tag_name().name().to_string(),
            ));
        }

        let mut config = Self {
            model_url: optional_text(&root, "model"),
            ..Self::default()
        };

        if let Some(camera) = child(&root, "camera") {
            let c = &mut config.camera;
            if let Some([x, y, z]) = parse_floats::<3>(&camera, "position")? {
                c.position = Vec3::new(x, y, z);
            }
            if let Some([fov]) = parse_floats::<1>(&camera, "fov")? {
                c.fov = fov;
            }
            if let Some([near, far]) = parse_floats::<2>(&camera, "clip")? {
                c.near = near;
                c.far = far;
            }
        }

        for node in root.children().filter(|n| n.has_tag_name("profile")) {
            let name = node.attribute("tier").unwrap_or_default();
            let tier =
                RenderTier::from_name(name).ok_or_else(|| ConfigError::UnknownTier(name.into()))?;
            let profile = config
                .profiles
                .for_tier_mut(tier)
                .ok_or(ConfigError::StaticTier(tier))?;
            *profile = parse_profile(&node, *profile)?.sanitized();
        }

        Ok(config)
    }
}

fn parse_profile(node: &Node<'_, '_>, mut profile: MotionProfile) -> Result<MotionProfile, ConfigError> {
    if let Some([kx, ky]) = parse_floats::<2>(node, "rotation-gain")? {
        profile.gain_x = kx;
        profile.gain_y = ky;
    }
    if let Some([alpha]) = parse_floats::<1>(node, "alpha")? {
        profile.alpha = alpha;
    }
    if let Some([spin]) = parse_floats::<1>(node, "idle-spin")? {
        profile.idle_spin = spin;
    }
    if let Some([tumble]) = parse_floats::<1>(node, "tumble")? {
        profile.tumble = tumble;
    }
    if let Some([amplitude, frequency]) = parse_floats::<2>(node, "float")? {
        profile.float_amplitude = amplitude;
        profile.float_frequency = frequency;
    }
    if let Some([base, hover, alpha]) = parse_floats::<3>(node, "scale")? {
        profile.base_scale = base;
        profile.hover_scale = hover;
        profile.scale_alpha = alpha;
    }
    if let Some([base_y]) = parse_floats::<1>(node, "base-y")? {
        profile.base_y = base_y;
    }
    Ok(profile)
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(tag))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

/// Reads exactly `N` whitespace separated floats from `<tag>`.
fn parse_floats<const N: usize>(node: &Node<'_, '_>, tag: &str) -> Result<Option<[f32; N]>, ConfigError> {
    let Some(value) = optional_text(node, tag) else {
        return Ok(None);
    };
    let parts: Vec<&str> = value.split_whitespace().collect();
    if parts.len() != N {
        return Err(ConfigError::Arity {
            tag: tag.to_string(),
            expected: N,
            found: value,
        });
    }
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part.parse::<f32>().map_err(|_| ConfigError::Number {
            tag: tag.to_string(),
            value: part.to_string(),
        })?;
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    <viewport>
        <model>models/spider.obj</model>
        <camera>
            <position>0 3 6</position>
            <fov>45</fov>
        </camera>
        <profile tier="model">
            <rotation-gain>0.4 0.6</rotation-gain>
            <scale>1.5 1.8 0.2</scale>
        </profile>
        <profile tier="flat-fallback">
            <alpha>0.5</alpha>
        </profile>
        <profile tier="loading">
            <idle-spin>0.2</idle-spin>
            <tumble>0.7</tumble>
        </profile>
    </viewport>
    "#;

    #[test]
    fn parse_fills_overrides_and_keeps_defaults() {
        let config = ViewportConfig::from_xml(SAMPLE).unwrap();
        assert_eq!(config.model_url.as_deref(), Some("models/spider.obj"));
        assert_eq!(config.camera.position, Vec3::new(0.0, 3.0, 6.0));
        assert_eq!(config.camera.fov, 45.0);
        assert_eq!(config.camera.far, 1000.0);

        let model = config.profiles.model;
        assert_eq!((model.gain_x, model.gain_y), (0.4, 0.6));
        assert_eq!((model.base_scale, model.hover_scale), (1.5, 1.8));
        assert_eq!(model.alpha, MotionProfile::MODEL.alpha);
        assert_eq!(config.profiles.flat.alpha, 0.5);
        assert_eq!(config.profiles.procedural, MotionProfile::PROCEDURAL);
        assert_eq!((config.profiles.loading.idle_spin, config.profiles.loading.tumble), (0.2, 0.7));
    }

    #[test]
    fn empty_document_is_all_defaults() {
        let config = ViewportConfig::from_xml("<viewport/>").unwrap();
        assert_eq!(config, ViewportConfig::default());
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let bad = r#"<viewport><camera><fov>wide</fov></camera></viewport>"#;
        assert!(matches!(
            ViewportConfig::from_xml(bad),
            Err(ConfigError::Number { .. })
        ));

        let short = r#"<viewport><camera><position>1 2</position></camera></viewport>"#;
        assert!(matches!(
            ViewportConfig::from_xml(short),
            Err(ConfigError::Arity { expected: 3, .. })
        ));
    }

    #[test]
    fn profiles_must_name_an_animated_tier() {
        let unknown = r#"<viewport><profile tier="hologram"/></viewport>"#;
        assert!(matches!(
            ViewportConfig::from_xml(unknown),
            Err(ConfigError::UnknownTier(_))
        ));
        let fixed = r#"<viewport><profile tier="unsupported"/></viewport>"#;
        assert!(matches!(
            ViewportConfig::from_xml(fixed),
            Err(ConfigError::StaticTier(RenderTier::Unsupported))
        ));
    }

    #[test]
    fn out_of_range_alpha_is_clamped() {
        let xml = r#"<viewport><profile tier="procedural-fallback"><alpha>4</alpha></profile></viewport>"#;
        let config = ViewportConfig::from_xml(xml).unwrap();
        assert!(config.profiles.procedural.alpha < 1.0);
    }

    #[test]
    fn wrong_root_is_rejected() {
        assert!(matches!(
            ViewportConfig::from_xml("<scene/>"),
            Err(ConfigError::UnexpectedRoot(name)) if name == "scene"
        ));
    }
}
