//! Named schema presets.
//!
//! Each preset is a [`SchemaPatch`] applied over the schema defaults, so a
//! preset can also be used mid-session as the target of a morph.

use crate::color::{ColorGradient, Rgb};
use crate::curve::ResponseCurve;
use crate::error::StarfieldError;
use crate::noise_field::NoiseField;
use crate::schema::{SchemaPatch, TextureHandle};

const NAMES: &[&str] = &["default", "stars", "clouds"];

/// All preset names, in display order.
pub fn list_names() -> &'static [&'static str] {
    NAMES
}

/// Looks up a preset by name.
pub fn from_name(name: &str) -> Result<SchemaPatch, StarfieldError> {
    match name {
        "default" => Ok(SchemaPatch::default()),
        "stars" => Ok(stars()),
        "clouds" => Ok(clouds()),
        other => Err(StarfieldError::UnknownPreset(other.to_string())),
    }
}

/// Sharp white stars; the faintest few percent are hidden.
pub fn stars() -> SchemaPatch {
    SchemaPatch::default()
        .with_texture_set(vec![TextureHandle(0)])
        .with_alpha_range(0.2, 1.0)
        .with_scale_range(0.25, 0.8)
        .with_rotation(false)
        .with_response_curve(bright_curve())
        .with_visibility_threshold(0.05)
        .with_field(*NoiseField::starfield().config())
}

/// Dim, slowly rotating purple haze that only shows in the field's brighter
/// regions.
pub fn clouds() -> SchemaPatch {
    let gradient = ColorGradient::new(
        Rgb::from_hex("#a426bf").expect("clouds gradient hex is valid"),
        Rgb::from_hex("#bb3bd8").expect("clouds gradient hex is valid"),
    );
    SchemaPatch::default()
        .with_texture_set(vec![TextureHandle(1), TextureHandle(2)])
        .with_alpha_range(0.18, 0.34)
        .with_scale_range(0.3, 0.8)
        .with_color_gradient(gradient)
        .with_rotation(true)
        .with_response_curve(bright_curve())
        .with_visibility_threshold(0.4)
}

fn bright_curve() -> ResponseCurve {
    ResponseCurve::new(0.75, 0.1, 0.85, 1.0).expect("preset curve control points are valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttributeSchema;

    #[test]
    fn every_listed_name_resolves() {
        for name in list_names() {
            assert!(from_name(name).is_ok(), "{name} did not resolve");
        }
    }

    #[test]
    fn every_preset_builds_a_valid_schema() {
        for name in list_names() {
            let patch = from_name(name).unwrap();
            assert!(AttributeSchema::new(&patch).is_ok(), "{name} is invalid");
        }
    }

    #[test]
    fn unknown_name_is_an_error() {
        match from_name("nebula") {
            Err(StarfieldError::UnknownPreset(n)) => assert_eq!(n, "nebula"),
            other => panic!("expected UnknownPreset, got {other:?}"),
        }
    }

    #[test]
    fn clouds_are_tinted_and_stars_are_not() {
        assert!(clouds().color_gradient.is_some());
        assert!(stars().color_gradient.is_none());
    }

    #[test]
    fn clouds_use_two_textures() {
        assert_eq!(clouds().texture_set.map(|t| t.len()), Some(2));
    }
}
