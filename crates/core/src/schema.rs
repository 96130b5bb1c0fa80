//! Attribute schema: the live, morph-capable parameter set shared by particles.
//!
//! A schema holds at most two complete [`SchemaSnapshot`]s: the one being read
//! and, while a morph runs, the one it is heading toward. Applying a
//! [`SchemaPatch`] merges it over the newest snapshot and starts a morph: for
//! the next `morph_duration` reads, [`AttributeSchema::get`] blends the origin
//! toward the target. Every read during a morph advances one shared counter,
//! so morph speed follows read volume rather than wall-clock time. A patch
//! applied mid-morph freezes the blend at its current progress as the new
//! origin and restarts the counter toward the new target.

use crate::color::{lerp, ColorGradient};
use crate::curve::ResponseCurve;
use crate::error::StarfieldError;
use crate::noise_field::{NoiseConfig, NoiseField};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Number of reads a morph lasts unless configured otherwise.
pub const DEFAULT_MORPH_DURATION: u32 = 500;

/// Opaque texture identifier supplied by the host renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextureHandle(pub u32);

/// Closed `[min, max]` interval used for alpha and scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const ALPHA_DEFAULT: Range = Range { min: 0.0, max: 1.0 };
    pub const SCALE_DEFAULT: Range = Range { min: 0.2, max: 1.0 };

    /// Unvalidated; bounds are checked when a patch is merged.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Point at `t` between the bounds.
    pub fn at(&self, t: f64) -> f64 {
        lerp(t, self.min, self.max)
    }

    /// Moves both bounds toward `other`.
    pub fn lerp(&self, other: &Range, t: f64) -> Range {
        Range {
            min: lerp(t, self.min, other.min),
            max: lerp(t, self.max, other.max),
        }
    }

    fn check(&self, name: &str, lo: f64, hi: f64) -> Result<(), StarfieldError> {
        let ok = self.min.is_finite()
            && self.max.is_finite()
            && self.min <= self.max
            && self.min >= lo
            && self.max <= hi;
        if ok {
            Ok(())
        } else {
            Err(StarfieldError::InvalidSchema(format!(
                "{name}: expected {lo} <= min <= max <= {hi}, got {{min: {}, max: {}}}",
                self.min, self.max
            )))
        }
    }
}

/// The recognised schema keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKey {
    TextureSet,
    AlphaRange,
    ScaleRange,
    ColorGradient,
    RotationEnabled,
    VisibilityThreshold,
    ResponseCurve,
    Field,
}

impl SchemaKey {
    pub const ALL: [SchemaKey; 8] = [
        SchemaKey::TextureSet,
        SchemaKey::AlphaRange,
        SchemaKey::ScaleRange,
        SchemaKey::ColorGradient,
        SchemaKey::RotationEnabled,
        SchemaKey::VisibilityThreshold,
        SchemaKey::ResponseCurve,
        SchemaKey::Field,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SchemaKey::TextureSet => "texture-set",
            SchemaKey::AlphaRange => "alpha-range",
            SchemaKey::ScaleRange => "scale-range",
            SchemaKey::ColorGradient => "color-gradient",
            SchemaKey::RotationEnabled => "rotation-enabled",
            SchemaKey::VisibilityThreshold => "visibility-threshold",
            SchemaKey::ResponseCurve => "response-curve",
            SchemaKey::Field => "field",
        }
    }
}

impl fmt::Display for SchemaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaKey {
    type Err = StarfieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SchemaKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| StarfieldError::InvalidSchema(format!("unknown key: {s}")))
    }
}

/// The effective value of one key.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaValue {
    TextureSet(Arc<[TextureHandle]>),
    AlphaRange(Range),
    ScaleRange(Range),
    ColorGradient(ColorGradient),
    RotationEnabled(bool),
    VisibilityThreshold(f64),
    ResponseCurve(ResponseCurve),
    Field(Arc<NoiseField>),
}

impl SchemaValue {
    pub fn key(&self) -> SchemaKey {
        match self {
            SchemaValue::TextureSet(_) => SchemaKey::TextureSet,
            SchemaValue::AlphaRange(_) => SchemaKey::AlphaRange,
            SchemaValue::ScaleRange(_) => SchemaKey::ScaleRange,
            SchemaValue::ColorGradient(_) => SchemaKey::ColorGradient,
            SchemaValue::RotationEnabled(_) => SchemaKey::RotationEnabled,
            SchemaValue::VisibilityThreshold(_) => SchemaKey::VisibilityThreshold,
            SchemaValue::ResponseCurve(_) => SchemaKey::ResponseCurve,
            SchemaValue::Field(_) => SchemaKey::Field,
        }
    }

    /// Same value without recomputation: pointer identity for shared values,
    /// equality for plain ones.
    fn is_same(&self, other: &SchemaValue) -> bool {
        match (self, other) {
            (SchemaValue::TextureSet(a), SchemaValue::TextureSet(b)) => Arc::ptr_eq(a, b),
            (SchemaValue::Field(a), SchemaValue::Field(b)) => Arc::ptr_eq(a, b),
            (a, b) => a == b,
        }
    }

    /// Blends `self` (older) toward `target` (newer) at `progress` in [0, 1].
    ///
    /// Ranges and gradients interpolate; every other key steps straight to
    /// the target.
    fn interpolate(&self, target: &SchemaValue, progress: f64) -> SchemaValue {
        if self.is_same(target) {
            return target.clone();
        }
        match (self, target) {
            (SchemaValue::AlphaRange(a), SchemaValue::AlphaRange(b)) => {
                SchemaValue::AlphaRange(a.lerp(b, progress))
            }
            (SchemaValue::ScaleRange(a), SchemaValue::ScaleRange(b)) => {
                SchemaValue::ScaleRange(a.lerp(b, progress))
            }
            (SchemaValue::ColorGradient(a), SchemaValue::ColorGradient(b)) => {
                SchemaValue::ColorGradient(a.lerp(b, progress))
            }
            (_, target) => target.clone(),
        }
    }
}

/// One complete, immutable parameter set.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaSnapshot {
    texture_set: Arc<[TextureHandle]>,
    alpha_range: Range,
    scale_range: Range,
    color_gradient: Option<ColorGradient>,
    rotation_enabled: bool,
    visibility_threshold: Option<f64>,
    response_curve: ResponseCurve,
    field: Arc<NoiseField>,
}

impl Default for SchemaSnapshot {
    fn default() -> Self {
        Self {
            texture_set: Arc::from([TextureHandle(0)]),
            alpha_range: Range::ALPHA_DEFAULT,
            scale_range: Range::SCALE_DEFAULT,
            color_gradient: None,
            rotation_enabled: false,
            visibility_threshold: None,
            response_curve: ResponseCurve::default(),
            field: Arc::new(NoiseField::default()),
        }
    }
}

impl SchemaSnapshot {
    /// The value stored for `key`, or `None` for an unset optional key.
    pub fn value(&self, key: SchemaKey) -> Option<SchemaValue> {
        match key {
            SchemaKey::TextureSet => Some(SchemaValue::TextureSet(Arc::clone(&self.texture_set))),
            SchemaKey::AlphaRange => Some(SchemaValue::AlphaRange(self.alpha_range)),
            SchemaKey::ScaleRange => Some(SchemaValue::ScaleRange(self.scale_range)),
            SchemaKey::ColorGradient => self.color_gradient.map(SchemaValue::ColorGradient),
            SchemaKey::RotationEnabled => Some(SchemaValue::RotationEnabled(self.rotation_enabled)),
            SchemaKey::VisibilityThreshold => {
                self.visibility_threshold.map(SchemaValue::VisibilityThreshold)
            }
            SchemaKey::ResponseCurve => Some(SchemaValue::ResponseCurve(self.response_curve)),
            SchemaKey::Field => Some(SchemaValue::Field(Arc::clone(&self.field))),
        }
    }

    /// Textures particles pick from. Never empty.
    pub fn texture_set(&self) -> &[TextureHandle] {
        &self.texture_set
    }

    /// Opacity bounds, within [0, 1].
    pub fn alpha_range(&self) -> Range {
        self.alpha_range
    }

    /// Scale bounds; `min` is strictly positive and `max` fits in an `f32`.
    pub fn scale_range(&self) -> Range {
        self.scale_range
    }

    /// Tint gradient, or `None` for untinted particles.
    pub fn color_gradient(&self) -> Option<ColorGradient> {
        self.color_gradient
    }

    pub fn rotation_enabled(&self) -> bool {
        self.rotation_enabled
    }

    /// Minimum shaped temperature for a visible particle; `None` shows all.
    pub fn visibility_threshold(&self) -> Option<f64> {
        self.visibility_threshold
    }

    /// Curve applied to raw noise samples.
    pub fn response_curve(&self) -> ResponseCurve {
        self.response_curve
    }

    /// Shared noise source; unchanged across merges that leave it unset.
    pub fn field(&self) -> &Arc<NoiseField> {
        &self.field
    }

    /// The snapshot [`AttributeSchema::get`] would report at `progress` of a
    /// morph from `self` to `target`.
    fn blend(&self, target: &SchemaSnapshot, progress: f64) -> SchemaSnapshot {
        SchemaSnapshot {
            alpha_range: self.alpha_range.lerp(&target.alpha_range, progress),
            scale_range: self.scale_range.lerp(&target.scale_range, progress),
            color_gradient: match (self.color_gradient, target.color_gradient) {
                (Some(from), Some(to)) => Some(from.lerp(&to, progress)),
                (_, to) => to,
            },
            ..target.clone()
        }
    }

    /// Produces a new snapshot with `patch` merged over `self`.
    ///
    /// Keys the patch leaves unset keep their current value, including the
    /// same shared reference for textures and the noise field.
    pub fn merge(&self, patch: &SchemaPatch) -> Result<SchemaSnapshot, StarfieldError> {
        let mut next = self.clone();
        if let Some(textures) = &patch.texture_set {
            if textures.is_empty() {
                return Err(StarfieldError::InvalidSchema(
                    "texture-set: at least one texture is required".into(),
                ));
            }
            if textures[..] != self.texture_set[..] {
                next.texture_set = Arc::from(textures.as_slice());
            }
        }
        if let Some(alpha) = patch.alpha_range {
            alpha.check("alpha-range", 0.0, 1.0)?;
            next.alpha_range = alpha;
        }
        if let Some(scale) = patch.scale_range {
            scale.check("scale-range", 0.0, f32::MAX as f64)?;
            if scale.min <= 0.0 {
                return Err(StarfieldError::InvalidSchema(format!(
                    "scale-range: min must be positive, got {}",
                    scale.min
                )));
            }
            next.scale_range = scale;
        }
        if let Some(gradient) = patch.color_gradient {
            next.color_gradient = Some(gradient);
        }
        if let Some(rotation) = patch.rotation_enabled {
            next.rotation_enabled = rotation;
        }
        if let Some(threshold) = patch.visibility_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(StarfieldError::InvalidSchema(format!(
                    "visibility-threshold: expected a value in [0, 1], got {threshold}"
                )));
            }
            next.visibility_threshold = Some(threshold);
        }
        if let Some(curve) = patch.response_curve {
            next.response_curve = curve;
        }
        if let Some(config) = patch.field {
            if config != *self.field.config() {
                next.field = Arc::new(NoiseField::new(config)?);
            }
        }
        Ok(next)
    }

    /// Serializes every key, omitting unset optional ones.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(SchemaPatch::from(self)).unwrap_or(Value::Null)
    }
}

/// A partial override: every key is optional and unset keys are inherited.
///
/// JSON keys are the kebab-case schema key names; unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SchemaPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture_set: Option<Vec<TextureHandle>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_range: Option<Range>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_range: Option<Range>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_gradient: Option<ColorGradient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_curve: Option<ResponseCurve>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<NoiseConfig>,
}

impl SchemaPatch {
    /// Parses a patch from a JSON object. Non-objects and malformed values
    /// fail with `InvalidSchema`.
    pub fn from_json(value: &Value) -> Result<Self, StarfieldError> {
        if !value.is_object() {
            return Err(StarfieldError::InvalidSchema(format!(
                "schema must be a JSON object, got {}",
                json_type_name(value)
            )));
        }
        serde_json::from_value(value.clone())
            .map_err(|e| StarfieldError::InvalidSchema(e.to_string()))
    }

    /// A patch setting only `value`'s key.
    pub fn from_value(value: SchemaValue) -> Self {
        let mut patch = SchemaPatch::default();
        match value {
            SchemaValue::TextureSet(t) => patch.texture_set = Some(t.to_vec()),
            SchemaValue::AlphaRange(r) => patch.alpha_range = Some(r),
            SchemaValue::ScaleRange(r) => patch.scale_range = Some(r),
            SchemaValue::ColorGradient(g) => patch.color_gradient = Some(g),
            SchemaValue::RotationEnabled(b) => patch.rotation_enabled = Some(b),
            SchemaValue::VisibilityThreshold(t) => patch.visibility_threshold = Some(t),
            SchemaValue::ResponseCurve(c) => patch.response_curve = Some(c),
            SchemaValue::Field(f) => patch.field = Some(*f.config()),
        }
        patch
    }

    pub fn with_texture_set(mut self, textures: impl Into<Vec<TextureHandle>>) -> Self {
        self.texture_set = Some(textures.into());
        self
    }

    pub fn with_alpha_range(mut self, min: f64, max: f64) -> Self {
        self.alpha_range = Some(Range::new(min, max));
        self
    }

    pub fn with_scale_range(mut self, min: f64, max: f64) -> Self {
        self.scale_range = Some(Range::new(min, max));
        self
    }

    pub fn with_color_gradient(mut self, gradient: ColorGradient) -> Self {
        self.color_gradient = Some(gradient);
        self
    }

    pub fn with_rotation(mut self, enabled: bool) -> Self {
        self.rotation_enabled = Some(enabled);
        self
    }

    pub fn with_visibility_threshold(mut self, threshold: f64) -> Self {
        self.visibility_threshold = Some(threshold);
        self
    }

    pub fn with_response_curve(mut self, curve: ResponseCurve) -> Self {
        self.response_curve = Some(curve);
        self
    }

    pub fn with_field(mut self, config: NoiseConfig) -> Self {
        self.field = Some(config);
        self
    }
}

impl From<&SchemaSnapshot> for SchemaPatch {
    fn from(s: &SchemaSnapshot) -> Self {
        SchemaPatch {
            texture_set: Some(s.texture_set.to_vec()),
            alpha_range: Some(s.alpha_range),
            scale_range: Some(s.scale_range),
            color_gradient: s.color_gradient,
            rotation_enabled: Some(s.rotation_enabled),
            visibility_threshold: s.visibility_threshold,
            response_curve: Some(s.response_curve),
            field: Some(*s.field.config()),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Morphing parameter store shared by every particle of a field.
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    /// The snapshot being read, or the origin of the running morph.
    from: SchemaSnapshot,
    /// Morph target; `None` in steady state.
    target: Option<SchemaSnapshot>,
    /// Reads left in the current morph; zero in steady state.
    remaining: u32,
    morph_duration: u32,
}

impl AttributeSchema {
    /// Creates a schema from `base` merged over the defaults.
    pub fn new(base: &SchemaPatch) -> Result<Self, StarfieldError> {
        Self::with_morph_duration(base, DEFAULT_MORPH_DURATION)
    }

    /// Like [`AttributeSchema::new`] with a custom morph length in reads.
    pub fn with_morph_duration(
        base: &SchemaPatch,
        morph_duration: u32,
    ) -> Result<Self, StarfieldError> {
        if morph_duration == 0 {
            return Err(StarfieldError::InvalidSchema(
                "morph duration must be at least 1 read".into(),
            ));
        }
        let first = SchemaSnapshot::default().merge(base)?;
        Ok(Self {
            from: first,
            target: None,
            remaining: 0,
            morph_duration,
        })
    }

    /// Creates a schema from a JSON object of schema keys.
    pub fn from_json(base: &Value) -> Result<Self, StarfieldError> {
        Self::new(&SchemaPatch::from_json(base)?)
    }

    /// The effective value of `key`.
    ///
    /// Outside a morph this is the stored value. During a morph, ranges and
    /// gradients are blended at `progress()` and other keys read the newer
    /// snapshot; the call then advances the morph by one read. Returns `None`
    /// when the key is unset in the snapshot being read.
    pub fn get(&mut self, key: SchemaKey) -> Option<SchemaValue> {
        let Some(target) = &self.target else {
            return self.from.value(key);
        };

        let progress = self.progress();
        let result = match (self.from.value(key), target.value(key)) {
            (Some(from), Some(to)) => Some(from.interpolate(&to, progress)),
            (_, to) => to,
        };
        self.advance();
        result
    }

    /// Replaces one key. `value` must be the variant for `key`.
    pub fn set(&mut self, key: SchemaKey, value: SchemaValue) -> Result<&mut Self, StarfieldError> {
        if value.key() != key {
            return Err(StarfieldError::InvalidSchema(format!(
                "value for {} supplied under key {key}",
                value.key()
            )));
        }
        self.set_many(&SchemaPatch::from_value(value))
    }

    /// Merges `patch` over the newest snapshot, makes the result the morph
    /// target and restarts the morph counter. On error nothing changes.
    ///
    /// Mid-morph, the blend at the current progress becomes the new origin,
    /// so the effective values continue from where they were.
    pub fn set_many(&mut self, patch: &SchemaPatch) -> Result<&mut Self, StarfieldError> {
        let next = self.current().merge(patch)?;
        let progress = self.progress();
        if let Some(target) = self.target.take() {
            warn!(
                progress,
                remaining = self.remaining,
                "schema changed mid-morph; restarting from the blended values"
            );
            self.from = self.from.blend(&target, progress);
        }
        self.target = Some(next);
        self.remaining = self.morph_duration;
        debug!(duration = self.morph_duration, "schema morph started");
        Ok(self)
    }

    /// [`AttributeSchema::set_many`] from a JSON object.
    pub fn set_json(&mut self, patch: &Value) -> Result<&mut Self, StarfieldError> {
        let patch = SchemaPatch::from_json(patch)?;
        self.set_many(&patch)
    }

    pub fn is_morphing(&self) -> bool {
        self.target.is_some()
    }

    /// Reads left before the morph target becomes the only snapshot.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn morph_duration(&self) -> u32 {
        self.morph_duration
    }

    /// Morph progress in [0, 1); 1.0 when idle.
    pub fn progress(&self) -> f64 {
        if !self.is_morphing() {
            return 1.0;
        }
        1.0 - self.remaining as f64 / self.morph_duration as f64
    }

    /// Number of held snapshots: 1, or 2 while morphing.
    pub fn depth(&self) -> usize {
        1 + usize::from(self.is_morphing())
    }

    /// The newest snapshot, i.e. where the running morph ends up.
    pub fn current(&self) -> &SchemaSnapshot {
        self.target.as_ref().unwrap_or(&self.from)
    }

    /// The newest snapshot as a JSON object of schema keys.
    pub fn snapshot_to_json(&self) -> Value {
        self.current().to_json()
    }

    pub fn alpha_range(&mut self) -> Option<Range> {
        match self.get(SchemaKey::AlphaRange)? {
            SchemaValue::AlphaRange(r) => Some(r),
            _ => None,
        }
    }

    pub fn scale_range(&mut self) -> Option<Range> {
        match self.get(SchemaKey::ScaleRange)? {
            SchemaValue::ScaleRange(r) => Some(r),
            _ => None,
        }
    }

    pub fn texture_set(&mut self) -> Option<Arc<[TextureHandle]>> {
        match self.get(SchemaKey::TextureSet)? {
            SchemaValue::TextureSet(t) => Some(t),
            _ => None,
        }
    }

    pub fn color_gradient(&mut self) -> Option<ColorGradient> {
        match self.get(SchemaKey::ColorGradient)? {
            SchemaValue::ColorGradient(g) => Some(g),
            _ => None,
        }
    }

    pub fn rotation_enabled(&mut self) -> Option<bool> {
        match self.get(SchemaKey::RotationEnabled)? {
            SchemaValue::RotationEnabled(b) => Some(b),
            _ => None,
        }
    }

    pub fn visibility_threshold(&mut self) -> Option<f64> {
        match self.get(SchemaKey::VisibilityThreshold)? {
            SchemaValue::VisibilityThreshold(t) => Some(t),
            _ => None,
        }
    }

    pub fn response_curve(&mut self) -> Option<ResponseCurve> {
        match self.get(SchemaKey::ResponseCurve)? {
            SchemaValue::ResponseCurve(c) => Some(c),
            _ => None,
        }
    }

    pub fn field(&mut self) -> Option<Arc<NoiseField>> {
        match self.get(SchemaKey::Field)? {
            SchemaValue::Field(f) => Some(f),
            _ => None,
        }
    }

    fn advance(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return;
        }
        if let Some(target) = self.target.take() {
            self.from = target;
            debug!("morph complete");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use serde_json::json;

    fn alpha(schema: &mut AttributeSchema) -> Range {
        schema.alpha_range().unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // -- construction --

    #[test]
    fn new_fills_defaults() {
        let schema = AttributeSchema::new(&SchemaPatch::default()).unwrap();
        let s = schema.current();
        assert_eq!(s.alpha_range(), Range::ALPHA_DEFAULT);
        assert_eq!(s.scale_range(), Range::SCALE_DEFAULT);
        assert_eq!(s.texture_set(), &[TextureHandle(0)]);
        assert!(s.color_gradient().is_none());
        assert!(!schema.is_morphing());
        assert_eq!(schema.morph_duration(), DEFAULT_MORPH_DURATION);
    }

    #[test]
    fn from_json_rejects_non_object() {
        for bad in [json!(null), json!(3), json!("x"), json!([1, 2])] {
            assert!(
                matches!(
                    AttributeSchema::from_json(&bad),
                    Err(StarfieldError::InvalidSchema(_))
                ),
                "accepted {bad}"
            );
        }
    }

    #[test]
    fn from_json_rejects_unknown_key() {
        let result = AttributeSchema::from_json(&json!({"alpha": {"min": 0, "max": 1}}));
        assert!(matches!(result, Err(StarfieldError::InvalidSchema(_))));
    }

    #[test]
    fn from_json_reads_kebab_case_keys() {
        let schema = AttributeSchema::from_json(&json!({
            "alpha-range": {"min": 0.2, "max": 1.0},
            "rotation-enabled": true,
            "texture-set": [3, 4],
            "color-gradient": {"from": "#000000", "to": "#ffffff"}
        }))
        .unwrap();
        let s = schema.current();
        assert_eq!(s.alpha_range(), Range::new(0.2, 1.0));
        assert!(s.rotation_enabled());
        assert_eq!(s.texture_set(), &[TextureHandle(3), TextureHandle(4)]);
        assert!(s.color_gradient().is_some());
    }

    #[test]
    fn zero_morph_duration_rejected() {
        assert!(AttributeSchema::with_morph_duration(&SchemaPatch::default(), 0).is_err());
    }

    #[test]
    fn empty_texture_set_rejected() {
        let patch = SchemaPatch::default().with_texture_set(Vec::new());
        assert!(AttributeSchema::new(&patch).is_err());
    }

    #[test]
    fn inverted_alpha_range_rejected() {
        let patch = SchemaPatch::default().with_alpha_range(0.8, 0.2);
        assert!(AttributeSchema::new(&patch).is_err());
    }

    #[test]
    fn non_positive_scale_rejected() {
        let patch = SchemaPatch::default().with_scale_range(0.0, 1.0);
        assert!(AttributeSchema::new(&patch).is_err());
    }

    #[test]
    fn scale_beyond_f32_rejected() {
        let patch = SchemaPatch::default().with_scale_range(0.5, 1e39);
        match AttributeSchema::new(&patch) {
            Err(StarfieldError::InvalidSchema(msg)) => assert!(msg.starts_with("scale-range")),
            other => panic!("expected InvalidSchema, got {other:?}"),
        }
        let widest = SchemaPatch::default().with_scale_range(0.5, f32::MAX as f64);
        assert!(AttributeSchema::new(&widest).is_ok());
    }

    #[test]
    fn threshold_outside_unit_range_rejected() {
        let patch = SchemaPatch::default().with_visibility_threshold(1.5);
        assert!(AttributeSchema::new(&patch).is_err());
    }

    // -- reads without a morph --

    #[test]
    fn unset_optional_key_reads_as_none() {
        let mut schema = AttributeSchema::new(&SchemaPatch::default()).unwrap();
        assert!(schema.get(SchemaKey::ColorGradient).is_none());
        assert!(schema.get(SchemaKey::VisibilityThreshold).is_none());
    }

    #[test]
    fn steady_state_reads_do_not_touch_counter() {
        let mut schema = AttributeSchema::new(&SchemaPatch::default()).unwrap();
        for _ in 0..10 {
            schema.get(SchemaKey::AlphaRange);
        }
        assert_eq!(schema.remaining(), 0);
        assert_eq!(schema.depth(), 1);
    }

    // -- set / set_many --

    #[test]
    fn set_starts_morph_and_resets_counter() {
        let mut schema = AttributeSchema::new(&SchemaPatch::default()).unwrap();
        schema
            .set(SchemaKey::RotationEnabled, SchemaValue::RotationEnabled(true))
            .unwrap();
        assert_eq!(schema.depth(), 2);
        assert_eq!(schema.remaining(), DEFAULT_MORPH_DURATION);
        assert!(schema.current().rotation_enabled());
    }

    #[test]
    fn set_with_mismatched_variant_fails_without_changes() {
        let mut schema = AttributeSchema::new(&SchemaPatch::default()).unwrap();
        let result = schema.set(SchemaKey::AlphaRange, SchemaValue::RotationEnabled(true));
        assert!(matches!(result, Err(StarfieldError::InvalidSchema(_))));
        assert_eq!(schema.depth(), 1);
    }

    #[test]
    fn invalid_patch_leaves_state_untouched() {
        let mut schema = AttributeSchema::new(&SchemaPatch::default()).unwrap();
        let before = schema.current().clone();
        assert!(schema.set_json(&json!({"alpha-range": {"min": 2, "max": 3}})).is_err());
        assert!(schema.set_json(&json!(42)).is_err());
        assert_eq!(schema.depth(), 1);
        assert_eq!(schema.current(), &before);
    }

    #[test]
    fn partial_patch_keeps_unspecified_keys() {
        let base = SchemaPatch::default()
            .with_alpha_range(0.2, 0.9)
            .with_rotation(true);
        let mut schema = AttributeSchema::new(&base).unwrap();
        schema
            .set_many(&SchemaPatch::default().with_scale_range(0.5, 2.0))
            .unwrap();
        let s = schema.current();
        assert_eq!(s.alpha_range(), Range::new(0.2, 0.9));
        assert!(s.rotation_enabled());
        assert_eq!(s.scale_range(), Range::new(0.5, 2.0));
    }

    #[test]
    fn unchanged_shared_values_keep_their_reference() {
        let mut schema = AttributeSchema::new(&SchemaPatch::default()).unwrap();
        let field_before = Arc::clone(schema.current().field());
        schema
            .set_many(&SchemaPatch::default().with_alpha_range(0.0, 0.5))
            .unwrap();
        assert!(Arc::ptr_eq(&field_before, schema.current().field()));
    }

    // -- morphing --

    #[test]
    fn range_morph_midpoint() {
        let base = SchemaPatch::default().with_alpha_range(0.2, 1.0);
        let mut schema = AttributeSchema::new(&base).unwrap();
        schema
            .set(SchemaKey::AlphaRange, SchemaValue::AlphaRange(Range::new(0.0, 0.0)))
            .unwrap();
        for _ in 0..DEFAULT_MORPH_DURATION / 2 {
            schema.get(SchemaKey::AlphaRange);
        }
        assert!(approx(schema.progress(), 0.5));
        let mid = alpha(&mut schema);
        assert!(approx(mid.min, 0.1), "min = {}", mid.min);
        assert!(approx(mid.max, 0.5), "max = {}", mid.max);
    }

    #[test]
    fn first_read_after_set_returns_old_value() {
        let mut schema =
            AttributeSchema::new(&SchemaPatch::default().with_alpha_range(0.2, 1.0)).unwrap();
        schema
            .set_many(&SchemaPatch::default().with_alpha_range(0.0, 0.0))
            .unwrap();
        assert_eq!(alpha(&mut schema), Range::new(0.2, 1.0));
    }

    #[test]
    fn morph_converges_after_duration_reads() {
        let mut schema = AttributeSchema::with_morph_duration(
            &SchemaPatch::default().with_alpha_range(0.2, 1.0),
            10,
        )
        .unwrap();
        schema
            .set_many(&SchemaPatch::default().with_alpha_range(0.0, 0.4))
            .unwrap();
        for _ in 0..10 {
            schema.get(SchemaKey::AlphaRange);
        }
        assert!(!schema.is_morphing());
        assert_eq!(alpha(&mut schema), Range::new(0.0, 0.4));
    }

    #[test]
    fn every_key_read_advances_the_shared_counter() {
        let mut schema = AttributeSchema::with_morph_duration(&SchemaPatch::default(), 4).unwrap();
        schema
            .set_many(&SchemaPatch::default().with_rotation(true))
            .unwrap();
        schema.get(SchemaKey::AlphaRange);
        schema.get(SchemaKey::Field);
        schema.get(SchemaKey::ColorGradient);
        assert_eq!(schema.remaining(), 1);
        schema.get(SchemaKey::TextureSet);
        assert!(!schema.is_morphing());
    }

    #[test]
    fn non_interpolated_keys_step_to_target() {
        let mut schema = AttributeSchema::new(&SchemaPatch::default()).unwrap();
        schema
            .set_many(
                &SchemaPatch::default()
                    .with_rotation(true)
                    .with_texture_set(vec![TextureHandle(7)]),
            )
            .unwrap();
        assert_eq!(schema.rotation_enabled(), Some(true));
        assert_eq!(&schema.texture_set().unwrap()[..], &[TextureHandle(7)]);
    }

    #[test]
    fn gradient_morph_blends_channels() {
        let from = ColorGradient::new(Rgb::BLACK, Rgb::BLACK);
        let to = ColorGradient::new(Rgb::WHITE, Rgb::from_u8(0, 0, 0));
        let mut schema = AttributeSchema::with_morph_duration(
            &SchemaPatch::default().with_color_gradient(from),
            4,
        )
        .unwrap();
        schema
            .set_many(&SchemaPatch::default().with_color_gradient(to))
            .unwrap();
        schema.get(SchemaKey::ColorGradient);
        schema.get(SchemaKey::ColorGradient);
        let mid = schema.color_gradient().unwrap();
        assert!(approx(mid.from.r, 0.5));
        assert!(approx(mid.to.g, 0.0));
    }

    #[test]
    fn optional_key_added_mid_morph_reads_target() {
        let mut schema = AttributeSchema::new(&SchemaPatch::default()).unwrap();
        schema
            .set_many(&SchemaPatch::default().with_visibility_threshold(0.3))
            .unwrap();
        assert_eq!(schema.visibility_threshold(), Some(0.3));
    }

    #[test]
    fn absent_key_during_morph_is_none_and_still_advances() {
        let mut schema = AttributeSchema::with_morph_duration(&SchemaPatch::default(), 3).unwrap();
        schema
            .set_many(&SchemaPatch::default().with_rotation(true))
            .unwrap();
        assert!(schema.get(SchemaKey::ColorGradient).is_none());
        assert_eq!(schema.remaining(), 2);
    }

    #[test]
    fn set_mid_morph_continues_from_blended_value() {
        let mut schema = AttributeSchema::with_morph_duration(
            &SchemaPatch::default().with_alpha_range(0.0, 0.0),
            4,
        )
        .unwrap();
        schema
            .set_many(&SchemaPatch::default().with_alpha_range(1.0, 1.0))
            .unwrap();
        assert_eq!(alpha(&mut schema).min, 0.0);
        assert!(approx(alpha(&mut schema).min, 0.25));

        schema
            .set_many(&SchemaPatch::default().with_alpha_range(0.0, 0.0))
            .unwrap();
        assert_eq!(schema.depth(), 2);
        assert_eq!(schema.remaining(), 4);

        // origin frozen at the 0.5 the next read would have produced
        for expected in [0.5, 0.375, 0.25, 0.125] {
            assert!(approx(alpha(&mut schema).min, expected));
        }
        assert!(!schema.is_morphing());
        assert_eq!(alpha(&mut schema), Range::new(0.0, 0.0));
    }

    #[test]
    fn back_to_back_sets_morph_from_last_read_value() {
        let mut schema = AttributeSchema::with_morph_duration(
            &SchemaPatch::default().with_alpha_range(0.0, 0.0),
            2,
        )
        .unwrap();
        schema
            .set_many(&SchemaPatch::default().with_alpha_range(0.5, 0.5))
            .unwrap();
        schema
            .set_many(&SchemaPatch::default().with_alpha_range(1.0, 1.0))
            .unwrap();
        assert_eq!(schema.depth(), 2);

        assert_eq!(alpha(&mut schema).min, 0.0);
        assert_eq!(alpha(&mut schema).min, 0.5);
        assert!(!schema.is_morphing());
        assert_eq!(alpha(&mut schema).min, 1.0);
    }

    #[test]
    fn repeated_mid_morph_sets_stay_bounded_and_converge() {
        let duration = 10;
        let mut schema =
            AttributeSchema::with_morph_duration(&SchemaPatch::default(), duration).unwrap();
        let mut latest = Range::ALPHA_DEFAULT;
        for i in 0..100 {
            let v = (i % 10) as f64 / 10.0;
            latest = Range::new(v, v);
            schema
                .set_many(&SchemaPatch::default().with_alpha_range(v, v))
                .unwrap();
            assert!(schema.depth() <= 2);
            for _ in 0..5 {
                alpha(&mut schema);
                assert!(schema.depth() <= 2);
            }
        }
        assert_eq!(schema.current().alpha_range(), latest);

        // the last set has already consumed 5 reads
        for _ in 5..duration {
            alpha(&mut schema);
        }
        assert!(!schema.is_morphing());
        assert_eq!(alpha(&mut schema), latest);
    }

    #[test]
    fn mid_morph_set_keeps_stepped_keys_at_target() {
        let mut schema = AttributeSchema::with_morph_duration(&SchemaPatch::default(), 4).unwrap();
        schema
            .set_many(&SchemaPatch::default().with_rotation(true))
            .unwrap();
        schema.get(SchemaKey::AlphaRange);
        schema
            .set_many(&SchemaPatch::default().with_scale_range(0.5, 0.5))
            .unwrap();
        assert_eq!(schema.rotation_enabled(), Some(true));
        assert!(schema.current().rotation_enabled());
    }

    #[test]
    fn identical_values_skip_interpolation() {
        let a = SchemaValue::AlphaRange(Range::new(0.1, 0.2));
        let b = SchemaValue::AlphaRange(Range::new(0.1, 0.2));
        assert_eq!(a.interpolate(&b, 0.3), b);

        let field = Arc::new(NoiseField::default());
        let f1 = SchemaValue::Field(Arc::clone(&field));
        let f2 = SchemaValue::Field(Arc::clone(&field));
        match f1.interpolate(&f2, 0.5) {
            SchemaValue::Field(out) => assert!(Arc::ptr_eq(&out, &field)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn snapshot_json_round_trips_through_patch() {
        let base = SchemaPatch::default()
            .with_alpha_range(0.2, 0.8)
            .with_visibility_threshold(0.4);
        let schema = AttributeSchema::new(&base).unwrap();
        let json = schema.current().to_json();
        assert!(json.get("color-gradient").is_none());
        assert_eq!(json["visibility-threshold"], json!(0.4));
        let rebuilt = AttributeSchema::from_json(&json).unwrap();
        assert_eq!(rebuilt.current(), schema.current());
    }

    #[test]
    fn schema_key_parses_its_own_names() {
        for key in SchemaKey::ALL {
            assert_eq!(key.as_str().parse::<SchemaKey>().unwrap(), key);
        }
        assert!("alpha".parse::<SchemaKey>().is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn unit() -> impl Strategy<Value = f64> {
            0.0_f64..=1.0
        }

        proptest! {
            #[test]
            fn range_morph_moves_monotonically_toward_target(
                a_min in unit(), a_span in unit(),
                b_min in unit(), b_span in unit(),
                duration in 2_u32..200,
            ) {
                let a = Range::new(a_min, (a_min + a_span).min(1.0));
                let b = Range::new(b_min, (b_min + b_span).min(1.0));
                prop_assume!(a != b);
                let mut schema = AttributeSchema::with_morph_duration(
                    &SchemaPatch { alpha_range: Some(a), ..SchemaPatch::default() },
                    duration,
                ).unwrap();
                schema.set_many(&SchemaPatch { alpha_range: Some(b), ..SchemaPatch::default() }).unwrap();

                let mut prev = schema.alpha_range().unwrap();
                for _ in 1..duration {
                    let next = schema.alpha_range().unwrap();
                    prop_assert!((b.min - next.min).abs() <= (b.min - prev.min).abs() + 1e-12);
                    prop_assert!((b.max - next.max).abs() <= (b.max - prev.max).abs() + 1e-12);
                    if (a.min - b.min).abs() > 1e-9 {
                        prop_assert!((b.min - next.min).abs() < (b.min - prev.min).abs());
                    }
                    if (a.max - b.max).abs() > 1e-9 {
                        prop_assert!((b.max - next.max).abs() < (b.max - prev.max).abs());
                    }
                    prev = next;
                }
                prop_assert_eq!(schema.alpha_range().unwrap(), b);
            }

            #[test]
            fn interleaved_sets_hold_two_snapshots_and_settle_on_the_last(
                steps in prop::collection::vec((unit(), 0_u32..8), 1..40),
                duration in 1_u32..10,
            ) {
                let mut schema =
                    AttributeSchema::with_morph_duration(&SchemaPatch::default(), duration).unwrap();
                for &(v, reads) in &steps {
                    schema.set_many(&SchemaPatch::default().with_alpha_range(v, v)).unwrap();
                    for _ in 0..reads {
                        let r = schema.alpha_range().unwrap();
                        prop_assert!((0.0..=1.0).contains(&r.min));
                        prop_assert!(schema.depth() <= 2);
                    }
                }
                for _ in 0..duration {
                    schema.alpha_range();
                }
                let last = steps[steps.len() - 1].0;
                prop_assert!(!schema.is_morphing());
                prop_assert_eq!(schema.alpha_range().unwrap(), Range::new(last, last));
            }
        }
    }
}
