use serde::{Deserialize, Serialize};

use crate::{Category, ObjectState, Seconds, NEVER};

macro_rules! overlay_fields {
    ($dst:expr, $patch:expr; $($field:ident),+ $(,)?) => {
        $(
            if $patch.$field.is_some() {
                $dst.$field = $patch.$field;
            }
        )+
    };
}

macro_rules! impl_object_state {
    ($ty:ty, $category:expr, |$dst:ident, $patch:ident| $body:block) => {
        impl ObjectState for $ty {
            const CATEGORY: Category = $category;

            fn base(&self) -> &StateBase {
                &self.base
            }

            fn base_mut(&mut self) -> &mut StateBase {
                &mut self.base
            }

            fn overlay(&mut self, patch: Self) {
                let $dst = self;
                let $patch = patch;
                overlay_fields!($dst.base, $patch.base; easing, destroy);
                $body
            }
        }
    };
}

fn never() -> Seconds {
    NEVER
}

/// Fields every state carries, whatever its category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateBase {
    #[serde(default = "never")]
    pub time: Seconds,
    #[serde(default)]
    pub relative_time: Option<Seconds>,
    #[serde(default)]
    pub add_time: Option<Seconds>,
    #[serde(default)]
    pub easing: Option<String>,
    #[serde(default)]
    pub destroy: Option<bool>,
}

impl Default for StateBase {
    fn default() -> Self {
        Self {
            time: NEVER,
            relative_time: None,
            add_time: None,
            easing: None,
            destroy: None,
        }
    }
}

/// Placement block shared by texts, sprites and videos.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageFields {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub rot_x: Option<f64>,
    pub rot_y: Option<f64>,
    pub rot_z: Option<f64>,
    pub scale_x: Option<f64>,
    pub scale_y: Option<f64>,
    pub opacity: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub pivot_x: Option<f64>,
    pub pivot_y: Option<f64>,
    pub color: Option<String>,
    pub layer: Option<i32>,
    pub order: Option<i32>,
    pub fill_width: Option<bool>,
}

impl StageFields {
    fn overlay(&mut self, patch: StageFields) {
        overlay_fields!(self, patch;
            x, y, z, rot_x, rot_y, rot_z, scale_x, scale_y, opacity,
            width, height, pivot_x, pivot_y, color, layer, order, fill_width,
        );
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextState {
    #[serde(flatten)]
    pub base: StateBase,
    #[serde(flatten)]
    pub stage: StageFields,
    pub text: Option<String>,
    pub size: Option<i32>,
    pub align: Option<String>,
    pub letter_spacing: Option<f64>,
    pub font_weight: Option<String>,
}

impl_object_state!(TextState, Category::Text, |dst, patch| {
    dst.stage.overlay(patch.stage);
    overlay_fields!(dst, patch; text, size, align, letter_spacing, font_weight);
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteState {
    #[serde(flatten)]
    pub base: StateBase,
    #[serde(flatten)]
    pub stage: StageFields,
    pub path: Option<String>,
    pub preserve_aspect: Option<bool>,
}

impl_object_state!(SpriteState, Category::Sprite, |dst, patch| {
    dst.stage.overlay(patch.stage);
    overlay_fields!(dst, patch; path, preserve_aspect);
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoState {
    #[serde(flatten)]
    pub base: StateBase,
    #[serde(flatten)]
    pub stage: StageFields,
    pub path: Option<String>,
}

impl_object_state!(VideoState, Category::Video, |dst, patch| {
    dst.stage.overlay(patch.stage);
    overlay_fields!(dst, patch; path);
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinePosition {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineState {
    #[serde(flatten)]
    pub base: StateBase,
    pub pos: Option<Vec<LinePosition>>,
    pub width: Option<f64>,
    pub color: Option<String>,
    pub opacity: Option<f64>,
    pub layer: Option<i32>,
    pub order: Option<i32>,
}

impl_object_state!(LineState, Category::Line, |dst, patch| {
    overlay_fields!(dst, patch; pos, width, color, opacity, layer, order);
});

/// Scene-wide parameters: UI visibility, camera, scanline and post effects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerState {
    #[serde(flatten)]
    pub base: StateBase,

    pub storyboard_opacity: Option<f64>,
    pub ui_opacity: Option<f64>,
    pub scanline_opacity: Option<f64>,
    pub background_dim: Option<f64>,
    pub note_opacity_multiplier: Option<f64>,

    pub size: Option<f64>,
    pub fov: Option<f64>,
    pub perspective: Option<bool>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub rot_x: Option<f64>,
    pub rot_y: Option<f64>,
    pub rot_z: Option<f64>,

    pub override_scanline_pos: Option<bool>,
    pub scanline_pos: Option<f64>,
    pub scanline_color: Option<String>,
    pub note_ring_color: Option<String>,
    pub note_fill_color: Option<String>,

    pub bloom: Option<bool>,
    pub bloom_intensity: Option<f64>,
    pub vignette: Option<bool>,
    pub vignette_intensity: Option<f64>,
    pub vignette_color: Option<String>,
    pub chromatic: Option<bool>,
    pub chromatic_intensity: Option<f64>,
    pub gray_scale: Option<bool>,
    pub gray_scale_intensity: Option<f64>,
    pub noise: Option<bool>,
    pub noise_intensity: Option<f64>,
}

impl_object_state!(ControllerState, Category::Controller, |dst, patch| {
    overlay_fields!(dst, patch;
        storyboard_opacity, ui_opacity, scanline_opacity, background_dim, note_opacity_multiplier,
        size, fov, perspective, x, y, z, rot_x, rot_y, rot_z,
        override_scanline_pos, scanline_pos, scanline_color, note_ring_color, note_fill_color,
        bloom, bloom_intensity, vignette, vignette_intensity, vignette_color,
        chromatic, chromatic_intensity, gray_scale, gray_scale_intensity, noise, noise_intensity,
    );
});

/// Per-note overrides applied to the chart note `note`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteControllerState {
    #[serde(flatten)]
    pub base: StateBase,
    pub note: Option<i32>,
    pub override_x: Option<bool>,
    pub x: Option<f64>,
    pub override_y: Option<bool>,
    pub y: Option<f64>,
    pub override_z: Option<bool>,
    pub z: Option<f64>,
    pub rot_x: Option<f64>,
    pub rot_y: Option<f64>,
    pub rot_z: Option<f64>,
    pub opacity_multiplier: Option<f64>,
    pub size_multiplier: Option<f64>,
    pub hold_direction: Option<i32>,
    pub style: Option<i32>,
    pub ring_color: Option<String>,
    pub fill_color: Option<String>,
}

impl_object_state!(NoteControllerState, Category::NoteController, |dst, patch| {
    overlay_fields!(dst, patch;
        note, override_x, x, override_y, y, override_z, z, rot_x, rot_y, rot_z,
        opacity_multiplier, size_multiplier, hold_direction, style, ring_color, fill_color,
    );
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_keeps_inherited_fields_and_replaces_set_ones() {
        let mut prev = SpriteState::default();
        prev.stage.x = Some(1.0);
        prev.stage.opacity = Some(0.5);
        prev.path = Some("a.png".to_string());
        prev.base.easing = Some("linear".to_string());

        let patch: SpriteState =
            serde_json::from_value(serde_json::json!({ "x": 2.0, "path": "b.png" })).unwrap();
        prev.overlay(patch);

        assert_eq!(prev.stage.x, Some(2.0));
        assert_eq!(prev.stage.opacity, Some(0.5));
        assert_eq!(prev.path.as_deref(), Some("b.png"));
        assert_eq!(prev.base.easing.as_deref(), Some("linear"));
    }

    #[test]
    fn overlay_leaves_timing_alone() {
        let mut prev = ControllerState::default();
        prev.base.time = 3.0;
        let mut patch = ControllerState::default();
        patch.base.time = 9.0;
        patch.base.relative_time = Some(1.0);
        patch.ui_opacity = Some(0.0);
        prev.overlay(patch);

        assert_eq!(prev.base.time, 3.0);
        assert_eq!(prev.base.relative_time, None);
        assert_eq!(prev.ui_opacity, Some(0.0));
    }

    #[test]
    fn line_positions_default_z() {
        let state: LineState = serde_json::from_value(serde_json::json!({
            "pos": [{ "x": 0.0, "y": 1.0 }, { "x": 2.0, "y": 3.0, "z": 4.0 }],
            "width": 0.1
        }))
        .unwrap();
        let pos = state.pos.unwrap();
        assert_eq!(pos[0].z, 0.0);
        assert_eq!(pos[1].z, 4.0);
        assert_eq!(state.base.time, NEVER);
    }
}
