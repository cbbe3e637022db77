//! Edit capabilities and their fixed tool chains and keyword hints.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "capability", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    RemoveObject,
    ReplaceObject,
    ReplaceBackground,
    Stylize,
    ColorGrade,
    RemoveLogo,
}

impl Capability {
    /// Detection order; ties in keyword scoring resolve to the earlier entry.
    pub const ALL: [Capability; 6] = [
        Capability::RemoveObject,
        Capability::ReplaceObject,
        Capability::ReplaceBackground,
        Capability::Stylize,
        Capability::ColorGrade,
        Capability::RemoveLogo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::RemoveObject => "remove_object",
            Capability::ReplaceObject => "replace_object",
            Capability::ReplaceBackground => "replace_background",
            Capability::Stylize => "stylize",
            Capability::ColorGrade => "color_grade",
            Capability::RemoveLogo => "remove_logo",
        }
    }

    /// The fixed, ordered tool chain executed for this capability.
    pub fn tool_chain(&self) -> &'static [&'static str] {
        match self {
            Capability::RemoveObject => &[
                "groundingdino_detect",
                "sam2_segment",
                "xmem_track",
                "propainter_inpaint",
                "temporal_smoothing",
            ],
            Capability::ReplaceObject => &[
                "target_segment_track",
                "conditional_replace",
                "edge_blend",
                "color_match",
            ],
            Capability::ReplaceBackground => &[
                "portrait_matting",
                "background_replace_or_generate",
                "lighting_match",
                "shadow_refine",
            ],
            Capability::Stylize => &[
                "keyframe_stylization",
                "temporal_propagation",
                "anti_flicker_constraint",
            ],
            Capability::ColorGrade => &[
                "lut_curve_suggestion",
                "ffmpeg_color_grading",
                "color_consistency_check",
            ],
            Capability::RemoveLogo => &[
                "logo_text_detect",
                "track_logo",
                "local_inpaint",
                "ocr_residual_check",
            ],
        }
    }

    /// Keyword hints scored during capability detection.
    pub fn hints(&self) -> &'static [&'static str] {
        match self {
            Capability::RemoveObject => &["remove", "erase", "delete", "去除", "移除"],
            Capability::ReplaceObject => &["replace", "swap", "change object", "替换"],
            Capability::ReplaceBackground => &["background", "green screen", "背景", "抠像"],
            Capability::Stylize => &["style", "anime", "aesthetic", "风格", "卡通"],
            Capability::ColorGrade => &["color", "lut", "grading", "调色", "色调"],
            Capability::RemoveLogo => &["logo", "watermark", "text removal", "去logo", "水印"],
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
