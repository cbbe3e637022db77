//! Static rule tables. Keywords are matched as lowercase substrings and are
//! intentionally multilingual.

/// Hard-block rules: any keyword hit blocks the instruction outright.
pub const BLOCK_RULES: &[(&str, &[&str])] = &[
    (
        "high_risk_face_swap",
        &[
            "face swap",
            "deepfake",
            "celebrity",
            "public figure",
            "换脸",
            "仿冒",
        ],
    ),
    (
        "explicit_violence",
        &[
            "gore",
            "beheading",
            "dismember",
            "blood explosion",
            "虐杀",
            "血腥",
        ],
    ),
    (
        "sexual_content",
        &["nude", "explicit sexual", "porn", "色情", "裸露"],
    ),
    (
        "hate_or_terror",
        &["terror", "isis", "hate speech", "纳粹", "恐怖袭击"],
    ),
];

/// Built-in high-risk markers; configuration can extend this list.
pub const HIGH_RISK_KEYWORDS: &[&str] = &[
    "public figure",
    "politician",
    "minor",
    "medical",
    "financial advice",
    "breaking news",
    "名人",
    "未成年人",
    "医疗",
    "金融",
];

/// Anything brand-adjacent is at least medium risk.
pub const BRAND_KEYWORDS: &[&str] = &["brand", "trademark", "logo", "watermark", "商标", "水印"];
