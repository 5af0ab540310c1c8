//! Ore quality buckets and their color tags

use serde::{Deserialize, Serialize};

/// Quality class a sample's color tag encodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityBucket {
    /// Above 40 %
    Rich,
    /// 37 to 39 %
    Ordinary,
    /// Below 37 %
    Poor,
}

impl QualityBucket {
    pub const ALL: [QualityBucket; 3] = [Self::Rich, Self::Ordinary, Self::Poor];

    /// Classify a quality score the way the survey producer tags samples
    pub fn from_score(score: f64) -> Self {
        if score > 40.0 {
            Self::Rich
        } else if (37.0..=39.0).contains(&score) {
            Self::Ordinary
        } else {
            Self::Poor
        }
    }

    /// Legend color shown to the operator
    pub fn legend_hex(self) -> &'static str {
        match self {
            Self::Rich => "#A259FF",
            Self::Ordinary => "#2CD9C5",
            Self::Poor => "#FFE066",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Rich => "Rich ore (>40%)",
            Self::Ordinary => "Ordinary ore (37-39%)",
            Self::Poor => "Poor ore (<37%)",
        }
    }
}

/// Parse `#rrggbb` or `#rgb` into sRGB components in 0..=1
pub fn parse_hex_color(hex: &str) -> Option<[f32; 3]> {
    let digits = hex.trim().strip_prefix('#')?;
    if !digits.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);

    match digits.len() {
        6 => Some([
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
        ]),
        3 => {
            let mut rgb = [0.0; 3];
            for (i, c) in digits.chars().enumerate() {
                let doubled: String = [c, c].iter().collect();
                rgb[i] = channel(&doubled)?;
            }
            Some(rgb)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_score_boundaries() {
        assert_eq!(QualityBucket::from_score(40.5), QualityBucket::Rich);
        assert_eq!(QualityBucket::from_score(40.0), QualityBucket::Poor);
        assert_eq!(QualityBucket::from_score(38.0), QualityBucket::Ordinary);
        assert_eq!(QualityBucket::from_score(37.0), QualityBucket::Ordinary);
        assert_eq!(QualityBucket::from_score(36.9), QualityBucket::Poor);
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ffffff"), Some([1.0, 1.0, 1.0]));
        assert_eq!(parse_hex_color("#fff"), Some([1.0, 1.0, 1.0]));
        assert_eq!(parse_hex_color("#000000"), Some([0.0, 0.0, 0.0]));
        assert!(parse_hex_color("ffffff").is_none());
        assert!(parse_hex_color("#12345").is_none());
        assert!(parse_hex_color("#zzzzzz").is_none());

        let [r, g, b] = parse_hex_color(QualityBucket::Poor.legend_hex()).unwrap();
        assert_eq!((r, g), (1.0, 224.0 / 255.0));
        assert!((b - 102.0 / 255.0).abs() < 1e-6);
    }
}
