use std::str::FromStr;

use image::Rgb;
use serde::{Deserialize, Serialize};

use crate::analysis::geometry::{NormalizedBox, NormalizedPolygon};

/// One detected occurrence of a label, with its own box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelInstance {
    pub bounding_box: NormalizedBox,
    pub confidence: f64,
}

/// A detected object class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub confidence: f64,
    pub instances: Vec<LabelInstance>,
    pub parents: Vec<String>,
}

impl Label {
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            confidence,
            instances: Vec::new(),
            parents: Vec::new(),
        }
    }

    pub fn with_instance(mut self, bounding_box: NormalizedBox, confidence: f64) -> Self {
        self.instances.push(LabelInstance {
            bounding_box,
            confidence,
        });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextKind {
    Line,
    Word,
}

/// A detected piece of text with its outline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDetection {
    pub text: String,
    pub kind: TextKind,
    pub id: Option<u32>,
    pub parent_id: Option<u32>,
    pub confidence: f64,
    pub polygon: NormalizedPolygon,
}

/// All boxes of one label, in instance order
#[derive(Debug, Clone, PartialEq)]
pub struct BoxGroup {
    pub label: String,
    pub boxes: Vec<NormalizedBox>,
}

impl BoxGroup {
    /// Groups compare by their boxes only; the label name is ignored
    pub fn same_boxes(&self, other: &BoxGroup) -> bool {
        self.boxes == other.boxes
    }
}

/// One group per label that has at least one instance, in label order
pub fn box_groups(labels: &[Label]) -> Vec<BoxGroup> {
    labels
        .iter()
        .filter(|label| !label.instances.is_empty())
        .map(|label| BoxGroup {
            label: label.name.clone(),
            boxes: label.instances.iter().map(|i| i.bounding_box).collect(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const AQUA: Color = Color { r: 0, g: 255, b: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255 };
    pub const YELLOW: Color = Color { r: 255, g: 255, b: 0 };
    pub const GREEN: Color = Color { r: 0, g: 128, b: 0 };
    pub const LIGHT_GREEN: Color = Color { r: 144, g: 238, b: 144 };

    fn named(name: &str) -> Option<Color> {
        let color = match name {
            "aqua" | "cyan" => Color::AQUA,
            "red" => Color::RED,
            "white" => Color::WHITE,
            "blue" => Color::BLUE,
            "yellow" => Color::YELLOW,
            "green" => Color::GREEN,
            "lightgreen" => Color::LIGHT_GREEN,
            _ => return None,
        };
        Some(color)
    }
}

impl From<Color> for Rgb<u8> {
    fn from(color: Color) -> Self {
        Rgb([color.r, color.g, color.b])
    }
}

/// Accepts a CSS-style name (`aqua`, `lightgreen`, ...) or `#rrggbb`
impl FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                anyhow::bail!("Expected #rrggbb, got '#{}'", hex);
            }
            let channel = |range: std::ops::Range<usize>| {
                u8::from_str_radix(&hex[range], 16)
                    .map_err(|e| anyhow::anyhow!("Invalid hex color '#{}': {}", hex, e))
            };
            return Ok(Color {
                r: channel(0..2)?,
                g: channel(2..4)?,
                b: channel(4..6)?,
            });
        }
        Color::named(&s).ok_or_else(|| anyhow::anyhow!("Unknown color name: {}", s))
    }
}

/// Ordered display colors, cycled when there are more groups than colors
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    pub fn new(colors: Vec<Color>) -> anyhow::Result<Self> {
        if colors.is_empty() {
            anyhow::bail!("Palette needs at least one color");
        }
        Ok(Self { colors })
    }

    /// Exactly `count` colors, group `i` gets `colors[i % len]`
    pub fn assign(&self, count: usize) -> Vec<Color> {
        self.colors.iter().copied().cycle().take(count).collect()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: vec![
                Color::AQUA,
                Color::RED,
                Color::WHITE,
                Color::BLUE,
                Color::YELLOW,
                Color::GREEN,
                Color::YELLOW,
                Color::LIGHT_GREEN,
            ],
        }
    }
}
