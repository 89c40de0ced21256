use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use teeforge_contracts::artifacts::GeneratedImage;
use teeforge_contracts::prompts::{label_text, LABEL_MAX_CHARS};

pub const PALETTE: [&str; 24] = [
    "#667eea", "#764ba2", "#f093fb", "#f5576c", "#4facfe", "#00f2fe", "#ff6b6b", "#4ecdc4",
    "#45b7d1", "#96ceb4", "#ffeaa7", "#dda0dd", "#98d8c8", "#f7dc6f", "#bb8fce", "#85c1e9",
    "#f8c471", "#82e0aa", "#f39c12", "#e74c3c", "#9b59b6", "#3498db", "#1abc9c", "#f1c40f",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DesignStyle {
    Geometric,
    Abstract,
    Minimalist,
    Organic,
}

impl DesignStyle {
    pub const ALL: [Self; 4] = [
        Self::Geometric,
        Self::Abstract,
        Self::Minimalist,
        Self::Organic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Geometric => "geometric",
            Self::Abstract => "abstract",
            Self::Minimalist => "minimalist",
            Self::Organic => "organic",
        }
    }

    fn elements(self, c: &[&str; 4]) -> [String; 4] {
        match self {
            Self::Geometric => [
                format!(r#"<path d="M 50 50 L 150 100 L 250 50 L 350 100 L 350 350 L 50 350 Z" fill="{}" opacity="0.9"/>"#, c[0]),
                format!(r#"<circle cx="100" cy="200" r="50" fill="{}" opacity="0.8"/>"#, c[1]),
                format!(r#"<rect x="200" y="150" width="100" height="100" fill="{}" opacity="0.7"/>"#, c[2]),
                format!(r#"<polygon points="300,100 350,150 300,200 250,150" fill="{}" opacity="0.6"/>"#, c[3]),
            ],
            Self::Abstract => [
                format!(r#"<path d="M 40 100 Q 120 60 200 100 T 360 100 Q 280 140 200 100 T 40 100" fill="{}" opacity="0.9"/>"#, c[0]),
                format!(r#"<circle cx="120" cy="250" r="45" fill="{}" opacity="0.8"/>"#, c[1]),
                format!(r#"<path d="M 240 180 Q 280 160 320 180 T 400 220 Q 360 240 320 220 T 240 180" fill="{}" opacity="0.7"/>"#, c[2]),
                format!(r#"<ellipse cx="80" cy="300" rx="60" ry="30" fill="{}" opacity="0.6"/>"#, c[3]),
            ],
            Self::Minimalist => [
                format!(r#"<line x1="50" y1="150" x2="450" y2="150" stroke="{}" stroke-width="10" opacity="0.9"/>"#, c[0]),
                format!(r#"<circle cx="250" cy="250" r="80" fill="none" stroke="{}" stroke-width="8" opacity="0.8"/>"#, c[1]),
                format!(r#"<rect x="150" y="150" width="200" height="200" fill="none" stroke="{}" stroke-width="6" opacity="0.7"/>"#, c[2]),
                format!(r#"<path d="M 100 300 L 200 250 L 300 300 L 400 250" stroke="{}" stroke-width="5" fill="none" opacity="0.6"/>"#, c[3]),
            ],
            Self::Organic => [
                format!(r#"<path d="M 100 100 C 150 80 200 120 250 100 S 350 80 400 100 L 400 300 C 350 320 300 280 250 300 S 150 320 100 300 Z" fill="{}" opacity="0.8"/>"#, c[0]),
                format!(r#"<circle cx="150" cy="200" r="40" fill="{}" opacity="0.7"/>"#, c[1]),
                format!(r#"<path d="M 250 180 Q 300 160 350 180 T 450 200 Q 400 220 350 200 T 250 180" fill="{}" opacity="0.6"/>"#, c[2]),
                format!(r#"<ellipse cx="300" cy="280" rx="50" ry="25" fill="{}" opacity="0.5"/>"#, c[3]),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProceduralDesign {
    pub style: DesignStyle,
    pub background: &'static str,
    pub accent: &'static str,
    pub highlight: &'static str,
    pub svg: String,
}

impl ProceduralDesign {
    pub fn to_image(&self) -> GeneratedImage {
        GeneratedImage::DataUri(format!(
            "data:image/svg+xml;base64,{}",
            BASE64.encode(self.svg.as_bytes())
        ))
    }
}

#[derive(Debug)]
pub struct ProceduralTexture {
    rng: Mutex<StdRng>,
}

impl Default for ProceduralTexture {
    fn default() -> Self {
        Self::new()
    }
}

impl ProceduralTexture {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn design(&self, prompt: &str) -> ProceduralDesign {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let style = DesignStyle::ALL[rng.gen_range(0..DesignStyle::ALL.len())];
        let mut pick = || PALETTE[rng.gen_range(0..PALETTE.len())];
        let element_colors = [pick(), pick(), pick(), pick()];
        let background = pick();
        let accent = pick();
        let highlight = pick();

        let svg = render_svg(
            style,
            &element_colors,
            background,
            accent,
            highlight,
            &label_text(prompt, LABEL_MAX_CHARS),
        );
        ProceduralDesign {
            style,
            background,
            accent,
            highlight,
            svg,
        }
    }

    pub fn generate(&self, prompt: &str) -> GeneratedImage {
        self.design(prompt).to_image()
    }
}

fn render_svg(
    style: DesignStyle,
    element_colors: &[&str; 4],
    background: &str,
    accent: &str,
    highlight: &str,
    label: &str,
) -> String {
    let elements = style.elements(element_colors).join("\n    ");
    let label = escape_xml(label);
    format!(
        r##"<svg width="512" height="512" viewBox="0 0 512 512" xmlns="http://www.w3.org/2000/svg" data-style="{style}">
  <defs>
    <linearGradient id="bgGrad" x1="0%" y1="0%" x2="100%" y2="100%">
      <stop offset="0%" style="stop-color:{background};stop-opacity:0.95"/>
      <stop offset="100%" style="stop-color:{accent};stop-opacity:0.85"/>
    </linearGradient>
    <radialGradient id="centerGrad" cx="50%" cy="50%" r="50%">
      <stop offset="0%" style="stop-color:#ffffff;stop-opacity:0.98"/>
      <stop offset="100%" style="stop-color:#ffffff;stop-opacity:0.05"/>
    </radialGradient>
    <filter id="shadow" x="-20%" y="-20%" width="140%" height="140%">
      <feDropShadow dx="2" dy="2" stdDeviation="3" flood-color="#000000" flood-opacity="0.2"/>
    </filter>
    <filter id="glow" x="-50%" y="-50%" width="200%" height="200%">
      <feGaussianBlur stdDeviation="6" result="coloredBlur"/>
      <feMerge>
        <feMergeNode in="coloredBlur"/>
        <feMergeNode in="SourceGraphic"/>
      </feMerge>
    </filter>
    <pattern id="texturePattern" x="0" y="0" width="64" height="64" patternUnits="userSpaceOnUse">
      <circle cx="32" cy="32" r="2" fill="{highlight}" opacity="0.3"/>
      <circle cx="16" cy="16" r="1" fill="{highlight}" opacity="0.2"/>
      <circle cx="48" cy="48" r="1.5" fill="{highlight}" opacity="0.25"/>
    </pattern>
  </defs>
  <rect width="512" height="512" fill="url(#bgGrad)"/>
  <rect width="512" height="512" fill="url(#texturePattern)"/>
  <circle cx="256" cy="256" r="220" fill="url(#centerGrad)" filter="url(#shadow)"/>
  <g filter="url(#glow)">
    {elements}
  </g>
  <text x="256" y="280" text-anchor="middle" font-family="Arial, sans-serif" font-size="24" font-weight="bold" fill="#2d3748" filter="url(#shadow)">{label}</text>
  <text x="256" y="320" text-anchor="middle" font-family="Arial, sans-serif" font-size="16" fill="#718096" opacity="0.8">3D T-Shirt Texture</text>
  <g opacity="0.7">
    <circle cx="60" cy="60" r="25" fill="{accent}"/>
    <circle cx="452" cy="60" r="20" fill="{background}"/>
    <circle cx="60" cy="452" r="30" fill="{accent}"/>
    <circle cx="452" cy="452" r="22" fill="{background}"/>
  </g>
  <rect x="20" y="20" width="472" height="472" fill="none" stroke="{highlight}" stroke-width="2" opacity="0.3" rx="10"/>
</svg>
"##,
        style = style.name(),
    )
}

fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            '\u{0}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}' => out.push('\u{fffd}'),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn parse_svg(image: &GeneratedImage) -> anyhow::Result<String> {
        let (mime, bytes) = image.decode()?;
        assert_eq!(mime, "image/svg+xml");
        Ok(String::from_utf8(bytes)?)
    }

    #[test]
    fn output_is_a_parseable_svg_data_uri() -> anyhow::Result<()> {
        let texture = ProceduralTexture::new();
        let svg = parse_svg(&texture.generate("neon astronaut surfing on pizza"))?;
        let doc = roxmltree::Document::parse(&svg)?;
        let root = doc.root_element();
        assert_eq!(root.tag_name().name(), "svg");
        assert!(root.children().any(|node| node.is_element()));
        Ok(())
    }

    #[test]
    fn fixed_seed_is_deterministic() {
        let first = ProceduralTexture::with_seed(42).design("retro sunset");
        let second = ProceduralTexture::with_seed(42).design("retro sunset");
        assert_eq!(first, second);
    }

    #[test]
    fn all_styles_are_reachable() {
        let texture = ProceduralTexture::with_seed(7);
        let styles: HashSet<DesignStyle> = (0..200)
            .map(|_| texture.design("tiger").style)
            .collect();
        assert_eq!(styles.len(), DesignStyle::ALL.len());
    }

    #[test]
    fn colors_come_from_the_palette() {
        let design = ProceduralTexture::with_seed(3).design("koi");
        for color in [design.background, design.accent, design.highlight] {
            assert!(PALETTE.contains(&color));
        }
        assert!(design.svg.contains(&format!("data-style=\"{}\"", design.style.name())));
    }

    #[test]
    fn control_characters_in_prompt_keep_svg_parseable() -> anyhow::Result<()> {
        let texture = ProceduralTexture::with_seed(1);
        let svg = parse_svg(&texture.generate("neon\u{1}cat\u{1b}[0m\u{ffff}"))?;
        let doc = roxmltree::Document::parse(&svg)?;
        let label = doc
            .descendants()
            .find(|node| node.has_tag_name("text"))
            .and_then(|node| node.text())
            .unwrap_or_default();
        assert_eq!(label, "neon\u{fffd}cat\u{fffd}[0m\u{fffd}");
        Ok(())
    }

    #[test]
    fn label_is_truncated_and_escaped() -> anyhow::Result<()> {
        let prompt = format!("<b>\"Fish & Chips\"</b> {}", "x".repeat(60));
        let design = ProceduralTexture::with_seed(1).design(&prompt);
        let doc = roxmltree::Document::parse(&design.svg)?;
        let label = doc
            .descendants()
            .find(|node| node.has_tag_name("text"))
            .and_then(|node| node.text())
            .unwrap_or_default();
        assert!(label.starts_with("<b>\"Fish & Chips\"</b>"));
        assert!(label.ends_with("..."));
        assert_eq!(label.chars().count(), LABEL_MAX_CHARS + 3);
        Ok(())
    }
}
