use std::fmt;

pub const EMPTY_PROMPT_MESSAGE: &str = "Please enter a design idea.";

pub const LABEL_MAX_CHARS: usize = 40;

const TEXTURE_SUFFIX: &str = "t-shirt design texture, seamless pattern, high quality, detailed, \
artistic, front view, fabric texture, wearable design, no background, clean edges";

const IMAGEN_PREFIX: &str = "A modern, high-quality, centered graphic for a t-shirt design with a \
transparent background. The design should be bold and clear. Style hint: vector art, minimalist. \
The design is: ";

const DESCRIPTION_TEMPLATE: &str = "You are a creative fashion designer and copywriter.
Create a compelling, detailed description of a T-shirt design based on this prompt: \"{prompt}\"

The description should be:
- 2-3 sentences long
- Creative and engaging
- Include style, mood, and design elements
- Suitable for marketing and social media
- Written in a trendy, fashion-forward tone

Focus on the visual appeal and story behind the design.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    #[error("{}", EMPTY_PROMPT_MESSAGE)]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignPrompt(String);

impl DesignPrompt {
    pub fn parse(raw: &str) -> Result<Self, PromptError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PromptError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DesignPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn texture_prompt(prompt: &str) -> String {
    format!("{prompt}, {TEXTURE_SUFFIX}")
}

pub fn imagen_prompt(prompt: &str) -> String {
    format!("{IMAGEN_PREFIX}{prompt}")
}

pub fn description_prompt(prompt: &str) -> String {
    DESCRIPTION_TEMPLATE.replace("{prompt}", prompt)
}

pub fn fallback_description(prompt: &str) -> String {
    format!(
        "A unique T-shirt design featuring {}. This creative piece combines modern aesthetics \
with personal expression, perfect for making a statement.",
        prompt.to_lowercase()
    )
}

pub fn label_text(prompt: &str, max_chars: usize) -> String {
    if prompt.chars().count() <= max_chars {
        return prompt.to_string();
    }
    let mut label = prompt.chars().take(max_chars).collect::<String>();
    label.push_str("...");
    label
}
