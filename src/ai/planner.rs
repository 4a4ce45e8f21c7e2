//! Style planning
//!
//! Turns a raw user prompt into a coherent set of per-variant image prompts:
//!
//! 1. **Template derivation**: one chat call produces a shared style template
//!    (visual theme, palette, mood) for the whole submission.
//! 2. **Prompt derivation**: a second chat call turns the template into one
//!    optimized prompt per image variant, returned as a fixed-key JSON object.
//!
//! Either step can fail upstream or return something unparseable; both cases
//! substitute deterministic fallback content so the image pipeline never
//! stalls on derivation. Plans are cached per prompt so the variant calls of
//! one submission share a single template.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::ai::openai::{AiError, OpenAiClient};
use crate::types::{ImageVariant, VariantSet};

const MAX_CACHED_PLANS: usize = 256;

const TEMPLATE_SYSTEM_PROMPT: &str = "You are a creative director and brand strategist specializing in Farcaster ecosystem projects. \
Given a user's prompt, create a comprehensive project template that defines the visual theme, style, and branding elements.\n\n\
The template should include:\n\
- Visual theme and aesthetic direction\n\
- Color palette and mood\n\
- Style characteristics (minimalist, modern, playful, etc.)\n\
- Key visual elements and motifs\n\
- Brand personality and tone\n\
- Target audience and use case\n\n\
This template will be used to generate a set of consistent, themed images for a Farcaster project. \
Focus on creating a cohesive visual identity that works across different image types.\n\n\
Return a detailed template description (150-200 words) that captures the essence of the project.";

/// Outcome of one derivation call. The fallback substitution downstream is an
/// explicit branch on this type, not an exception handler.
#[derive(Debug)]
pub enum Derivation<T> {
    Derived(T),
    UpstreamFailure(String),
    ParseFailure(String),
}

/// The shared template plus the per-variant prompts derived from it.
#[derive(Debug, Clone)]
pub struct StylePlan {
    pub template: String,
    pub prompts: HashMap<ImageVariant, String>,
    /// True when any derivation step fell back to hardcoded content.
    pub degraded: bool,
}

pub struct StylePlanner {
    openai: Arc<OpenAiClient>,
    set: VariantSet,
    cache: Mutex<HashMap<String, Arc<StylePlan>>>,
}

impl StylePlanner {
    pub fn new(openai: Arc<OpenAiClient>, set: VariantSet) -> Self {
        Self {
            openai,
            set,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn variant_set(&self) -> VariantSet {
        self.set
    }

    /// Resolve the style plan for a prompt, deriving it on first use and
    /// serving the cached plan afterwards.
    pub async fn plan(&self, prompt: &str) -> Arc<StylePlan> {
        if let Some(plan) = self.cached(prompt) {
            debug!("style plan cache hit");
            return plan;
        }

        let mut degraded = false;

        let template = match self.derive_template(prompt).await {
            Derivation::Derived(template) => template,
            Derivation::UpstreamFailure(detail) => {
                warn!(%detail, "template derivation failed upstream, using fallback");
                degraded = true;
                fallback_template(prompt)
            }
            Derivation::ParseFailure(detail) => {
                warn!(%detail, "template derivation unparseable, using fallback");
                degraded = true;
                fallback_template(prompt)
            }
        };

        let prompts = match self.derive_prompts(&template).await {
            Derivation::Derived(prompts) => prompts,
            Derivation::UpstreamFailure(detail) => {
                warn!(%detail, "prompt derivation failed upstream, using fallback suffixes");
                degraded = true;
                fallback_prompts(&template, self.set)
            }
            Derivation::ParseFailure(detail) => {
                warn!(%detail, "prompt derivation unparseable, using fallback suffixes");
                degraded = true;
                fallback_prompts(&template, self.set)
            }
        };

        info!(degraded, variants = self.set.len(), "style plan ready");

        let plan = Arc::new(StylePlan {
            template,
            prompts,
            degraded,
        });
        self.store(prompt, plan.clone());
        plan
    }

    async fn derive_template(&self, prompt: &str) -> Derivation<String> {
        let user = format!("User prompt: \"{prompt}\"");
        match self.openai.chat(TEMPLATE_SYSTEM_PROMPT, &user, 0.8, 400).await {
            Ok(content) => Derivation::Derived(content),
            Err(AiError::Empty) => Derivation::ParseFailure("empty completion".to_string()),
            Err(e) => Derivation::UpstreamFailure(e.to_string()),
        }
    }

    async fn derive_prompts(&self, template: &str) -> Derivation<HashMap<ImageVariant, String>> {
        let system = prompt_system(self.set);
        let user = format!("Project template: \"{template}\"");

        let content = match self.openai.chat(&system, &user, 0.7, 800).await {
            Ok(content) => content,
            Err(AiError::Empty) => {
                return Derivation::ParseFailure("empty completion".to_string())
            }
            Err(e) => return Derivation::UpstreamFailure(e.to_string()),
        };

        let stripped = strip_code_fences(&content);
        let raw: HashMap<String, String> = match serde_json::from_str(stripped) {
            Ok(map) => map,
            Err(e) => return Derivation::ParseFailure(format!("invalid JSON: {e}")),
        };

        let mut prompts = HashMap::new();
        for variant in self.set.variants() {
            match raw.get(variant.as_str()) {
                Some(p) if !p.trim().is_empty() => {
                    prompts.insert(*variant, p.trim().to_string());
                }
                _ => {
                    return Derivation::ParseFailure(format!("missing {variant} prompt"));
                }
            }
        }
        Derivation::Derived(prompts)
    }

    fn cached(&self, prompt: &str) -> Option<Arc<StylePlan>> {
        self.cache
            .lock()
            .expect("style plan cache poisoned")
            .get(prompt)
            .cloned()
    }

    fn store(&self, prompt: &str, plan: Arc<StylePlan>) {
        let mut cache = self.cache.lock().expect("style plan cache poisoned");
        if cache.len() >= MAX_CACHED_PLANS {
            cache.clear();
        }
        cache.insert(prompt.to_string(), plan);
    }
}

fn prompt_system(set: VariantSet) -> String {
    let mut listing = String::new();
    for (i, variant) in set.variants().iter().enumerate() {
        listing.push_str(&format!(
            "{}. {}: {}\n",
            i + 1,
            variant.as_str().to_uppercase(),
            variant_brief(*variant)
        ));
    }

    let keys = set
        .variants()
        .iter()
        .map(|v| v.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are a prompt engineering expert for AI image generation, specializing in Farcaster ecosystem content. \
Given a project template, create {count} optimized prompts for different Farcaster use cases:\n\n\
{listing}\n\
Each prompt should:\n\
- Follow the project template's visual theme and style\n\
- Maintain consistency across all {count} images\n\
- Include Farcaster branding elements: purple/blue color schemes, decentralized social media themes\n\
- Be 50-100 words, specific to Farcaster ecosystem\n\
- Include technical details like \"1024x1024 pixels\", \"professional\", \"high quality\"\n\n\
Return ONLY a JSON object with keys: {keys}",
        count = set.len(),
    )
}

fn variant_brief(variant: ImageVariant) -> &'static str {
    match variant {
        ImageVariant::Icon => {
            "Farcaster app icon design (square, minimalist, clean, no text, fills entire frame, purple/blue theme)"
        }
        ImageVariant::Hero => {
            "Farcaster cast promotional banner (landscape, social media visual, eye-catching, engaging)"
        }
        ImageVariant::Og => {
            "Farcaster Open Graph card (shareable, social media optimized, engaging design)"
        }
        ImageVariant::Splash => {
            "Farcaster app loading screen (minimal, clean, centered, calming, purple theme)"
        }
        ImageVariant::Screenshot => {
            "Farcaster mini app screenshot mockup (portrait, app interface preview, clean layout)"
        }
    }
}

/// Deterministic template used when the text-generation call fails.
pub fn fallback_template(prompt: &str) -> String {
    format!(
        "Modern, minimalist design with a focus on clean lines and professional aesthetics. \
The visual theme centers around {prompt} with a sophisticated color palette featuring deep purples, \
electric blues, and subtle gradients. The style emphasizes geometric shapes, contemporary typography, \
and a tech-forward approach that resonates with the Farcaster ecosystem. Key visual elements include \
abstract patterns, subtle animations, and a balance between digital innovation and human connection. \
The brand personality is confident, innovative, and community-focused, targeting decentralized social \
media enthusiasts and blockchain-savvy users."
    )
}

/// Template-plus-suffix prompts used when prompt derivation fails.
pub fn fallback_prompts(template: &str, set: VariantSet) -> HashMap<ImageVariant, String> {
    set.variants()
        .iter()
        .map(|variant| {
            (
                *variant,
                format!("{template}{}", fallback_suffix(*variant)),
            )
        })
        .collect()
}

fn fallback_suffix(variant: ImageVariant) -> &'static str {
    match variant {
        ImageVariant::Icon => {
            ", Farcaster app icon design, square format, minimalist, clean lines, professional, \
centered composition, high contrast, no text, vector-style, modern UI icon, 1024x1024 pixels, \
crisp edges, solid background, icon fills entire frame, purple and blue theme, decentralized social media"
        }
        ImageVariant::Hero => {
            ", Farcaster cast promotional banner design, landscape format, social media visual, \
eye-catching, professional, modern design, high impact, 1024x1024 pixels, vibrant colors, \
engaging composition, purple and blue theme, decentralized social media"
        }
        ImageVariant::Og => {
            ", Farcaster Open Graph card design, social media optimized, shareable visual, \
engaging design, professional, modern, 1024x1024 pixels, high quality, eye-catching, \
purple and blue theme, decentralized social media"
        }
        ImageVariant::Splash => {
            ", Farcaster app loading screen, splash screen design, minimal, clean, centered logo, \
simple background, professional, modern, 1024x1024 pixels, calming colors, elegant, purple theme, \
decentralized social media"
        }
        ImageVariant::Screenshot => {
            ", Farcaster mini app screenshot mockup, portrait orientation, clean interface layout, \
realistic app preview, professional, modern, 1024x1024 pixels, purple and blue theme, \
decentralized social media"
        }
    }
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    match rest.strip_suffix("```") {
        Some(inner) => inner.trim_end(),
        None => rest,
    }
}
