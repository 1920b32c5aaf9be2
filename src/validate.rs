//! # Content validation
//! Rejection rules for generated digest prose. Each rule is an independent
//! predicate over the text; rules are combined by "any match rejects".
//!
//! The built-in groups mirror the kinds of failures seen in LLM-written
//! recommendation copy: fabricated attributions ("researchers at MIT"),
//! generic marketing filler ("worth exploring"), placeholder link text
//! ("click here"), and dense speculative hedging. A JSON config file can
//! replace the built-in phrase lists.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_VALIDATION_CONFIG_PATH: &str = "config/validation.json";
pub const ENV_VALIDATION_CONFIG_PATH: &str = "VALIDATION_CONFIG_PATH";

/// One reason a piece of text was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub rule: String,
    pub matched: String,
}

/// A single validation predicate. `None` means the text passes this rule.
pub trait ContentRule: Send + Sync {
    fn name(&self) -> &str;
    fn check(&self, text: &str) -> Option<Violation>;
}

/// Case- and whitespace-insensitive "contains any of these phrases".
pub struct PhraseRule {
    name: String,
    phrases: Vec<String>,
}

impl PhraseRule {
    pub fn new(name: &str, phrases: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            phrases: phrases.iter().map(|p| normalize(p)).collect(),
        }
    }
}

impl ContentRule for PhraseRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, text: &str) -> Option<Violation> {
        let t = normalize(text);
        for phrase in &self.phrases {
            if !phrase.is_empty() && t.contains(phrase.as_str()) {
                return Some(Violation {
                    rule: self.name.clone(),
                    matched: phrase.clone(),
                });
            }
        }
        None
    }
}

/// Regex-backed rule for patterns plain phrases cannot express
/// (e.g. "300% returns").
pub struct RegexRule {
    name: String,
    re: Regex,
}

impl RegexRule {
    pub fn new(name: &str, pattern: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            re: Regex::new(pattern).with_context(|| format!("compiling rule pattern {pattern}"))?,
        })
    }
}

impl ContentRule for RegexRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, text: &str) -> Option<Violation> {
        self.re.find(&normalize(text)).map(|m| Violation {
            rule: self.name.clone(),
            matched: m.as_str().to_string(),
        })
    }
}

/// Hedging density: a single "likely" is fine, a pile-up of distinct hedge
/// words reads as guesswork and is rejected.
pub struct SpeculationRule {
    name: String,
    words: Vec<String>,
    max_hits: usize,
}

impl SpeculationRule {
    pub fn new(name: &str, words: Vec<String>, max_hits: usize) -> Self {
        Self {
            name: name.to_string(),
            words: words.iter().map(|w| normalize(w)).collect(),
            max_hits: max_hits.max(1),
        }
    }
}

impl ContentRule for SpeculationRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, text: &str) -> Option<Violation> {
        let t = normalize(text);
        let hits: Vec<&str> = self
            .words
            .iter()
            .filter(|w| !w.is_empty() && t.contains(w.as_str()))
            .map(String::as_str)
            .collect();
        if hits.len() >= self.max_hits {
            return Some(Violation {
                rule: self.name.clone(),
                matched: hits.join(", "),
            });
        }
        None
    }
}

fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_space = false;
    for ch in input.chars() {
        let lc = ch.to_ascii_lowercase();
        if lc.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(lc);
            last_space = false;
        }
    }
    out.trim().to_string()
}

// --- config file shape ---

#[derive(Debug, Default, Deserialize)]
struct ValidationConfig {
    #[serde(default)]
    banned_phrases: Vec<String>,
    #[serde(default)]
    fabrication_indicators: Vec<String>,
    #[serde(default)]
    url_placeholders: Vec<String>,
    #[serde(default)]
    speculative: Option<SpeculativeConfig>,
}

#[derive(Debug, Deserialize)]
struct SpeculativeConfig {
    words: Vec<String>,
    #[serde(default = "default_max_hits")]
    max_hits: usize,
}

fn default_max_hits() -> usize {
    3
}

/// The combined rule set. Apply with [`Validator::verdict`]; any violation
/// rejects.
pub struct Validator {
    rules: Vec<Box<dyn ContentRule>>,
}

impl Validator {
    pub fn with_rules(rules: Vec<Box<dyn ContentRule>>) -> Self {
        Self { rules }
    }

    /// Compiled-in defaults; a trimmed version of the phrase lists the
    /// original rule file shipped with.
    pub fn builtin() -> Self {
        let banned = [
            "could be relevant",
            "might interest you",
            "as someone interested in",
            "might be useful",
            "worth exploring",
            "could provide valuable insights",
            "might be interesting",
            "great opportunity to",
            "game-changer for",
            "worth checking out",
            "could revolutionize",
            "could streamline",
            "potentially enhance",
            "could transform",
            "this is perfect for",
        ];
        let fabrication = [
            "researchers at mit",
            "researchers at stanford",
            "researchers at iit",
            "scientists at",
            "early adopters report",
            "users report",
            "developers say",
            "according to users",
            "studies show",
            "research indicates",
            "what appears to be",
            "appears to use",
            "seems to be using",
            "based on your commit history",
            "your workflow likely",
            "hosting virtual workshops",
        ];
        let placeholders = [
            "click here",
            "visit the website",
            "visit the official",
            "registration link",
            "more details here",
        ];
        let speculative = [
            "likely", "probably", "potentially", "presumably", "conceivably", "possibly",
            "perhaps", "might be", "could be",
        ];

        let to_vec = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let rules: Vec<Box<dyn ContentRule>> = vec![
            Box::new(PhraseRule::new("banned-phrase", to_vec(&banned))),
            Box::new(PhraseRule::new("fabrication-indicator", to_vec(&fabrication))),
            Box::new(PhraseRule::new("url-placeholder", to_vec(&placeholders))),
            Box::new(SpeculationRule::new(
                "speculative-language",
                to_vec(&speculative),
                3,
            )),
        ];
        Self::with_rules(rules)
    }

    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading validation config {}", path.as_ref().display()))?;
        let cfg: ValidationConfig =
            serde_json::from_str(&raw).context("parsing validation config")?;

        let mut rules: Vec<Box<dyn ContentRule>> = Vec::new();
        if !cfg.banned_phrases.is_empty() {
            rules.push(Box::new(PhraseRule::new("banned-phrase", cfg.banned_phrases)));
        }
        if !cfg.fabrication_indicators.is_empty() {
            rules.push(Box::new(PhraseRule::new(
                "fabrication-indicator",
                cfg.fabrication_indicators,
            )));
        }
        if !cfg.url_placeholders.is_empty() {
            rules.push(Box::new(PhraseRule::new("url-placeholder", cfg.url_placeholders)));
        }
        if let Some(hedging) = cfg.speculative {
            rules.push(Box::new(SpeculationRule::new(
                "speculative-language",
                hedging.words,
                hedging.max_hits,
            )));
        }
        Ok(Self::with_rules(rules))
    }

    /// Config file via `$VALIDATION_CONFIG_PATH`, then the default path,
    /// then the compiled-in rules.
    pub fn load_default() -> Self {
        let path = std::env::var(ENV_VALIDATION_CONFIG_PATH)
            .unwrap_or_else(|_| DEFAULT_VALIDATION_CONFIG_PATH.to_string());
        if Path::new(&path).exists() {
            match Self::from_config_file(&path) {
                Ok(v) => return v,
                Err(e) => {
                    warn!(path = %path, error = %e, "validation config unusable; using built-in rules");
                }
            }
        }
        Self::builtin()
    }

    /// All violations across all rules, in rule order.
    pub fn verdict(&self, text: &str) -> Vec<Violation> {
        self.rules.iter().filter_map(|r| r.check(text)).collect()
    }

    pub fn rejects(&self, text: &str) -> bool {
        !self.verdict(text).is_empty()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}
