use std::collections::HashMap;

use anyhow::{Result, anyhow};
use isolang::Language;
use once_cell::sync::Lazy;

/// Language utilities for voice profiles
///
/// Speech backends take ISO 639-1 (2-letter) language codes. Configured voices
/// may also use ISO 639-2 (3-letter) codes, which are normalized here.
/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

/// ISO 639-2/B codes that differ from their 639-2/T form
static BIBLIOGRAPHIC_CODES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("fre", "fra"),
        ("ger", "deu"),
        ("dut", "nld"),
        ("gre", "ell"),
        ("chi", "zho"),
        ("cze", "ces"),
        ("ice", "isl"),
        ("alb", "sqi"),
        ("arm", "hye"),
        ("baq", "eus"),
        ("bur", "mya"),
        ("per", "fas"),
        ("geo", "kat"),
        ("may", "msa"),
        ("mac", "mkd"),
        ("rum", "ron"),
        ("slo", "slk"),
        ("wel", "cym"),
    ])
});

fn lookup(code: &str) -> Option<(Language, LanguageCodeType)> {
    let normalized = code.trim().to_lowercase();
    match normalized.len() {
        2 => Language::from_639_1(&normalized).map(|l| (l, LanguageCodeType::Part1)),
        3 => Language::from_639_3(&normalized)
            .map(|l| (l, LanguageCodeType::Part2T))
            .or_else(|| {
                BIBLIOGRAPHIC_CODES
                    .get(normalized.as_str())
                    .and_then(|t| Language::from_639_3(t))
                    .map(|l| (l, LanguageCodeType::Part2B))
            }),
        _ => None,
    }
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    lookup(code)
        .map(|(_, kind)| kind)
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Normalize a language code to the 2-letter form a speech backend expects.
/// Languages without an ISO 639-1 code keep their 639-2/T code.
pub fn normalize_voice_language(code: &str) -> Result<String> {
    let (language, _) = lookup(code).ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;
    Ok(language
        .to_639_1()
        .map(str::to_string)
        .unwrap_or_else(|| language.to_639_3().to_string()))
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let (language, _) = lookup(code).ok_or_else(|| anyhow!("Invalid language code: {}", code))?;
    Ok(language.to_name().to_string())
}

/// Check that a regional variant looks like a domain suffix (`com`, `co.uk`)
pub fn validate_tld(tld: &str) -> Result<()> {
    let valid = !tld.is_empty()
        && tld
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()));
    if valid {
        Ok(())
    } else {
        Err(anyhow!("Invalid regional variant: '{}'", tld))
    }
}
