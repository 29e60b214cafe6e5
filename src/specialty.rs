use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase and strip accents for lenient comparisons.
///
/// NFKD splits accented letters into base letter + combining mark, and only
/// the marks are dropped. Letters of any script survive.
pub fn normalize(value: &str) -> String {
    value
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

/// Filesystem-safe slug based on normalized text.
pub fn slugify(value: &str) -> String {
    let slug = normalize(value).split_whitespace().collect::<Vec<_>>().join("-");
    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug
    }
}

/// Strict specialty comparison after case and accent folding.
#[derive(Debug, Clone)]
pub struct SpecialtyMatcher {
    requested: String,
    target: String,
}

impl SpecialtyMatcher {
    pub fn new(requested: &str) -> Self {
        Self {
            requested: requested.to_string(),
            target: normalize(requested),
        }
    }

    /// The specialty as the caller typed it.
    pub fn requested(&self) -> &str {
        &self.requested
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        normalize(candidate) == self.target
    }

    pub fn matches(candidate: &str, requested: &str) -> bool {
        normalize(candidate) == normalize(requested)
    }
}
