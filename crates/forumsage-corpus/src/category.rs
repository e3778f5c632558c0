/// Ordered keyword table; the first category with any keyword present in the
/// text wins, so the order here decides overlapping matches.
pub const CATEGORY_TABLE: &[(&str, &[&str])] = &[
    ("extraction", &["extract", "extraction", "distill", "distillation"]),
    ("cultivation", &["grow", "cultivate", "plant", "seed"]),
    ("business", &["business", "legal", "regulation", "license"]),
    ("equipment", &["equipment", "machine", "tool", "device"]),
    ("genetics", &["genetic", "strain", "breed", "hybrid"]),
];

pub const GENERAL: &str = "general";

/// Category label for a piece of thread text (substring match, case-insensitive).
pub fn categorize(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    categorize_lowercase(&lower)
}

pub(crate) fn categorize_lowercase(lower: &str) -> &'static str {
    CATEGORY_TABLE
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(name, _)| *name)
        .unwrap_or(GENERAL)
}
