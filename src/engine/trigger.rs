//! Text normalization and mention shape scanning.
//!
//! Interaction partners arrive as free text: "Aspirin (cardioprotective)",
//! "Antacids/Iron/Calcium", "Calcium and iron supplements", "NSAIDs". Before
//! any lookup this module turns such text into a canonical key and classifies
//! its coarse shape so the resolver knows which strategies apply.
//!
//! The scan produces two kinds of signals:
//!
//! - **Normalized keys** (`normalize`): case-folded, trimmed, whitespace
//!   collapsed, parenthetical qualifiers removed. Catalog aliases are indexed
//!   under the same key, so exact lookup is a plain map hit.
//! - **Shape** (`MentionShape`): cheap booleans such as "contains a slash" or
//!   "ends like a plural". Compound splitting is only attempted when the shape
//!   says the text has separators.
//!
//! ## Design notes
//!
//! - Case folding uses `to_lowercase()` (Unicode aware); brand names in the
//!   catalog are not guaranteed to be ASCII.
//! - Phrase keys (`phrase_key`) are stricter than normalized keys: every
//!   non-alphanumeric character becomes a space. They are used for
//!   contraindication matching, where "kidney disease" must match
//!   "Severe kidney disease (eGFR < 30)" on word boundaries.

bitflags::bitflags! {
    /// Coarse shape of a partner text.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MentionShape: u8 {
        /// Contains a parenthetical qualifier, e.g. "(cardioprotective)".
        const HAS_QUALIFIER   = 1 << 0;
        const HAS_SLASH       = 1 << 1;
        const HAS_COMMA       = 1 << 2;
        /// Contains a standalone "and" or "&".
        const HAS_CONJUNCTION = 1 << 3;
        /// Last word ends in a plural-looking "s" ("NSAIDs", "Statins").
        const PLURALISH       = 1 << 4;
    }
}

impl MentionShape {
    const SEPARATORS: MentionShape =
        MentionShape::HAS_SLASH.union(MentionShape::HAS_COMMA).union(MentionShape::HAS_CONJUNCTION);

    /// Scan raw partner text. Qualifiers are detected on the raw text; the
    /// remaining bits describe what is left once qualifiers are stripped.
    pub fn scan(text: &str) -> Self {
        let mut shape = MentionShape::empty();

        if text.contains(['(', ')']) {
            shape |= MentionShape::HAS_QUALIFIER;
        }

        let key = normalize(text);
        if key.contains('/') {
            shape |= MentionShape::HAS_SLASH;
        }
        if key.contains(',') {
            shape |= MentionShape::HAS_COMMA;
        }
        if regex!(r"(?:^|\s)(?:and|&)(?:\s|$)").is_match(&key) {
            shape |= MentionShape::HAS_CONJUNCTION;
        }
        if key.split_whitespace().last().and_then(singular).is_some() {
            shape |= MentionShape::PLURALISH;
        }

        shape
    }

    /// True when the text may name several partners at once.
    pub fn is_compound(self) -> bool {
        self.intersects(Self::SEPARATORS)
    }
}

/// Canonical lookup key: parenthetical qualifiers removed, case-folded,
/// trimmed, internal whitespace collapsed to single spaces.
///
/// Qualifiers may nest. An unclosed `(` runs to the end of the text and a
/// stray `)` is dropped. When stripping qualifiers would leave nothing (the
/// whole text is a parenthetical), the qualifier content is kept instead.
///
/// ```text
/// "  Aspirin (cardioprotective) " ──▶ "aspirin"
/// "Aspirin (low dose (81 mg))"    ──▶ "aspirin"
/// "Grapefruit   JUICE"           ──▶ "grapefruit juice"
/// "(alcohol)"                     ──▶ "alcohol"
/// ```
pub fn normalize(text: &str) -> String {
    let key = collapse(&strip_qualifiers(text).to_lowercase());
    if key.is_empty() { collapse(&text.replace(['(', ')'], " ").to_lowercase()) } else { key }
}

/// Text outside any parentheses, with every bracket and qualifier replaced
/// by a space.
fn strip_qualifiers(text: &str) -> String {
    let mut depth = 0usize;
    text.chars()
        .map(|c| match c {
            '(' => {
                depth += 1;
                ' '
            }
            ')' => {
                depth = depth.saturating_sub(1);
                ' '
            }
            _ if depth > 0 => ' ',
            _ => c,
        })
        .collect()
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a normalized key on `/`, `,`, `&` and a standalone "and".
///
/// Fragments without a letter or digit are dropped, so "a / , b" and
/// "a/--/b" both yield `["a", "b"]`.
pub(crate) fn split_compound(key: &str) -> Vec<String> {
    regex!(r"\s*(?:/|,|&|\band\b)\s*")
        .split(key)
        .map(str::trim)
        .filter(|part| !substance_slug(part).is_empty())
        .map(str::to_string)
        .collect()
}

/// Strip one plural "s" from the end of `key`.
///
/// Words ending in "ss" and words of three bytes or fewer are left alone.
pub(crate) fn singular(key: &str) -> Option<&str> {
    if key.len() > 3 && key.ends_with('s') && !key.ends_with("ss") { Some(&key[..key.len() - 1]) } else { None }
}

/// Opaque substance label: the normalized key with every run of
/// non-alphanumeric characters turned into a single `-`.
///
/// ```text
/// "grapefruit juice"          ──▶ "grapefruit-juice"
/// "potassium-sparing diuretics" ──▶ "potassium-sparing-diuretics"
/// ```
pub(crate) fn substance_slug(key: &str) -> String {
    regex!(r"[^\p{L}\p{N}]+").replace_all(key, "-").trim_matches('-').to_string()
}

/// Word-boundary phrase key: case-folded, every non-alphanumeric character
/// replaced by a space, whitespace collapsed.
pub fn phrase_key(text: &str) -> String {
    collapse(&regex!(r"[^\p{L}\p{N}]+").replace_all(&text.to_lowercase(), " "))
}

/// True when `needle` occurs in `haystack` as a whole-word phrase.
///
/// Both arguments must already be phrase keys. An empty needle never matches.
pub fn contains_phrase(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    format!(" {haystack} ").contains(&format!(" {needle} "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_examples() {
        let cases: Vec<(&str, &str)> = vec![
            ("Warfarin", "warfarin"),
            ("  Warfarin  ", "warfarin"),
            ("Aspirin (cardioprotective)", "aspirin"),
            ("Grapefruit   JUICE", "grapefruit juice"),
            ("Statins (simvastatin, atorvastatin)", "statins"),
            ("(alcohol)", "alcohol"),
            ("Antacids/Iron/Calcium", "antacids/iron/calcium"),
            ("Vitamin K\tfoods", "vitamin k foods"),
            ("Aspirin (low dose (81 mg))", "aspirin"),
            ("Aspirin (cardioprotective", "aspirin"),
            ("Aspirin) (daily)", "aspirin"),
            ("Iron (oral) supplements", "iron supplements"),
            ("((alcohol))", "alcohol"),
        ];

        for (input, expected) in cases {
            assert_eq!(normalize(input), expected, "input: {input:?}");
        }
    }

    #[test]
    fn split_compound_examples() {
        assert_eq!(split_compound("antacids/iron/calcium"), vec!["antacids", "iron", "calcium"]);
        assert_eq!(split_compound("calcium and iron supplements"), vec!["calcium", "iron supplements"]);
        assert_eq!(split_compound("ssris, snris & maois"), vec!["ssris", "snris", "maois"]);
        assert_eq!(split_compound("potassium-sparing diuretics"), vec!["potassium-sparing diuretics"]);
        // "and" inside a word is not a separator
        assert_eq!(split_compound("mandelamine"), vec!["mandelamine"]);
        assert_eq!(split_compound("alcohol/--/iron"), vec!["alcohol", "iron"]);
    }

    #[test]
    fn shape_scan_flags() {
        let shape = MentionShape::scan("Aspirin (cardioprotective)");
        assert!(shape.contains(MentionShape::HAS_QUALIFIER));
        assert!(!shape.is_compound());

        assert!(MentionShape::scan("Antacids/Iron/Calcium").contains(MentionShape::HAS_SLASH));
        assert!(MentionShape::scan("Calcium and iron supplements").contains(MentionShape::HAS_CONJUNCTION));
        assert!(MentionShape::scan("NSAIDs").contains(MentionShape::PLURALISH));
        assert!(!MentionShape::scan("Candesartan").is_compound());

        // separators inside a qualifier do not make the mention compound
        assert!(!MentionShape::scan("Statins (simvastatin, atorvastatin)").is_compound());
        assert!(!MentionShape::scan("Aspirin (low dose (81 mg, daily))").is_compound());
        assert!(MentionShape::scan("Aspirin (cardioprotective").contains(MentionShape::HAS_QUALIFIER));
    }

    #[test]
    fn singular_is_conservative() {
        assert_eq!(singular("nsaids"), Some("nsaid"));
        assert_eq!(singular("statins"), Some("statin"));
        assert_eq!(singular("grass"), None);
        assert_eq!(singular("ios"), None);
    }

    #[test]
    fn substance_slugs() {
        assert_eq!(substance_slug("grapefruit juice"), "grapefruit-juice");
        assert_eq!(substance_slug("vitamin k foods"), "vitamin-k-foods");
        assert_eq!(substance_slug("potassium-sparing diuretics"), "potassium-sparing-diuretics");
        assert_eq!(substance_slug("alcohol"), "alcohol");
    }

    #[test]
    fn phrase_matching_respects_word_boundaries() {
        let text = phrase_key("Severe kidney disease (eGFR < 30)");
        assert_eq!(text, "severe kidney disease egfr 30");
        assert!(contains_phrase(&text, &phrase_key("Kidney Disease")));
        assert!(!contains_phrase(&text, &phrase_key("kidney dis")));
        assert!(!contains_phrase(&text, ""));
    }
}
