/// Compile a regex literal once and hand out a `&'static Regex`.
///
/// Every pattern used by the normalizer is a literal, so a failed compile is a
/// programming error caught by the first test that touches it.
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> = once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}
