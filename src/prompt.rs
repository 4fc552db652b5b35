//! Prompt enrichment: style phrases, quality descriptors and suggestions.

use rand::seq::SliceRandom;
use rand::Rng;

/// Style applied when a request does not name one.
pub const DEFAULT_STYLE: &str = "cinematic";

/// Known style keys and the phrase each appends to a prompt.
pub const STYLES: [(&str, &str); 12] = [
    (
        "cinematic",
        "cinematic photography, professional, dramatic composition",
    ),
    ("sci-fi", "futuristic sci-fi aesthetic, cyberpunk, neon lights"),
    ("fantasy", "magical fantasy atmosphere, enchanting, mystical"),
    ("noir", "film noir style, dramatic shadows, high contrast"),
    ("anime", "anime art style, vibrant colors, detailed"),
    ("cartoon", "cartoon illustration, playful, colorful"),
    ("documentary", "realistic documentary photography, natural"),
    ("horror", "dark horror atmosphere, eerie, suspenseful"),
    ("comedy", "bright and cheerful, funny, lighthearted"),
    ("drama", "dramatic with emotional depth, intense"),
    ("action", "dynamic action, energy, movement"),
    ("thriller", "thriller atmosphere, suspenseful"),
];

/// Descriptors appended by [`enhance`], in order.
pub const ENHANCEMENTS: [&str; 6] = [
    "highly detailed",
    "professional photography",
    "dramatic lighting",
    "vibrant colors",
    "8k resolution",
    "masterpiece",
];

/// Pool that [`suggest`] draws from.
pub const SUGGESTION_POOL: [&str; 6] = [
    "Add dramatic lighting effects",
    "Include vibrant color palette",
    "Enhance with cinematic composition",
    "Add atmospheric details",
    "Increase visual depth",
    "Include realistic textures",
];

/// Number of suggestions returned per call.
pub const SUGGESTION_COUNT: usize = 3;

/// Returns the phrase for a style key, or `""` for unknown keys.
///
/// Keys are matched exactly; `"Noir"` is not `"noir"`.
pub fn style_description(style: &str) -> &'static str {
    STYLES
        .iter()
        .find(|(key, _)| *key == style)
        .map(|(_, description)| *description)
        .unwrap_or("")
}

/// Builds the prompt sent to the provider: `"{prompt}. {style phrase}"`.
pub fn enrich(prompt: &str, style: &str) -> String {
    format!("{}. {}", prompt, style_description(style))
}

/// Appends the fixed quality descriptors to a prompt.
pub fn enhance(prompt: &str) -> String {
    format!("{}, {}", prompt, ENHANCEMENTS.join(", "))
}

/// Draws [`SUGGESTION_COUNT`] distinct entries from [`SUGGESTION_POOL`].
pub fn suggest<R: Rng + ?Sized>(rng: &mut R) -> Vec<&'static str> {
    SUGGESTION_POOL
        .choose_multiple(rng, SUGGESTION_COUNT)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_every_known_style_has_a_phrase() {
        let expected = [
            "cinematic",
            "sci-fi",
            "fantasy",
            "noir",
            "anime",
            "cartoon",
            "documentary",
            "horror",
            "comedy",
            "drama",
            "action",
            "thriller",
        ];
        for key in expected {
            assert!(!style_description(key).is_empty(), "{key} has no phrase");
        }

        let keys: HashSet<_> = STYLES.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, expected.into_iter().collect::<HashSet<_>>());
    }

    #[test]
    fn test_unknown_style_is_empty() {
        assert_eq!(style_description("watercolor"), "");
        assert_eq!(style_description(""), "");
        assert_eq!(style_description("NOIR"), "");
    }

    #[test]
    fn test_enrich_noir() {
        assert_eq!(
            enrich("a cat", "noir"),
            "a cat. film noir style, dramatic shadows, high contrast"
        );
    }

    #[test]
    fn test_enrich_unknown_style_keeps_separator() {
        assert_eq!(enrich("a cat", "watercolor"), "a cat. ");
    }

    #[test]
    fn test_enrich_default_style() {
        assert_eq!(
            enrich("city at night", DEFAULT_STYLE),
            "city at night. cinematic photography, professional, dramatic composition"
        );
    }

    #[test]
    fn test_enhance_is_deterministic() {
        let expected = "a cat, highly detailed, professional photography, dramatic lighting, \
                        vibrant colors, 8k resolution, masterpiece";
        assert_eq!(enhance("a cat"), expected);
        assert_eq!(enhance("a cat"), enhance("a cat"));
    }

    #[test]
    fn test_enhance_empty_prompt() {
        assert!(enhance("").starts_with(", highly detailed"));
    }

    #[test]
    fn test_suggest_draws_three_distinct_from_pool() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let picked = suggest(&mut rng);
            assert_eq!(picked.len(), SUGGESTION_COUNT);

            let unique: HashSet<_> = picked.iter().collect();
            assert_eq!(unique.len(), SUGGESTION_COUNT);
            assert!(picked.iter().all(|s| SUGGESTION_POOL.contains(s)));
        }
    }

    #[test]
    fn test_suggest_is_reproducible_with_seed() {
        let a = suggest(&mut StdRng::seed_from_u64(42));
        let b = suggest(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
