//! Name suggestions for unbound-variable diagnostics

/// Edit distance between two names, counted in chars
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return a.len().max(b.len());
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitute = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitute.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Largest distance still worth suggesting for a name of this length
fn max_distance(name: &str) -> usize {
    match name.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

/// Closest candidate to `name`, if any is near enough.
///
/// Ties keep the earliest candidate, so callers should list inner scopes first.
pub fn find_similar_name<'a, I>(name: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let limit = max_distance(name);
    candidates
        .into_iter()
        .filter(|candidate| *candidate != name)
        .map(|candidate| (levenshtein_distance(name, candidate), candidate))
        .filter(|(distance, _)| *distance <= limit)
        .fold(None, |best: Option<(usize, &str)>, (distance, candidate)| match best {
            Some((best_distance, _)) if best_distance <= distance => best,
            _ => Some((distance, candidate)),
        })
        .map(|(_, candidate)| candidate)
}

/// Format a "did you mean" suggestion hint for an unknown name.
pub fn format_suggestion_hint(suggestion: Option<&str>) -> String {
    match suggestion {
        Some(name) => format!("\n  hint: did you mean `{name}`?"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("count", "count"), 0);
        assert_eq!(levenshtein_distance("count", "cont"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("Len", "len"), 1);
    }

    #[test]
    fn test_find_similar_name_prefers_closest() {
        let names = ["total", "totl", "count"];
        assert_eq!(find_similar_name("tota", names), Some("total"));
        assert_eq!(find_similar_name("cout", names), Some("count"));
    }

    #[test]
    fn test_find_similar_name_scales_with_length() {
        // two-letter names never get a suggestion
        assert_eq!(find_similar_name("xs", ["ys"]), None);
        assert_eq!(find_similar_name("lenn", ["len"]), Some("len"));
        assert_eq!(find_similar_name("print", ["input"]), None);
    }

    #[test]
    fn test_find_similar_name_skips_exact_match() {
        assert_eq!(find_similar_name("pop", ["pop"]), None);
    }

    #[test]
    fn test_format_suggestion_hint() {
        assert_eq!(format_suggestion_hint(Some("len")), "\n  hint: did you mean `len`?");
        assert_eq!(format_suggestion_hint(None), "");
    }
}
