use unicode_normalization::UnicodeNormalization;

/// Canonical slug for a free-text name: `"Atlético Madrid"` -> `"atletico-madrid"`.
///
/// The same token is used as the on-disk file stem and as the identity key when matching a
/// team against the home/away fields of a row, so both sides always agree.
pub fn slugify(text: &str) -> String {
    let ascii: String = text.nfkd().filter(char::is_ascii).collect();
    let lower = ascii.to_ascii_lowercase();

    let mut out = String::with_capacity(lower.len());
    let mut pending_sep = false;
    for ch in lower.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            out.push(ch);
        } else if ch == '_' || ch == '-' || ch.is_ascii_whitespace() {
            pending_sep = true;
        }
        // Anything else is punctuation and is dropped without acting as a separator.
    }
    out
}

pub fn normalize_team_name(name: &str) -> String {
    slugify(name)
}

pub fn team_filename(name: &str) -> String {
    format!("{}.csv", slugify(name))
}

/// `"real-madrid"` -> `"Real Madrid"`.
pub fn display_name(slug: &str) -> String {
    slug.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Substring match in either direction between two already-normalized tokens.
/// Empty tokens never match.
pub fn tokens_match(team: &str, field: &str) -> bool {
    if team.is_empty() || field.is_empty() {
        return false;
    }
    field.contains(team) || team.contains(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_strips_accents_and_punctuation() {
        assert_eq!(slugify("Atlético Madrid"), "atletico-madrid");
        assert_eq!(slugify("  São Paulo F.C. "), "sao-paulo-fc");
        assert_eq!(slugify("real_madrid"), "real-madrid");
        assert_eq!(slugify("Brighton & Hove Albion"), "brighton-hove-albion");
        assert_eq!(slugify("--Inter -- Milan--"), "inter-milan");
    }

    #[test]
    fn slugify_empty_input() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("   "), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn slugify_is_idempotent() {
        for raw in ["Real Madrid CF", "Borussia Mönchengladbach", "Paris Saint-Germain", "a__b  c"] {
            let once = slugify(raw);
            assert_eq!(slugify(&once), once);
        }
    }

    #[test]
    fn suffix_variants_match() {
        let short = normalize_team_name("Real Madrid");
        let long = normalize_team_name("Real Madrid CF");
        assert!(long.contains(&short));
        assert!(tokens_match(&short, &long));
        assert!(tokens_match(&long, &short));
        assert!(!tokens_match("", &long));
    }

    #[test]
    fn filename_and_display_name() {
        assert_eq!(team_filename("Manchester United"), "manchester-united.csv");
        assert_eq!(display_name("manchester-united"), "Manchester United");
        assert_eq!(display_name(""), "");
    }
}
