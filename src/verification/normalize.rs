//! Text normalization and substring matching over extracted receipt text

/// Normalize text for matching: lowercase, `ё` folded to `е`, underscores
/// and whitespace runs collapsed to a single space, typographic quotes
/// folded to `"`.
pub fn normalize_text(raw: &str) -> String {
    let mut folded = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '_' => folded.push(' '),
            'ё' | 'Ё' => folded.push('е'),
            '«' | '»' | '“' | '”' | '„' => folded.push('"'),
            _ => folded.extend(c.to_lowercase()),
        }
    }

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether normalized `text` contains any of the variants (normalized on the fly)
pub fn contains_any_variant<'a, I>(text: &str, variants: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    variants
        .into_iter()
        .find(|variant| {
            let needle = normalize_text(variant);
            !needle.is_empty() && text.contains(&needle)
        })
        .map(String::as_str)
}

/// Whether `text` contains `digits` as a whole digit run, i.e. not as
/// part of a longer number
pub fn contains_digit_run(text: &str, digits: &str) -> bool {
    if digits.is_empty() {
        return false;
    }

    text.match_indices(digits).any(|(start, matched)| {
        let end = start + matched.len();
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        !before.is_some_and(|c| c.is_ascii_digit()) && !after.is_some_and(|c| c.is_ascii_digit())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace_and_case() {
        assert_eq!(
            normalize_text("  ПАО\u{a0}СБЕРБАНК\r\n\tИНН  6453041398 "),
            "пао сбербанк инн 6453041398"
        );
    }

    #[test]
    fn test_normalize_folds_underscores_quotes_and_yo() {
        assert_eq!(
            normalize_text("ЦЕРКОВЬ_СЛОВО_ЖИЗНИ_SBP"),
            "церковь слово жизни sbp"
        );
        assert_eq!(
            normalize_text("Церковь «Слово Жизни»"),
            "церковь \"слово жизни\""
        );
        assert_eq!(normalize_text("Пётр"), "петр");
    }

    #[test]
    fn test_contains_any_variant() {
        let text = normalize_text("Получатель: Церковь Слово Жизни, Саратов");
        let variants = vec!["ЦЕРКОВЬ СЛОВО ЖИЗНИ".to_string(), "other".to_string()];
        assert_eq!(
            contains_any_variant(&text, &variants),
            Some("ЦЕРКОВЬ СЛОВО ЖИЗНИ")
        );

        let missing = vec!["Сбербанк".to_string()];
        assert_eq!(contains_any_variant(&text, &missing), None);
    }

    #[test]
    fn test_contains_digit_run_respects_boundaries() {
        assert!(contains_digit_run("инн 6453041398 кпп", "6453041398"));
        assert!(contains_digit_run("инн:6453041398", "6453041398"));
        assert!(!contains_digit_run("счет 164530413981", "6453041398"));
        assert!(contains_digit_run("164530413981 и 6453041398", "6453041398"));
        assert!(!contains_digit_run("anything", ""));
    }
}
