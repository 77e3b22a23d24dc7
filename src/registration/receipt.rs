//! Stored receipt naming

use chrono::NaiveDateTime;

use crate::types::Registration;

/// Name a verified receipt is stored under:
/// `<registration-id>_<first>_<last>_<yyyyMMdd_HHmmss><ext>`
pub fn stored_receipt_name(registration: &Registration, original_name: &str, at: NaiveDateTime) -> String {
    format!(
        "{}_{}_{}_{}{}",
        registration.id,
        transliterate(&registration.first_name),
        transliterate(&registration.last_name),
        at.format("%Y%m%d_%H%M%S"),
        file_extension(original_name)
    )
}

/// Extension of the uploaded file, lower-cased, defaulting to `.pdf`
pub fn file_extension(original_name: &str) -> String {
    match original_name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < original_name.len() => {
            let ext = &original_name[idx + 1..];
            if ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                format!(".{}", ext.to_ascii_lowercase())
            } else {
                ".pdf".to_string()
            }
        }
        _ => ".pdf".to_string(),
    }
}

/// Transliterate Cyrillic to Latin for file names; anything else that is not
/// a letter or digit becomes `_`, runs of `_` collapse and edges are trimmed
pub fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match cyrillic_to_latin(c) {
            Some(latin) => out.push_str(latin),
            None if c.is_ascii_alphanumeric() => out.push(c),
            None => {
                if !out.ends_with('_') {
                    out.push('_');
                }
            }
        }
    }
    out.trim_matches('_').to_string()
}

#[rustfmt::skip]
fn cyrillic_to_latin(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' => "a", 'б' => "b", 'в' => "v", 'г' => "g", 'д' => "d",
        'е' | 'ё' | 'э' => "e", 'ж' => "zh", 'з' => "z", 'и' => "i",
        'й' | 'ы' => "y", 'к' => "k", 'л' => "l", 'м' => "m", 'н' => "n",
        'о' => "o", 'п' => "p", 'р' => "r", 'с' => "s", 'т' => "t",
        'у' => "u", 'ф' => "f", 'х' => "h", 'ц' => "ts", 'ч' => "ch",
        'ш' => "sh", 'щ' => "sch", 'ю' => "yu", 'я' => "ya",
        'А' => "A", 'Б' => "B", 'В' => "V", 'Г' => "G", 'Д' => "D",
        'Е' | 'Ё' | 'Э' => "E", 'Ж' => "Zh", 'З' => "Z", 'И' => "I",
        'Й' | 'Ы' => "Y", 'К' => "K", 'Л' => "L", 'М' => "M", 'Н' => "N",
        'О' => "O", 'П' => "P", 'Р' => "R", 'С' => "S", 'Т' => "T",
        'У' => "U", 'Ф' => "F", 'Х' => "H", 'Ц' => "Ts", 'Ч' => "Ch",
        'Ш' => "Sh", 'Щ' => "Sch", 'Ю' => "Yu", 'Я' => "Ya",
        // soft and hard signs are dropped
        'ь' | 'ъ' | 'Ь' | 'Ъ' => "",
        _ => return None,
    };
    Some(latin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RegistrationRequest, Role};
    use chrono::NaiveDate;

    #[test]
    fn test_transliterate() {
        assert_eq!(transliterate("Щукин"), "Schukin");
        assert_eq!(transliterate("Анна-Мария"), "Anna_Mariya");
        assert_eq!(transliterate("  Ольга  "), "Olga");
        assert_eq!(transliterate("John"), "John");
        assert_eq!(transliterate("!!!"), "");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("чек.PDF"), ".pdf");
        assert_eq!(file_extension("receipt"), ".pdf");
        assert_eq!(file_extension(".hidden"), ".pdf");
        assert_eq!(file_extension("receipt."), ".pdf");
        assert_eq!(file_extension("a.b/../x"), ".pdf");
    }

    #[test]
    fn test_stored_receipt_name() {
        let request = RegistrationRequest {
            first_name: "Иван".to_string(),
            last_name: "Петров".to_string(),
            ..RegistrationRequest::default()
        };
        let registration = Registration::new(
            request,
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            Role::Teen,
        );
        let at = NaiveDate::from_ymd_opt(2025, 7, 14)
            .unwrap()
            .and_hms_opt(9, 5, 30)
            .unwrap();

        assert_eq!(
            stored_receipt_name(&registration, "Чек по операции.pdf", at),
            format!("{}_Ivan_Petrov_20250714_090530.pdf", registration.id)
        );
    }
}
