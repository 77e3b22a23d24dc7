//! Scanning receipt text for monetary amounts
//!
//! Receipts print amounts in several local styles (`500`, `500,00`,
//! `1 500.00`, `1.500,00`, `1'500`). Every numeric token in the text is
//! parsed into a [`BigDecimal`] so the comparison with the expected amount
//! is a value comparison rather than a string search.

use bigdecimal::BigDecimal;
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

/// A run of digits with optional internal `.`, `,` or `'` separators.
static NUMBER_CHUNK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:['.,]\d+)*").expect("number chunk regex is valid"));

/// A three-digit group, optionally closed by a one or two digit fraction.
static GROUP_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3}(?:[.,]\d{1,2})?$").expect("group tail regex is valid"));

/// A numeric token found in the text
#[derive(Debug, Clone, PartialEq)]
pub struct AmountToken {
    /// Token as printed
    pub raw: String,
    /// Parsed value
    pub value: BigDecimal,
}

/// Find every numeric token in `text` that parses as an amount
///
/// Chunks separated by a single space are joined when they form a
/// thousands grouping (`1 500,00`, `12 345 678`). The joined token comes
/// first, followed by each group on its own: a short number printed just
/// before the amount (`стр. 2 500 руб`) looks exactly like a grouping.
pub fn scan_amounts(text: &str) -> Vec<AmountToken> {
    let chunks: Vec<_> = NUMBER_CHUNK.find_iter(text).collect();
    let mut tokens = Vec::new();

    let mut i = 0;
    while i < chunks.len() {
        let first = i;
        let mut joined = chunks[i].as_str().to_string();
        i += 1;

        if is_group_leader(&joined) {
            while i < chunks.len()
                && &text[chunks[i - 1].end()..chunks[i].start()] == " "
                && GROUP_TAIL.is_match(chunks[i].as_str())
            {
                let tail = chunks[i].as_str();
                joined.push_str(tail);
                i += 1;
                if tail.len() > 3 {
                    // fraction closes the number
                    break;
                }
            }
        }

        let group = &chunks[first..i];
        if let Some(value) = parse_amount(&joined) {
            tokens.push(AmountToken {
                raw: text[group[0].start()..group[group.len() - 1].end()].to_string(),
                value,
            });
        }
        if group.len() > 1 {
            tokens.extend(group.iter().filter_map(|chunk| {
                parse_amount(chunk.as_str()).map(|value| AmountToken {
                    raw: chunk.as_str().to_string(),
                    value,
                })
            }));
        }
    }

    tokens
}

/// Whether `text` contains a token equal in value to `expected`
pub fn find_amount<'a>(tokens: &'a [AmountToken], expected: &BigDecimal) -> Option<&'a AmountToken> {
    tokens.iter().find(|token| &token.value == expected)
}

fn is_group_leader(chunk: &str) -> bool {
    (1..=3).contains(&chunk.len()) && chunk.chars().all(|c| c.is_ascii_digit())
}

/// Parse one chunk (`500`, `500,00`, `1,500.00`, `1.500,00`, `1'500`)
///
/// The last `.` or `,` is a decimal mark when it is followed by one or two
/// digits and differs from every other separator in the chunk. Everything
/// left of it must be a valid thousands grouping.
pub fn parse_amount(chunk: &str) -> Option<BigDecimal> {
    if chunk.is_empty() {
        return None;
    }

    let last_sep = chunk.char_indices().rfind(|(_, c)| !c.is_ascii_digit());
    let Some((sep_idx, sep)) = last_sep else {
        return BigDecimal::from_str(chunk).ok();
    };

    let fraction = &chunk[sep_idx + 1..];
    let integer = &chunk[..sep_idx];
    let decimal_mark = matches!(sep, '.' | ',')
        && (1..=2).contains(&fraction.len())
        && !integer.contains(sep);

    if decimal_mark {
        let whole = grouped_integer(integer)?;
        return BigDecimal::from_str(&format!("{}.{}", whole, fraction)).ok();
    }

    let whole = grouped_integer(chunk)?;
    BigDecimal::from_str(&whole).ok()
}

/// Strip a single kind of thousands separator, checking group widths
fn grouped_integer(value: &str) -> Option<String> {
    let mut separators = value.chars().filter(|c| !c.is_ascii_digit());
    let Some(sep) = separators.next() else {
        return (!value.is_empty()).then(|| value.to_string());
    };
    if separators.any(|c| c != sep) {
        return None;
    }

    let mut groups = value.split(sep);
    let leader = groups.next()?;
    if !(1..=3).contains(&leader.len()) {
        return None;
    }

    let mut digits = leader.to_string();
    for group in groups {
        if group.len() != 3 {
            return None;
        }
        digits.push_str(group);
    }
    Some(digits)
}
