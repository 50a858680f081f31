// crates/geotiles-core/src/collection/order.rs

//! Numeric-friendly collation for identity codes.
//!
//! Codes are split into digit runs and text runs. Digit runs compare by
//! value ("2" < "10"), text runs compare on their folded form (see
//! [`fold_key`]), and digits sort before letters. Codes that collate equal
//! fall back to plain byte order, so the ordering is total.

use std::cmp::Ordering;

/// Transliterate to ASCII and lowercase (`"Réunion"` -> `"reunion"`).
pub fn fold_key(s: &str) -> String {
    deunicode::deunicode(s).to_lowercase()
}

#[derive(Debug)]
enum Segment<'a> {
    Digits(&'a str),
    Text(String),
}

fn segments(s: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits: Option<bool> = None;
    for (i, ch) in s.char_indices() {
        let d = ch.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != d => {
                out.push(segment(&s[start..i], prev));
                start = i;
            }
            _ => {}
        }
        in_digits = Some(d);
    }
    if let Some(d) = in_digits {
        out.push(segment(&s[start..], d));
    }
    out
}

fn segment(part: &str, digits: bool) -> Segment<'_> {
    if digits {
        Segment::Digits(part)
    } else {
        Segment::Text(fold_key(part))
    }
}

/// Compares digit strings by value without parsing (no overflow).
fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn cmp_segment(a: &Segment<'_>, b: &Segment<'_>) -> Ordering {
    match (a, b) {
        (Segment::Digits(x), Segment::Digits(y)) => cmp_digits(x, y),
        (Segment::Text(x), Segment::Text(y)) => x.cmp(y),
        (Segment::Digits(_), Segment::Text(_)) => Ordering::Less,
        (Segment::Text(_), Segment::Digits(_)) => Ordering::Greater,
    }
}

/// Total order over codes.
pub fn compare_codes(a: &str, b: &str) -> Ordering {
    let sa = segments(a);
    let sb = segments(b);
    for (x, y) in sa.iter().zip(sb.iter()) {
        let ord = cmp_segment(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    sa.len().cmp(&sb.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut v: Vec<&str>) -> Vec<&str> {
        v.sort_by(|a, b| compare_codes(a, b));
        v
    }

    #[test]
    fn numbers_sort_by_value() {
        assert_eq!(sorted(vec!["10", "2", "1"]), vec!["1", "2", "10"]);
    }

    #[test]
    fn corsica_sorts_after_2_before_3() {
        assert_eq!(
            sorted(vec!["21", "2B", "19", "2A", "3", "971"]),
            vec!["2A", "2B", "3", "19", "21", "971"]
        );
    }

    #[test]
    fn leading_zeros_are_tie_broken() {
        assert_eq!(compare_codes("01", "1"), Ordering::Less);
        assert_eq!(compare_codes("01", "02"), Ordering::Less);
    }

    #[test]
    fn letters_fold_before_comparing() {
        assert_eq!(sorted(vec!["FR", "de", "AT"]), vec!["AT", "de", "FR"]);
        assert_eq!(fold_key("Réunion"), "reunion");
    }
}
