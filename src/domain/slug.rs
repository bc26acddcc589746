//! Page-name normalisation helpers.
//!
//! Two related but distinct transformations live here. [`normalize_page_name`]
//! is applied whenever a page is saved or looked up: it trims the input, turns
//! whitespace runs into hyphens and lowercases the result. [`to_kebab_case`]
//! is used by the "new page" and "page exists" endpoints and splits
//! camel-cased or spaced titles into words, so `XMLHttpRequest` becomes
//! `xml-http-request`.

/// Canonical stored form of a page name.
///
/// Markup in the name is stripped with `ammonia` so the value can be used in
/// links and titles without further escaping.
pub fn normalize_page_name(input: &str) -> String {
    let hyphenated = input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    ammonia::clean(&hyphenated)
}

/// Split `input` into lowercase words joined by `-`.
///
/// Words are runs of ASCII letters and digits: an acronym (two or more
/// capitals not followed by a lowercase letter), a capitalised or lowercase
/// word with optional trailing digits, a lone capital, or a run of digits.
/// Anything else acts as a separator. Input without any word yields an empty
/// string.
pub fn to_kebab_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut words = Vec::new();
    let mut cursor = 0;

    while cursor < chars.len() {
        match next_word(&chars, cursor) {
            Some(end) => {
                words.push(chars[cursor..end].iter().collect::<String>());
                cursor = end;
            }
            None => cursor += 1,
        }
    }

    words.join("-").to_lowercase()
}

/// Human title for a stored page name: hyphens become spaces and every word
/// is capitalised, so `my-trip` reads `My Trip`.
pub fn display_title(name: &str) -> String {
    name.split('-')
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn next_word(chars: &[char], start: usize) -> Option<usize> {
    acronym(chars, start)
        .or_else(|| word(chars, start))
        .or_else(|| is_upper(chars, start).then_some(start + 1))
        .or_else(|| digits(chars, start))
}

fn acronym(chars: &[char], start: usize) -> Option<usize> {
    let mut run_end = start;
    while is_upper(chars, run_end) {
        run_end += 1;
    }

    (start + 2..=run_end).rev().find(|&end| {
        let capitalised_next = is_upper(chars, end) && is_lower(chars, end + 1);
        capitalised_next || at_word_boundary(chars, end)
    })
}

fn word(chars: &[char], start: usize) -> Option<usize> {
    let with_capital = if is_upper(chars, start) {
        lowercase_tail(chars, start + 1)
    } else {
        None
    };
    with_capital.or_else(|| lowercase_tail(chars, start))
}

fn lowercase_tail(chars: &[char], start: usize) -> Option<usize> {
    let mut end = start;
    while is_lower(chars, end) {
        end += 1;
    }
    if end == start {
        return None;
    }
    while is_digit(chars, end) {
        end += 1;
    }
    Some(end)
}

fn digits(chars: &[char], start: usize) -> Option<usize> {
    let mut end = start;
    while is_digit(chars, end) {
        end += 1;
    }
    (end > start).then_some(end)
}

// Only called after a run of capitals, so the preceding char is a word char.
fn at_word_boundary(chars: &[char], index: usize) -> bool {
    chars
        .get(index)
        .is_none_or(|&c| !(c.is_alphanumeric() || c == '_'))
}

fn is_upper(chars: &[char], index: usize) -> bool {
    chars.get(index).is_some_and(char::is_ascii_uppercase)
}

fn is_lower(chars: &[char], index: usize) -> bool {
    chars.get(index).is_some_and(char::is_ascii_lowercase)
}

fn is_digit(chars: &[char], index: usize) -> bool {
    chars.get(index).is_some_and(char::is_ascii_digit)
}
