//! Display-name to record-key conversion.
//!
//! Every place that turns a mapping display name into a flat-record key goes
//! through [`to_camel_case`], so keys written by flattening and CSV ingestion
//! are the keys read back by reconstruction and the sync decision.

/// Convert a human-readable field name into a camelCase record key.
///
/// Whitespace, `-` and `_` separate words and are dropped. The first word
/// starts lower-case, every following word starts upper-case, and the rest
/// of each word is kept as written. A word made only of ASCII capitals and
/// digits (`ID`, `SLA`) is an acronym and is folded to `Id`/`Sla` first;
/// words carrying punctuation, like `(SP)`, are left alone.
///
/// ```
/// use ticket_bridge::util::to_camel_case;
///
/// assert_eq!(to_camel_case("Issue Key"), "issueKey");
/// assert_eq!(to_camel_case("External Linking ID"), "externalLinkingId");
/// ```
#[must_use]
pub fn to_camel_case(display_name: &str) -> String {
    let mut out = String::with_capacity(display_name.len());

    let words = display_name
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|word| !word.is_empty());

    for word in words {
        let mut chars = word.chars();
        let Some(first) = chars.next() else {
            continue;
        };
        if out.is_empty() {
            out.extend(first.to_lowercase());
        } else {
            out.extend(first.to_uppercase());
        }

        let rest = chars.as_str();
        if is_acronym(word) {
            out.extend(rest.chars().flat_map(char::to_lowercase));
        } else {
            out.push_str(rest);
        }
    }

    out
}

fn is_acronym(word: &str) -> bool {
    word.len() > 1
        && word.chars().any(|c| c.is_ascii_uppercase())
        && word
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}
