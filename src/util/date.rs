//! Operator-facing date patterns (`yyyy-MM-dd`, `dd/MMM/yy HH:mm`).
//!
//! Mapping files describe dates with the letter-pattern syntax tracker admins
//! already know. A pattern is translated once into a chrono format string and
//! then used both to parse and to re-render values.
//!
//! chrono accepts unpadded numbers for `%m`, `%d` and friends, so each
//! pattern also compiles to an anchored regex that pins the digit width of
//! two-letter fields (`MM` needs exactly two digits, `M` one or two).

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::fmt::Write as _;

const NAME: &str = r"\p{L}+\.?";
const ZONE: &str = r"(?:Z|[+-]\d{2}(?::?\d{2})?)";

/// What a pattern can resolve to, which decides the chrono parser used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternKind {
    Date,
    DateTime,
    Zoned,
}

#[derive(Debug, Clone)]
struct Compiled {
    format: String,
    kind: PatternKind,
    shape: Regex,
}

/// A compiled date pattern.
#[derive(Debug, Clone)]
pub struct DatePattern {
    source: String,
    compiled: Option<Compiled>,
}

impl PartialEq for DatePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for DatePattern {}

impl DatePattern {
    /// Compile a letter pattern. Unsupported letters leave the pattern
    /// uncompiled, in which case [`Self::normalize`] returns input unchanged.
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        Self {
            source: pattern.to_string(),
            compiled: translate(pattern),
        }
    }

    /// The pattern as written in the mapping file.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The chrono format string, if the pattern could be translated.
    #[must_use]
    pub fn chrono_format(&self) -> Option<&str> {
        self.compiled.as_ref().map(|compiled| compiled.format.as_str())
    }

    /// Parse `raw` with the pattern and render it back with the same pattern.
    ///
    /// Anything that does not parse, or whose fields are not as wide as the
    /// pattern requires, is returned as-is.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        let Some(Compiled { format, kind, shape }) = &self.compiled else {
            return raw.to_string();
        };
        if !shape.is_match(raw) {
            return raw.to_string();
        }

        let rendered = match kind {
            PatternKind::Date => NaiveDate::parse_from_str(raw, format)
                .ok()
                .map(|d| d.format(format).to_string()),
            PatternKind::DateTime => NaiveDateTime::parse_from_str(raw, format)
                .ok()
                .map(|dt| dt.format(format).to_string()),
            PatternKind::Zoned => DateTime::parse_from_str(raw, format)
                .ok()
                .map(|dt| dt.format(format).to_string()),
        };

        rendered.unwrap_or_else(|| raw.to_string())
    }
}

fn translate(pattern: &str) -> Option<Compiled> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut shape = String::from("^");
    let mut kind = PatternKind::Date;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            // Quoted literal; '' is an escaped quote.
            if chars.get(i + 1) == Some(&'\'') {
                push_literal(&mut out, &mut shape, '\'');
                i += 2;
                continue;
            }
            i += 1;
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        push_literal(&mut out, &mut shape, '\'');
                        i += 2;
                        continue;
                    }
                    break;
                }
                push_literal(&mut out, &mut shape, chars[i]);
                i += 1;
            }
            if i >= chars.len() {
                return None;
            }
            i += 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, &mut shape, c);
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&next| next == c).count();
        i += run;

        let (spec, width) = match (c, run) {
            ('y' | 'u', 2) => ("%y", digits(2, 2)),
            ('y' | 'u', _) => ("%Y", format!(r"[+-]?\d{{{},}}", run.min(4))),
            ('M' | 'L', 1) => ("%-m", digits(1, 2)),
            ('M' | 'L', 2) => ("%m", digits(2, 2)),
            ('M' | 'L', 3) => ("%b", NAME.to_string()),
            ('M' | 'L', _) => ("%B", NAME.to_string()),
            ('d', 1) => ("%-d", digits(1, 2)),
            ('d', 2) => ("%d", digits(2, 2)),
            ('D', 1 | 2) => ("%-j", digits(run, 3)),
            ('D', 3) => ("%j", digits(3, 3)),
            ('E', 1..=3) => ("%a", NAME.to_string()),
            ('E', _) => ("%A", NAME.to_string()),
            ('H', 1) => ("%-H", digits(1, 2)),
            ('H', 2) => ("%H", digits(2, 2)),
            ('h', 1) => ("%-I", digits(1, 2)),
            ('h', 2) => ("%I", digits(2, 2)),
            ('a', 1) => ("%p", NAME.to_string()),
            ('m', 1) => ("%-M", digits(1, 2)),
            ('m', 2) => ("%M", digits(2, 2)),
            ('s', 1) => ("%-S", digits(1, 2)),
            ('s', 2) => ("%S", digits(2, 2)),
            ('S', 3) => ("%3f", digits(3, 3)),
            ('S', 6) => ("%6f", digits(6, 6)),
            ('S', 9) => ("%9f", digits(9, 9)),
            ('X' | 'x', 3) => ("%:z", ZONE.to_string()),
            ('X' | 'x', 1 | 2) | ('Z', 1..=3) => ("%z", ZONE.to_string()),
            _ => return None,
        };

        kind = match c {
            'X' | 'x' | 'Z' => PatternKind::Zoned,
            'H' | 'h' | 'a' | 'm' | 's' | 'S' if kind == PatternKind::Date => {
                PatternKind::DateTime
            }
            _ => kind,
        };
        out.push_str(spec);
        shape.push_str(&width);
    }

    if out.is_empty() {
        return None;
    }
    shape.push('$');
    let shape = Regex::new(&shape).ok()?;
    Some(Compiled {
        format: out,
        kind,
        shape,
    })
}

fn digits(min: usize, max: usize) -> String {
    if min == max {
        format!(r"\d{{{min}}}")
    } else {
        format!(r"\d{{{min},{max}}}")
    }
}

fn push_literal(out: &mut String, shape: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        let _ = write!(out, "{c}");
    }
    shape.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_date_round_trips() {
        let pattern = DatePattern::new("yyyy-MM-dd");
        assert_eq!(pattern.chrono_format(), Some("%Y-%m-%d"));
        assert_eq!(pattern.normalize("2024-01-05"), "2024-01-05");
    }

    #[test]
    fn invalid_date_is_returned_unchanged() {
        let pattern = DatePattern::new("yyyy-MM-dd");
        assert_eq!(pattern.normalize("2024-13-99"), "2024-13-99");
        assert_eq!(pattern.normalize("not a date"), "not a date");
        assert_eq!(pattern.normalize(""), "");
    }

    #[test]
    fn two_letter_fields_require_two_digits() {
        let pattern = DatePattern::new("yyyy-MM-dd");
        assert_eq!(pattern.normalize("2024-1-5"), "2024-1-5");
        assert_eq!(pattern.normalize("2024-01-5"), "2024-01-5");
        assert_eq!(pattern.normalize("2024-001-05"), "2024-001-05");

        let time = DatePattern::new("HH:mm");
        assert_eq!(time.chrono_format(), Some("%H:%M"));
        assert_eq!(time.normalize("9:30"), "9:30");
    }

    #[test]
    fn single_letter_fields_normalize_padding() {
        let pattern = DatePattern::new("d/M/yyyy");
        assert_eq!(pattern.normalize("05/01/2024"), "5/1/2024");
    }

    #[test]
    fn month_names_and_quoted_literals() {
        let pattern = DatePattern::new("dd MMM yyyy 'at' HH:mm");
        assert_eq!(pattern.chrono_format(), Some("%d %b %Y at %H:%M"));
        assert_eq!(
            pattern.normalize("07 Mar 2024 at 09:30"),
            "07 Mar 2024 at 09:30"
        );
    }

    #[test]
    fn zoned_timestamps_keep_offset() {
        let pattern = DatePattern::new("yyyy-MM-dd'T'HH:mm:ss.SSSZ");
        assert_eq!(
            pattern.normalize("2024-02-01T10:15:00.000+0100"),
            "2024-02-01T10:15:00.000+0100"
        );
    }

    #[test]
    fn unsupported_letters_leave_values_untouched() {
        let pattern = DatePattern::new("yyyy-ww");
        assert_eq!(pattern.chrono_format(), None);
        assert_eq!(pattern.normalize("2024-05"), "2024-05");
    }

    #[test]
    fn percent_is_escaped() {
        let pattern = DatePattern::new("yyyy%MM");
        assert_eq!(pattern.chrono_format(), Some("%Y%%%m"));
        assert_eq!(pattern.normalize("2024%03"), "2024%03");
    }

    #[test]
    fn unterminated_quote_is_rejected() {
        assert_eq!(DatePattern::new("yyyy 'oops").chrono_format(), None);
    }
}
