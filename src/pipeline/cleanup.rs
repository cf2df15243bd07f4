//! Clean-up: deterministic tidying of normalized contact fields.
//!
//! The service returns text exactly as printed on the card, which often
//! includes line breaks inside addresses, stray zero-width characters from
//! the recogniser, and phone fields such as `"Tel: +1 (555) 123-4567 ext"`.
//! These rules fix presentation without inventing content.
//!
//! Rules (applied in order to every field):
//! 1. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
//! 2. Join lines: `", "` for addresses, a space elsewhere
//! 3. Collapse runs of whitespace to one space and trim
//!
//! Then, for `phone` only:
//! 4. Keep the first phone-number-looking run, if there is one
//!
//! Every rule is idempotent, so cleaning an already-clean record is a no-op.

use crate::output::{ContactField, ContactInfo};
use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all clean-up rules to a contact record.
pub fn clean_contact(contact: &ContactInfo) -> ContactInfo {
    let mut out = ContactInfo::default();
    for field in ContactField::ALL {
        out.set(field, clean_field(field, contact.get(field)));
    }
    out
}

/// Apply the clean-up rules for one field.
pub fn clean_field(field: ContactField, value: &str) -> String {
    let s = remove_invisible_chars(value);
    let s = join_lines(&s, field == ContactField::Address);
    let s = collapse_whitespace(&s);
    if field == ContactField::Phone {
        extract_phone(&s)
    } else {
        s
    }
}

// ── Rule 1: Strip invisible Unicode ──────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| {
            !matches!(
                c,
                '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}'
            )
        })
        .collect()
}

// ── Rule 2: Join lines ───────────────────────────────────────────────────────

fn join_lines(input: &str, comma: bool) -> String {
    let sep = if comma { ", " } else { " " };
    input
        .split(['\r', '\n'])
        .map(|l| l.trim().trim_end_matches(','))
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

// ── Rule 3: Collapse whitespace ──────────────────────────────────────────────

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn collapse_whitespace(input: &str) -> String {
    RE_WHITESPACE.replace_all(input.trim(), " ").into_owned()
}

// ── Rule 4: Phone extraction ─────────────────────────────────────────────────

static RE_PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\+?\d{1,2})?(\(?\d{1,4}\)?[\s\-]?)?[\d\s\-]{7,}").unwrap());

/// The first phone-number-looking run in `input`, or `input` unchanged.
fn extract_phone(input: &str) -> String {
    match RE_PHONE.find(input) {
        Some(m) => {
            let found = m.as_str().trim().trim_end_matches('-').trim_end();
            if found.is_empty() {
                input.to_string()
            } else {
                found.to_string()
            }
        }
        None => input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_lines_joined_with_commas() {
        assert_eq!(
            clean_field(
                ContactField::Address,
                "123 Tech Boulevard,\nSan Francisco, CA 94107\n"
            ),
            "123 Tech Boulevard, San Francisco, CA 94107"
        );
    }

    #[test]
    fn company_lines_joined_with_space() {
        assert_eq!(
            clean_field(ContactField::Company, "Innovative\nSolutions   Inc."),
            "Innovative Solutions Inc."
        );
    }

    #[test]
    fn invisible_chars_removed() {
        assert_eq!(
            clean_field(ContactField::Email, "\u{FEFF}alex@\u{200B}acme.com"),
            "alex@acme.com"
        );
    }

    #[test]
    fn phone_label_stripped() {
        assert_eq!(
            clean_field(ContactField::Phone, "Tel: +1 555-123-4567"),
            "+1 555-123-4567"
        );
        assert_eq!(
            clean_field(ContactField::Phone, "M 0412 345 678 / F 02 9876 5432"),
            "0412 345 678"
        );
    }

    #[test]
    fn phone_without_digits_kept() {
        assert_eq!(clean_field(ContactField::Phone, "ask reception"), "ask reception");
        assert_eq!(clean_field(ContactField::Phone, ""), "");
    }

    #[test]
    fn clean_is_idempotent() {
        let mut c = ContactInfo::default();
        c.set(ContactField::Name, "  Alex\nJohnson ");
        c.set(ContactField::Phone, "Phone: +65 6123 4567");
        c.set(ContactField::Address, "1 Raffles Place\n#20-01\nSingapore 048616");
        let once = clean_contact(&c);
        let twice = clean_contact(&once);
        assert_eq!(once, twice);
        assert_eq!(once.name, "Alex Johnson");
        assert_eq!(once.address, "1 Raffles Place, #20-01, Singapore 048616");
    }
}
