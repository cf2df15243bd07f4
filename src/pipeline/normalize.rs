//! Field normalizer: vendor JSON → [`ContactInfo`].
//!
//! The business-card model reports each logical field under
//! `analyzeResult.documents[0].fields.<Key>`, and depending on model version
//! the candidate values appear in different shapes:
//!
//! ```text
//! fields.Emails.valueArray[0].valueString        (array field, 2022+ models)
//! fields.Emails.values[0].valueString            (older "values" shape)
//! fields.ContactNames.valueArray[0].valueObject  (FirstName / LastName)
//! fields.Addresses.valueArray[0].valueAddress    (structured address)
//! fields.Websites.content                        (flattened text)
//! ```
//!
//! Each logical field owns an ordered list of [`Probe`]s. They are tried in
//! order and the first non-empty string wins; if none matches the field is
//! `""`. Probing only ever reads through `Option`, so no response shape can
//! make normalization fail.

use crate::output::{ContactField, ContactInfo};
use serde_json::{Map, Value};

/// One way of reading a candidate value for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// `fields.<key>.valueArray[0]`
    ValueArray(&'static str),
    /// `fields.<key>.values[0]`
    Values(&'static str),
    /// `fields.<key>` itself (`valueString` / `content`)
    Direct(&'static str),
}

use Probe::{Direct, ValueArray, Values};

const NAME_PROBES: &[Probe] = &[
    ValueArray("ContactNames"),
    Values("ContactNames"),
    Direct("ContactNames"),
];
const TITLE_PROBES: &[Probe] = &[
    ValueArray("JobTitles"),
    Values("JobTitles"),
    Direct("JobTitles"),
];
const COMPANY_PROBES: &[Probe] = &[
    ValueArray("CompanyNames"),
    Values("CompanyNames"),
    Direct("CompanyNames"),
];
const EMAIL_PROBES: &[Probe] = &[ValueArray("Emails"), Values("Emails"), Direct("Emails")];
const PHONE_PROBES: &[Probe] = &[
    ValueArray("MobilePhones"),
    Values("MobilePhones"),
    ValueArray("WorkPhones"),
    Values("WorkPhones"),
    ValueArray("OtherPhones"),
    Values("OtherPhones"),
    Direct("MobilePhones"),
    Direct("WorkPhones"),
    Direct("OtherPhones"),
];
const WEBSITE_PROBES: &[Probe] = &[
    ValueArray("Websites"),
    Values("Websites"),
    Direct("Websites"),
];
const ADDRESS_PROBES: &[Probe] = &[
    ValueArray("Addresses"),
    Values("Addresses"),
    Direct("Addresses"),
];

/// The probes for `field`, highest priority first.
pub fn probes_for(field: ContactField) -> &'static [Probe] {
    match field {
        ContactField::Name => NAME_PROBES,
        ContactField::Title => TITLE_PROBES,
        ContactField::Company => COMPANY_PROBES,
        ContactField::Email => EMAIL_PROBES,
        ContactField::Phone => PHONE_PROBES,
        ContactField::Website => WEBSITE_PROBES,
        ContactField::Address => ADDRESS_PROBES,
    }
}

impl Probe {
    /// Evaluate this probe against the `fields` map.
    pub fn extract(&self, fields: &Map<String, Value>) -> Option<String> {
        let candidate = match *self {
            ValueArray(key) => fields.get(key)?.get("valueArray")?.get(0)?,
            Values(key) => fields.get(key)?.get("values")?.get(0)?,
            Direct(key) => fields.get(key)?,
        };
        render_candidate(candidate)
    }
}

/// Text of one candidate value.
///
/// Prefers the typed `valueString`, then the recognised `content`, then the
/// structured object/address/phone payloads.
fn render_candidate(v: &Value) -> Option<String> {
    if let Some(s) = v.as_str() {
        return non_empty(s);
    }
    string_at(v, "valueString")
        .or_else(|| string_at(v, "content"))
        .or_else(|| string_at(v, "valuePhoneNumber"))
        .or_else(|| v.get("valueObject").and_then(render_name_object))
        .or_else(|| v.get("valueAddress").and_then(render_address))
}

fn string_at(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).and_then(non_empty)
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// `{ FirstName: {...}, LastName: {...} }` → "First Last".
fn render_name_object(obj: &Value) -> Option<String> {
    let part = |key: &str| obj.get(key).and_then(render_candidate);
    let joined: Vec<String> = [part("FirstName"), part("LastName")]
        .into_iter()
        .flatten()
        .collect();
    if joined.is_empty() {
        None
    } else {
        Some(joined.join(" "))
    }
}

/// Structured address → single line, most specific part first.
fn render_address(addr: &Value) -> Option<String> {
    if let Some(street) = string_at(addr, "streetAddress") {
        let rest: Vec<String> = ["city", "state", "postalCode", "countryRegion"]
            .iter()
            .filter_map(|k| string_at(addr, k))
            .collect();
        let mut parts = vec![street];
        parts.extend(rest);
        return Some(parts.join(", "));
    }

    let street: Vec<String> = ["houseNumber", "road"]
        .iter()
        .filter_map(|k| string_at(addr, k))
        .collect();
    let mut parts = Vec::new();
    if !street.is_empty() {
        parts.push(street.join(" "));
    }
    parts.extend(
        ["unit", "city", "state", "postalCode", "countryRegion"]
            .iter()
            .filter_map(|k| string_at(addr, k)),
    );
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// `analyzeResult.documents[0].fields`, if the response has that shape.
pub fn document_fields(result: &Value) -> Option<&Map<String, Value>> {
    result
        .get("analyzeResult")?
        .get("documents")?
        .get(0)?
        .get("fields")?
        .as_object()
}

/// First non-empty value the probes for `field` yield, or `""`.
pub fn extract_field(fields: &Map<String, Value>, field: ContactField) -> String {
    probes_for(field)
        .iter()
        .find_map(|p| p.extract(fields))
        .unwrap_or_default()
}

/// Map a succeeded analysis body to a [`ContactInfo`].
///
/// Missing or oddly shaped data yields empty fields, never an error.
pub fn normalize(result: &Value) -> ContactInfo {
    let mut contact = ContactInfo::default();
    let Some(fields) = document_fields(result) else {
        tracing::warn!("Analysis result has no document fields; returning empty contact");
        return contact;
    };
    for field in ContactField::ALL {
        contact.set(field, extract_field(fields, field));
    }
    contact
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wrap(fields: Value) -> Value {
        json!({
            "status": "succeeded",
            "analyzeResult": { "documents": [ { "docType": "businessCard", "fields": fields } ] }
        })
    }

    #[test]
    fn values_shape_email() {
        let r = wrap(json!({ "Emails": { "values": [ { "valueString": "a@b.com" } ] } }));
        assert_eq!(normalize(&r).email, "a@b.com");
    }

    #[test]
    fn value_array_shape_takes_priority() {
        let r = wrap(json!({
            "Emails": {
                "valueArray": [ { "type": "string", "valueString": "first@x.com" } ],
                "values": [ { "valueString": "second@x.com" } ]
            }
        }));
        assert_eq!(normalize(&r).email, "first@x.com");
    }

    #[test]
    fn empty_candidate_falls_through_to_next_probe() {
        let r = wrap(json!({
            "Websites": {
                "valueArray": [ { "valueString": "  " } ],
                "values": [ { "content": "www.acme.io" } ]
            }
        }));
        assert_eq!(normalize(&r).website, "www.acme.io");
    }

    #[test]
    fn name_from_content_or_object() {
        let with_content = wrap(json!({
            "ContactNames": { "valueArray": [ {
                "type": "object",
                "content": "Alex Johnson",
                "valueObject": { "FirstName": { "valueString": "Alex" }, "LastName": { "valueString": "Johnson" } }
            } ] }
        }));
        assert_eq!(normalize(&with_content).name, "Alex Johnson");

        let object_only = wrap(json!({
            "ContactNames": { "valueArray": [ {
                "valueObject": { "FirstName": { "content": "Sam" }, "LastName": { "valueString": "Lee" } }
            } ] }
        }));
        assert_eq!(normalize(&object_only).name, "Sam Lee");
    }

    #[test]
    fn phone_prefers_mobile_then_work() {
        let r = wrap(json!({
            "WorkPhones": { "valueArray": [ { "content": "+1 555 0100" } ] },
            "MobilePhones": { "valueArray": [ { "valuePhoneNumber": "+15550199", "content": "" } ] }
        }));
        assert_eq!(normalize(&r).phone, "+15550199");

        let work_only = wrap(json!({ "WorkPhones": { "values": [ { "content": "+1 555 0100" } ] } }));
        assert_eq!(normalize(&work_only).phone, "+1 555 0100");
    }

    #[test]
    fn structured_address() {
        let r = wrap(json!({
            "Addresses": { "valueArray": [ {
                "valueAddress": {
                    "houseNumber": "123", "road": "Tech Boulevard",
                    "city": "San Francisco", "state": "CA", "postalCode": "94107"
                }
            } ] }
        }));
        assert_eq!(
            normalize(&r).address,
            "123 Tech Boulevard, San Francisco, CA, 94107"
        );
    }

    #[test]
    fn structured_address_with_street_line() {
        let r = wrap(json!({
            "Addresses": { "valueArray": [ {
                "valueAddress": {
                    "streetAddress": "4 Privet Drive",
                    "houseNumber": "4", "road": "ignored when a street line exists",
                    "city": "Little Whinging", "postalCode": "GU1 3AA",
                    "countryRegion": "UK"
                }
            } ] }
        }));
        assert_eq!(
            normalize(&r).address,
            "4 Privet Drive, Little Whinging, GU1 3AA, UK"
        );
    }

    #[test]
    fn missing_paths_yield_empty_strings() {
        for body in [
            json!({}),
            json!({ "analyzeResult": null }),
            json!({ "analyzeResult": { "documents": [] } }),
            json!({ "analyzeResult": { "documents": [ { "fields": [] } ] } }),
            wrap(json!({})),
            wrap(json!({ "Emails": null, "JobTitles": { "valueArray": "oops" }, "CompanyNames": { "values": [ 42 ] } })),
        ] {
            let c = normalize(&body);
            assert_eq!(c, ContactInfo::default(), "body: {body}");
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        let r = wrap(json!({
            "ContactNames": { "valueArray": [ { "content": "Alex Johnson" } ] },
            "CompanyNames": { "valueArray": [ { "valueString": "Innovative Solutions Inc." } ] },
            "Emails": { "values": [ { "valueString": "alex@innovative.com" } ] }
        }));
        let a = serde_json::to_vec(&normalize(&r)).unwrap();
        let b = serde_json::to_vec(&normalize(&r)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn every_field_has_probes() {
        for f in ContactField::ALL {
            assert!(!probes_for(f).is_empty(), "{f} has no probes");
        }
    }
}
