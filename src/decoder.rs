//! CVRF document decoder.
//!
//! Turns one XML-derived JSON document into an [`Advisory`]. Decoding is
//! deliberately lenient below the envelope: unknown keys are ignored, missing
//! keys decode to empty values and a field of the wrong type only loses that
//! field. The only hard failures are bytes that are not JSON and a missing or
//! non-object `cvrfdoc` / `Vulnerability`.
//!
//! Decoding runs in three steps:
//!
//! 1. [`normalize_keys`] strips namespace prefixes and XML attribute markers
//!    and renames `#text` to `text`, at every depth.
//! 2. Every repeated element is read through [`crate::shape`] and the product
//!    tree through [`crate::tree`], so singletons and lists look the same.
//! 3. Notes are cleaned up for display (see [`process_notes`]).

use crate::error::{AdvisoryError, Result};
use crate::models::{
    Acknowledgment, Advisory, Cvss, Note, Publisher, Reference, Revision, Tracking, Vulnerability,
};
use crate::shape::{coerce_objects, coerce_strings, scalar_text};
use crate::tree::normalize_product_tree;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Key of the document envelope.
pub const ENVELOPE_KEY: &str = "cvrfdoc";

const AFFECTED_PRODUCTS_TITLE: &str = "Affected Products";
const SOLUTIONS_TITLE: &str = "Solutions";

// "FortiOS version 7.2.0 through 7.2.4", "At least FortiWeb version 7.0.1",
// "FortiOS 7.2.x all versions". The version token is any non-blank run.
static VERSION_RANGE_REGEX: Lazy<std::result::Result<Regex, regex_lite::Error>> =
    Lazy::new(|| {
        Regex::new(
            r"((?:At least\s*)?Forti\w+ version \S+(?:\s*through \d+(?:\.\d+)*)?|Forti\w+ \S+ all versions)\s*",
        )
    });
static OR_ABOVE_PLEASE_REGEX: Lazy<std::result::Result<Regex, regex_lite::Error>> =
    Lazy::new(|| Regex::new(r"or above\s*Please"));

/// Decode raw document bytes.
pub fn decode(bytes: &[u8]) -> Result<Advisory> {
    let value: Value = serde_json::from_slice(bytes)?;
    decode_value(value)
}

/// Decode an already parsed (but not yet normalized) document.
pub fn decode_value(value: Value) -> Result<Advisory> {
    let root = match normalize_keys(value) {
        Value::Object(root) => root,
        _ => {
            return Err(AdvisoryError::malformed_envelope(
                "document is not a JSON object",
            ));
        }
    };

    match root.get(ENVELOPE_KEY) {
        Some(Value::Object(doc)) => decode_document(doc),
        Some(_) => Err(AdvisoryError::malformed_envelope(format!(
            "'{}' is not an object",
            ENVELOPE_KEY
        ))),
        None => Err(AdvisoryError::malformed_envelope(format!(
            "missing '{}'",
            ENVELOPE_KEY
        ))),
    }
}

/// Decode the contents of a normalized `cvrfdoc` envelope.
pub fn decode_document(doc: &Map<String, Value>) -> Result<Advisory> {
    let vulnerability = decode_vulnerability(envelope_vulnerability(doc)?);
    let (notes, affected_products_unlisted) =
        process_notes(decode_notes(object(doc, "DocumentNotes")));

    Ok(Advisory {
        document_title: text(doc, "DocumentTitle"),
        document_type: text(doc, "DocumentType"),
        publisher: decode_publisher(object(doc, "DocumentPublisher")),
        tracking: decode_tracking(object(doc, "DocumentTracking")),
        notes,
        references: decode_references(object(doc, "DocumentReferences")),
        acknowledgments: decode_acknowledgments(object(doc, "Acknowledgments")),
        vulnerability,
        product_tree: normalize_product_tree(doc.get("ProductTree")),
        affected_products_unlisted,
    })
}

/// Strip XML/namespace decorations from every key, recursively.
///
/// `@Title` becomes `Title`, `cvrf:Note` becomes `Note`, `#text` becomes
/// `text`, and `@xmlns*` declarations are dropped. Values are untouched.
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter_map(|(key, value)| normalize_key(&key).map(|key| (key, normalize_keys(value))))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

fn normalize_key(key: &str) -> Option<String> {
    if key == "#text" {
        return Some("text".to_string());
    }

    let key = key.strip_prefix('@').unwrap_or(key);
    if key == "xmlns" || key.starts_with("xmlns:") {
        return None;
    }

    let local = key.rsplit_once(':').map_or(key, |(_, local)| local);
    Some(local.to_string())
}

fn envelope_vulnerability(doc: &Map<String, Value>) -> Result<&Map<String, Value>> {
    match doc.get("Vulnerability") {
        Some(Value::Object(vulnerability)) => Ok(vulnerability),
        // Multi-vulnerability documents: the first one is the advisory's.
        Some(Value::Array(items)) => items
            .iter()
            .find_map(Value::as_object)
            .ok_or_else(|| AdvisoryError::malformed_envelope("'Vulnerability' has no object")),
        Some(_) => Err(AdvisoryError::malformed_envelope(
            "'Vulnerability' is not an object",
        )),
        None => Err(AdvisoryError::malformed_envelope("missing 'Vulnerability'")),
    }
}

fn decode_vulnerability(vulnerability: &Map<String, Value>) -> Vulnerability {
    let mut product_statuses: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if let Some(statuses) = object(vulnerability, "ProductStatuses") {
        for status in coerce_objects(statuses.get("Status")) {
            let ids = product_statuses.entry(text(&status, "Type")).or_default();
            for id in coerce_strings(status.get("ProductID")) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
    }

    let score_set = object(vulnerability, "CVSSScoreSets").and_then(|sets| object(sets, "ScoreSetV3"));

    Vulnerability {
        ordinal: text(vulnerability, "Ordinal"),
        title: text(vulnerability, "Title"),
        cve: coerce_strings(vulnerability.get("CVE")),
        product_statuses,
        references: decode_references(object(vulnerability, "References")),
        cvss: Cvss {
            base_score_v3: score_set
                .map(|set| text(set, "BaseScoreV3"))
                .unwrap_or_default(),
            vector_v3: score_set.map(|set| text(set, "VectorV3")).unwrap_or_default(),
        },
    }
}

fn decode_publisher(publisher: Option<&Map<String, Value>>) -> Publisher {
    let Some(publisher) = publisher else {
        return Publisher::default();
    };

    Publisher {
        publisher_type: text(publisher, "Type"),
        contact_details: text(publisher, "ContactDetails"),
        issuing_authority: text(publisher, "IssuingAuthority"),
    }
}

fn decode_tracking(tracking: Option<&Map<String, Value>>) -> Tracking {
    let Some(tracking) = tracking else {
        return Tracking::default();
    };

    let revisions = object(tracking, "RevisionHistory")
        .map(|history| {
            coerce_objects(history.get("Revision"))
                .iter()
                .map(|revision| Revision {
                    number: text(revision, "Number"),
                    date: text(revision, "Date"),
                    description: text(revision, "Description"),
                })
                .collect()
        })
        .unwrap_or_default();

    Tracking {
        id: object(tracking, "Identification")
            .map(|identification| text(identification, "ID"))
            .unwrap_or_default(),
        status: text(tracking, "Status"),
        version: text(tracking, "Version"),
        revisions,
        initial_release_date: text(tracking, "InitialReleaseDate"),
        current_release_date: text(tracking, "CurrentReleaseDate"),
    }
}

fn decode_notes(notes: Option<&Map<String, Value>>) -> Vec<Note> {
    let Some(notes) = notes else {
        return Vec::new();
    };

    coerce_objects(notes.get("Note"))
        .iter()
        .map(|note| Note {
            title: text(note, "Title"),
            note_type: text(note, "Type"),
            ordinal: text(note, "Ordinal"),
            text: text(note, "text"),
        })
        .collect()
}

fn decode_references(references: Option<&Map<String, Value>>) -> Vec<Reference> {
    let Some(references) = references else {
        return Vec::new();
    };

    coerce_objects(references.get("Reference"))
        .iter()
        .map(|reference| Reference {
            url: text(reference, "URL"),
            description: text(reference, "Description"),
        })
        .collect()
}

fn decode_acknowledgments(acknowledgments: Option<&Map<String, Value>>) -> Vec<Acknowledgment> {
    let Some(acknowledgments) = acknowledgments else {
        return Vec::new();
    };

    coerce_objects(acknowledgments.get("Acknowledgment"))
        .iter()
        .map(|acknowledgment| Acknowledgment {
            description: text(acknowledgment, "Description"),
        })
        .collect()
}

/// Drop empty notes and restore line breaks lost by the source.
///
/// A note whose text is blank or just "None" carries no content and is
/// dropped. The returned flag is set when such a note was the
/// "Affected Products" section, meaning affected versions must come from the
/// product tree.
///
/// The line-break rules are a best-effort heuristic over human-written text,
/// not a grammar.
pub fn process_notes(notes: Vec<Note>) -> (Vec<Note>, bool) {
    let mut affected_products_unlisted = false;
    let mut kept = Vec::with_capacity(notes.len());

    for note in notes {
        let body = note.text.trim();
        if body.is_empty() || body == "None" {
            if note.title.contains(AFFECTED_PRODUCTS_TITLE) {
                affected_products_unlisted = true;
            }
            continue;
        }

        let mut body = body.to_string();
        if note.title.contains(AFFECTED_PRODUCTS_TITLE) {
            body = split_version_ranges(&body);
        }
        if note.title.contains(SOLUTIONS_TITLE) {
            body = split_or_above_please(&body);
        }

        kept.push(Note {
            title: note.title.trim().to_string(),
            text: body,
            ..note
        });
    }

    (kept, affected_products_unlisted)
}

fn split_version_ranges(text: &str) -> String {
    match &*VERSION_RANGE_REGEX {
        Ok(regex) => regex
            .replace_all(text, "${1}\n")
            .trim_end()
            .to_string(),
        Err(_) => text.to_string(),
    }
}

fn split_or_above_please(text: &str) -> String {
    match &*OR_ABOVE_PLEASE_REGEX {
        Ok(regex) => regex.replace_all(text, "or above\nPlease").into_owned(),
        Err(_) => text.to_string(),
    }
}

/// Object at `key`, or the first object if the source repeated the element.
fn object<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    match map.get(key)? {
        Value::Object(inner) => Some(inner),
        Value::Array(items) => items.iter().find_map(Value::as_object),
        _ => None,
    }
}

/// Text at `key`; wrong types decode to the empty string.
fn text(map: &Map<String, Value>, key: &str) -> String {
    let found = match map.get(key) {
        Some(Value::Array(items)) => items.iter().find_map(scalar_text),
        Some(value) => scalar_text(value),
        None => None,
    };
    found.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_document(vulnerability: Value) -> Value {
        json!({
            "cvrfdoc": {
                "@xmlns": "http://www.icasi.org/CVRF/schema/cvrf/1.1",
                "@xmlns:cvrf": "http://www.icasi.org/CVRF/schema/cvrf/1.1",
                "cvrf:DocumentTitle": "Heap-based buffer overflow in sslvpnd",
                "cvrf:Vulnerability": vulnerability
            }
        })
    }

    fn note(title: &str, text: &str) -> Note {
        Note {
            title: title.to_string(),
            note_type: "Details".to_string(),
            ordinal: "1".to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_normalize_keys() {
        let value = json!({
            "@xmlns:cvrf": "ns",
            "cvrf:DocumentNotes": {
                "cvrf:Note": { "@Title": "Summary", "#text": "cvrf:literal @value" }
            },
            "cvrf-common:Date": "2024-01-01"
        });
        assert_eq!(
            normalize_keys(value),
            json!({
                "DocumentNotes": { "Note": { "Title": "Summary", "text": "cvrf:literal @value" } },
                "Date": "2024-01-01"
            })
        );
    }

    #[test]
    fn test_singletons_decode_as_sequences() {
        let doc = minimal_document(json!({
            "CVE": "CVE-2022-42475",
            "ProductStatuses": { "Status": { "@Type": "Known Affected", "ProductID": "FortiOS-6.4.10" } },
            "References": { "Reference": { "URL": "https://www.fortiguard.com/psirt/FG-IR-22-398" } }
        }));
        let advisory = decode_value(doc).unwrap();

        assert_eq!(advisory.document_title, "Heap-based buffer overflow in sslvpnd");
        assert_eq!(advisory.vulnerability.cve, vec!["CVE-2022-42475"]);
        assert_eq!(
            advisory.vulnerability.product_statuses["Known Affected"],
            vec!["FortiOS-6.4.10"]
        );
        assert_eq!(advisory.vulnerability.references.len(), 1);
    }

    #[test]
    fn test_statuses_of_same_type_are_merged() {
        let doc = minimal_document(json!({
            "ProductStatuses": { "Status": [
                { "@Type": "Known Affected", "ProductID": ["FortiOS-7.2.0", "FortiOS-7.2.1"] },
                { "@Type": "Known Affected", "ProductID": ["FortiOS-7.2.1", "FortiOS-7.2.2"] },
                { "@Type": "Fixed", "ProductID": "FortiOS-7.2.3" }
            ]}
        }));
        let advisory = decode_value(doc).unwrap();
        let statuses = &advisory.vulnerability.product_statuses;

        assert_eq!(
            statuses["Known Affected"],
            vec!["FortiOS-7.2.0", "FortiOS-7.2.1", "FortiOS-7.2.2"]
        );
        assert_eq!(statuses["Fixed"], vec!["FortiOS-7.2.3"]);
    }

    #[test]
    fn test_type_mismatch_only_loses_the_field() {
        let mut doc = minimal_document(json!({
            "Title": { "unexpected": true },
            "CVE": 42,
            "CVSSScoreSets": "oops"
        }));
        doc["cvrfdoc"]["DocumentTracking"] = json!("not an object");
        doc["cvrfdoc"]["DocumentNotes"] = json!({ "Note": "bare string" });

        let advisory = decode_value(doc).unwrap();
        assert_eq!(advisory.vulnerability.title, "");
        assert_eq!(advisory.vulnerability.cve, vec!["42"]);
        assert!(advisory.vulnerability.cvss.is_empty());
        assert!(advisory.tracking.is_empty());
        assert!(advisory.notes.is_empty());
    }

    #[test]
    fn test_malformed_envelope() {
        for doc in [
            json!({}),
            json!({ "cvrfdoc": "text" }),
            json!({ "cvrfdoc": { "DocumentTitle": "no vulnerability" } }),
            json!({ "cvrfdoc": { "Vulnerability": "text" } }),
            json!([1, 2, 3]),
        ] {
            let err = decode_value(doc).unwrap_err();
            assert!(matches!(err, AdvisoryError::MalformedEnvelope { .. }));
        }
    }

    #[test]
    fn test_invalid_json_is_serialization_error() {
        let err = decode(b"<cvrfdoc/>").unwrap_err();
        assert!(matches!(err, AdvisoryError::Serialization(_)));
        assert!(err.is_document_error());
    }

    #[test]
    fn test_vulnerability_array_uses_first_object() {
        let doc = minimal_document(json!([
            { "Title": "first", "CVE": "CVE-2024-0001" },
            { "Title": "second" }
        ]));
        let advisory = decode_value(doc).unwrap();
        assert_eq!(advisory.vulnerability.title, "first");
    }

    #[test]
    fn test_tracking_and_revisions() {
        let mut doc = minimal_document(json!({}));
        doc["cvrfdoc"]["cvrf:DocumentTracking"] = json!({
            "cvrf:Identification": { "cvrf:ID": "FG-IR-22-398" },
            "cvrf:Status": "Final",
            "cvrf:Version": "2",
            "cvrf:RevisionHistory": {
                "cvrf:Revision": { "cvrf:Number": "1", "cvrf:Date": "2022-12-12", "cvrf:Description": "Initial version" }
            },
            "cvrf:InitialReleaseDate": "2022-12-12T00:00:00",
            "cvrf:CurrentReleaseDate": "2023-01-11T00:00:00"
        });
        let advisory = decode_value(doc).unwrap();

        assert_eq!(advisory.tracking.id, "FG-IR-22-398");
        assert_eq!(advisory.tracking.status, "Final");
        assert_eq!(advisory.tracking.revisions.len(), 1);
        assert_eq!(advisory.tracking.revisions[0].description, "Initial version");
        assert_eq!(advisory.link(), "https://fortiguard.fortinet.com/psirt/FG-IR-22-398");
    }

    #[test]
    fn test_none_affected_products_sets_flag() {
        let (notes, unlisted) = process_notes(vec![
            note("Summary", "A heap overflow."),
            note("Affected Products", "None"),
        ]);
        assert!(unlisted);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Summary");
    }

    #[test]
    fn test_blank_unrelated_note_is_dropped_without_flag() {
        let (notes, unlisted) = process_notes(vec![note("Impact", "  \n\t ")]);
        assert!(!unlisted);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_affected_products_line_breaks() {
        let (notes, _) = process_notes(vec![note(
            "Affected Products",
            "FortiOS version 7.2.0 through 7.2.2 FortiOS version 7.0.0 through 7.0.8FortiOS 6.0 all versions At least FortiProxy version 7.2.1",
        )]);
        assert_eq!(
            notes[0].text,
            "FortiOS version 7.2.0 through 7.2.2\nFortiOS version 7.0.0 through 7.0.8\nFortiOS 6.0 all versions\nAt least FortiProxy version 7.2.1"
        );
    }

    #[test]
    fn test_affected_products_non_numeric_version() {
        let (notes, _) = process_notes(vec![note(
            "Affected Products",
            "FortiOS version 7.2.x FortiProxy version 7.0.0 through 7.0.8",
        )]);
        assert_eq!(
            notes[0].text,
            "FortiOS version 7.2.x\nFortiProxy version 7.0.0 through 7.0.8"
        );
    }

    #[test]
    fn test_solutions_line_breaks() {
        let (notes, _) = process_notes(vec![note(
            "Solutions",
            "Please upgrade to FortiOS version 7.2.3 or above Please upgrade to FortiOS version 7.0.9 or above",
        )]);
        assert_eq!(
            notes[0].text,
            "Please upgrade to FortiOS version 7.2.3 or above\nPlease upgrade to FortiOS version 7.0.9 or above"
        );
    }

    #[test]
    fn test_notes_without_special_titles_are_only_trimmed() {
        let (notes, _) = process_notes(vec![note(" Summary ", "  FortiOS version 7.2.0 or above Please  ")]);
        assert_eq!(notes[0].title, "Summary");
        assert_eq!(notes[0].text, "FortiOS version 7.2.0 or above Please");
    }
}
