//! Tagged-span wire format.
//!
//! A span collection travels to the backend as
//! `<root><content id="N">text</content>…</root>`.
//!
//! Escaping rule: request values are emitted verbatim — encoding them would
//! double-escape entities already present in feed text once the response is
//! decoded. The response is not trusted to be well-formed: every `<content>`
//! body is entity-escaped before structural parsing (so literal `<`, `>` or
//! `&` in a translation cannot break the parse) and every parsed value is
//! entity-decoded afterwards.

use once_cell::sync::OnceCell;
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::translate::{SpanCollection, TranslationMap};

/// Marker distinguishing a structured response from free-form chatter.
pub const CONTENT_MARKER: &str = "<content";

/// Originals at or below this length pass through unchanged when the model
/// returns an empty element for their index; it tends to echo short tokens
/// as empty rather than translating them.
const EMPTY_ELEMENT_ORIGINAL_MAX: usize = 4;

pub fn encode_spans(spans: &SpanCollection) -> String {
    let mut out = String::from("<root>");
    for (idx, text) in spans.iter() {
        out.push_str(&format!(r#"<content id="{idx}">{text}</content>"#));
    }
    out.push_str("</root>");
    out
}

fn content_body_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r#"(?s)<content id="(\d+)">(.*?)</content>"#).unwrap())
}

/// Re-escape the inner text of every content element in place.
fn escape_content_bodies(response: &str) -> String {
    content_body_re()
        .replace_all(response, |caps: &Captures| {
            format!(
                r#"<content id="{}">{}</content>"#,
                &caps[1],
                html_escape::encode_text(&caps[2])
            )
        })
        .into_owned()
}

#[derive(Debug, Deserialize)]
struct ResponseDoc {
    #[serde(rename = "content", default)]
    content: Vec<ContentElement>,
}

#[derive(Debug, Deserialize)]
struct ContentElement {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "$text")]
    text: Option<String>,
}

/// Parse a backend response into an index -> translation mapping. `None`
/// means the response was not structurally parseable; the caller counts
/// that as one failed attempt.
pub fn decode_response(response: &str, original: &SpanCollection) -> Option<TranslationMap> {
    let escaped = escape_content_bodies(response);

    // The model may wrap the document in chatter; parse just the root
    // element when one can be located.
    let doc = match (escaped.find("<root"), escaped.rfind("</root>")) {
        (Some(start), Some(end)) if end > start => &escaped[start..end + "</root>".len()],
        _ => escaped.as_str(),
    };
    let parsed: ResponseDoc = quick_xml::de::from_str(doc).ok()?;

    let mut map = TranslationMap::new();
    for element in parsed.content {
        let Ok(idx) = element.id.parse::<usize>() else {
            continue;
        };
        match element.text {
            Some(text) => {
                map.insert(idx, html_escape::decode_html_entities(&text).into_owned());
            }
            None => {
                // Empty element: keep very short originals; longer ones stay
                // missing and go through the remainder retry.
                if let Some(orig) = original.get(idx) {
                    if orig.chars().count() <= EMPTY_ELEMENT_ORIGINAL_MAX {
                        map.insert(idx, orig.clone());
                    }
                }
            }
        }
    }
    Some(map)
}
