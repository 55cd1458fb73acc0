// src/translate/batch.rs
use anyhow::Result;
use metrics::counter;

use crate::client::llm::ChatBackend;
use crate::translate::{wire, SpanCollection, TranslationMap};

/// Top-level serialize/send/parse attempts per subset before giving up.
const MAX_PARSE_ATTEMPTS: usize = 5;

/// Overall budget for remainder rounds per block. The remainder set only
/// ever shrinks, but a backend that keeps answering partially must not be
/// able to hold a worker in the loop forever.
const MAX_REMAINDER_ROUNDS: usize = 16;

/// Inputs shorter than this skip the backend entirely on the single-text
/// path; there is nothing worth a round trip in five characters.
const MIN_TRANSLATABLE_CHARS: usize = 6;

/// Translate one free-form text (the title path).
pub async fn translate_text(backend: &dyn ChatBackend, text: &str, prompt: &str) -> Result<String> {
    if text.chars().count() < MIN_TRANSLATABLE_CHARS {
        return Ok(text.to_string());
    }
    backend.complete(prompt, text).await
}

/// Translate a span collection in one batched round trip, retrying parse
/// failures and re-requesting any indices the backend left out.
///
/// `Ok(None)` means every attempt failed to parse; the caller falls back to
/// the untranslated rendering. Transport errors propagate so the per-entry
/// handler can log them and leave the entry for the next poll.
pub async fn translate_spans(
    backend: &dyn ChatBackend,
    spans: &SpanCollection,
    prompt: &str,
) -> Result<Option<TranslationMap>> {
    let mut rounds = MAX_REMAINDER_ROUNDS;
    translate_subset(backend, spans.clone(), prompt, &mut rounds).await
}

async fn translate_subset(
    backend: &dyn ChatBackend,
    subset: SpanCollection,
    prompt: &str,
    rounds: &mut usize,
) -> Result<Option<TranslationMap>> {
    let payload = wire::encode_spans(&subset);

    for attempt in 1..=MAX_PARSE_ATTEMPTS {
        let response = backend.complete(prompt, &payload).await?;

        // Safety net, not a retry: a response with no structural marker is
        // replaced by the request payload, which parses to the identity
        // mapping and leaves this block untranslated.
        let response = if response.contains(wire::CONTENT_MARKER) {
            response
        } else {
            tracing::warn!(
                attempt,
                "backend response carries no content marker; keeping original text"
            );
            payload.clone()
        };

        let Some(mut map) = wire::decode_response(&response, &subset) else {
            counter!("translate_parse_failures_total").increment(1);
            tracing::warn!(attempt, "translation response failed structural parse");
            continue;
        };
        if map.is_empty() {
            counter!("translate_parse_failures_total").increment(1);
            continue;
        }

        let remainder: SpanCollection = subset
            .iter()
            .filter(|(idx, _)| !map.contains_key(idx))
            .map(|(idx, text)| (*idx, text.clone()))
            .collect();
        if !remainder.is_empty() && *rounds > 0 {
            *rounds -= 1;
            tracing::debug!(missing = remainder.len(), "re-requesting untranslated remainder");
            if let Some(more) =
                Box::pin(translate_subset(backend, remainder, prompt, rounds)).await?
            {
                map.extend(more);
            }
        }
        return Ok(Some(map));
    }

    Ok(None)
}
