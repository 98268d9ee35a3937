//! Span masking
//!
//! Walks a disjoint, sorted entity list left to right and substitutes each
//! detected interval with a placeholder allocated from the request
//! context. Whitelisted substrings are emitted verbatim and never consume
//! a counter; the whitelist is checked here, at allocation time, so a
//! whitelisted substring still participates in conflict resolution.

use promptveil_core::{Entity, MaskedSpan, PlaceholderContext, TextSpan};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Mask one span against its resolved entities, extending the context.
pub fn mask_span(
    span: &TextSpan,
    entities: &[Entity],
    context: &mut PlaceholderContext,
    whitelist: &HashSet<String>,
) -> MaskedSpan {
    if entities.is_empty() {
        return MaskedSpan {
            address: span.address.clone(),
            text: span.text.clone(),
        };
    }

    let text = span.text.as_str();
    let mut masked = String::with_capacity(text.len());
    let mut cursor = 0;

    for entity in entities {
        let Some(original) = text.get(entity.start..entity.end) else {
            warn!(
                category = %entity.category,
                start = entity.start,
                end = entity.end,
                "detection interval is not on a character boundary, skipping"
            );
            continue;
        };

        if whitelist.contains(original) {
            // Leave the cursor alone; the whitelisted text flows out with
            // the next literal segment.
            debug!(category = %entity.category, "whitelisted substring left unmasked");
            continue;
        }

        masked.push_str(&text[cursor..entity.start]);
        masked.push_str(&context.allocate(&entity.category, original));
        cursor = entity.end;
    }

    masked.push_str(&text[cursor..]);

    MaskedSpan {
        address: span.address.clone(),
        text: masked,
    }
}
