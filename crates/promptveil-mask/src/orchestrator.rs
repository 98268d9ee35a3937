//! Masking orchestration and the routing decision
//!
//! Per request: extract spans, scan for secrets, fan detector calls out
//! over the spans, resolve conflicts per span, mask sequentially through a
//! single context, reassemble. In route mode no masking happens; the
//! original request is dispatched on-premise when the analyzer found PII
//! and remotely otherwise.

use crate::extractor::ProviderExtractor;
use crate::masker;
use crate::unmasker::UnmaskMode;
use crate::{MaskError, Result};
use futures::future;
use promptveil_core::config::{Mode, ProxyConfig};
use promptveil_core::{Entity, MaskedSpan, PlaceholderContext, resolver};
use promptveil_detect::{PiiAnalyzer, SecretScanner};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Where the caller should dispatch the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Forward to the configured remote provider.
    Remote,
    /// Divert to the on-premise provider (route mode, PII present).
    OnPremise,
}

/// Outcome of masking one request.
#[derive(Debug)]
pub struct MaskingResult {
    /// The request to dispatch: masked in mask mode, untouched in route
    /// mode.
    pub request: Value,

    /// Placeholder bookkeeping for the response path.
    pub context: PlaceholderContext,

    /// Whether any entity survived conflict resolution.
    pub entities_found: bool,

    /// Routing decision for the caller.
    pub dispatch: Dispatch,

    /// Extractor that produced the spans; reuse it to unmask the response.
    pub extractor: ProviderExtractor,
}

/// Request-masking coordinator. Immutable once built; share one instance
/// read-only across requests. All mutable state lives in the per-request
/// [`PlaceholderContext`].
pub struct MaskingEngine {
    mode: Mode,
    detection_enabled: bool,
    scanner: SecretScanner,
    analyzer: Option<Arc<dyn PiiAnalyzer>>,
    whitelist: HashSet<String>,
    unmask_mode: UnmaskMode,
}

impl MaskingEngine {
    /// Build an engine from a configuration snapshot.
    ///
    /// The analyzer handle is required whenever PII detection is enabled;
    /// secrets are scanned either way.
    pub fn new(config: &ProxyConfig, analyzer: Option<Arc<dyn PiiAnalyzer>>) -> Result<Self> {
        let detection_enabled = config.pii_detection.enabled;
        if detection_enabled && analyzer.is_none() {
            return Err(MaskError::Config(
                "PII detection is enabled but no analyzer was provided".into(),
            ));
        }

        let scanner = SecretScanner::new()
            .map_err(|e| MaskError::Config(format!("secret patterns failed to compile: {}", e)))?;

        Ok(Self {
            mode: config.mode,
            detection_enabled,
            scanner,
            analyzer,
            whitelist: config.pii_detection.whitelist.iter().cloned().collect(),
            unmask_mode: UnmaskMode::from_config(&config.masking),
        })
    }

    /// Run the masking procedure over one request.
    pub async fn process(&self, request: &Value) -> Result<MaskingResult> {
        let extractor = ProviderExtractor::for_request(request)?;
        let spans = extractor.extract(request);
        debug!(spans = spans.len(), "extracted text spans");

        // Secrets first; scanning is in-process and cannot fail.
        let mut entities_per_span: Vec<Vec<Entity>> =
            spans.iter().map(|s| self.scanner.scan(&s.text)).collect();

        // Detector fan-out over non-empty spans, results collected back in
        // span order. A detector failure aborts the request; forwarding
        // unmasked is never the fallback.
        let mut analyzer_found = false;
        if self.detection_enabled
            && let Some(analyzer) = &self.analyzer
        {
            let calls = spans.iter().map(|span| {
                let analyzer = Arc::clone(analyzer);
                async move {
                    if span.text.is_empty() {
                        Ok(Vec::new())
                    } else {
                        analyzer.analyze(&span.text).await
                    }
                }
            });
            let results = future::join_all(calls).await;
            for (bucket, result) in entities_per_span.iter_mut().zip(results) {
                let found = result?;
                analyzer_found |= !found.is_empty();
                bucket.extend(found);
            }
        }

        // Conflict resolution per span, over the union of both sources.
        let resolved: Vec<Vec<Entity>> = entities_per_span
            .into_iter()
            .map(resolver::resolve)
            .collect();
        let entities_found = resolved.iter().any(|entities| !entities.is_empty());

        if self.mode == Mode::Route {
            let dispatch = if analyzer_found {
                Dispatch::OnPremise
            } else {
                Dispatch::Remote
            };
            info!(?dispatch, "route mode decision");
            return Ok(MaskingResult {
                request: request.clone(),
                context: PlaceholderContext::new(),
                entities_found,
                dispatch,
                extractor,
            });
        }

        // Masking is sequential: one context, spans in extraction order.
        let mut context = PlaceholderContext::new();
        let masked: Vec<MaskedSpan> = spans
            .iter()
            .zip(&resolved)
            .map(|(span, entities)| masker::mask_span(span, entities, &mut context, &self.whitelist))
            .collect();

        let request = extractor.apply(request, &masked)?;
        debug!(placeholders = context.len(), "request masked");

        Ok(MaskingResult {
            request,
            context,
            entities_found,
            dispatch: Dispatch::Remote,
            extractor,
        })
    }

    /// Unmask a non-streaming response with the context produced by
    /// [`process`](Self::process).
    pub fn unmask_response(
        &self,
        extractor: ProviderExtractor,
        response: &Value,
        context: &PlaceholderContext,
    ) -> Value {
        extractor.unmask_response(response, context, &self.unmask_mode)
    }

    /// Render mode for restored values, for the streaming path.
    pub fn unmask_mode(&self) -> &UnmaskMode {
        &self.unmask_mode
    }
}
