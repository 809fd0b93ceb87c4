//! Verification, deduplication and ordering of candidates from all passes

use crate::config::{AttributeConflictPolicy, DedupConfig};
use crate::types::{AnomalyKind, DataAnomaly};
use quarry_domain::{Attributes, Document, Extraction, ExtractionCandidate, ExtractionSet, Span};
use tracing::{debug, warn};

/// Output of [`Aggregator::aggregate`]
#[derive(Debug, Clone)]
pub struct Aggregation {
    /// The final ordered extractions
    pub set: ExtractionSet,

    /// Candidates rejected by verification
    pub anomalies: Vec<DataAnomaly>,
}

/// Merges candidates from every pass into one [`ExtractionSet`]
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    config: DedupConfig,
}

impl Aggregator {
    /// Create an aggregator
    pub fn new(config: DedupConfig) -> Self {
        Self { config }
    }

    /// Verify, deduplicate and order `candidates` against `document`
    ///
    /// Candidates are processed in (pass, chunk, arrival) order. A candidate
    /// that overlaps a kept extraction of the same class is folded into it:
    /// the kept span stays, attributes are merged and `support` grows.
    pub fn aggregate(&self, document: &Document, mut candidates: Vec<ExtractionCandidate>) -> Aggregation {
        candidates.sort_by_key(|c| (c.pass_index, c.chunk_index));

        let mut kept: Vec<Extraction> = Vec::new();
        let mut anomalies = Vec::new();

        for candidate in candidates {
            let span = match self.verify(document, &candidate) {
                Ok(span) => span,
                Err(kind) => {
                    warn!(
                        kind = ?kind,
                        class = %candidate.class,
                        pass = candidate.pass_index,
                        chunk = candidate.chunk_index,
                        "Dropping candidate {:?}",
                        candidate.text
                    );
                    anomalies.push(DataAnomaly {
                        kind,
                        span: candidate.global_span(),
                        class: candidate.class,
                        text: candidate.text,
                        pass_index: candidate.pass_index,
                        chunk_index: candidate.chunk_index,
                    });
                    continue;
                }
            };

            match kept
                .iter_mut()
                .find(|e| e.class == candidate.class && self.is_duplicate(&e.span, &span))
            {
                Some(existing) => {
                    merge_attributes(
                        &mut existing.attributes,
                        candidate.attributes,
                        self.config.attribute_conflict,
                    );
                    existing.support += 1;
                }
                None => kept.push(Extraction {
                    class: candidate.class,
                    text: candidate.text,
                    span,
                    attributes: candidate.attributes,
                    pass_index: candidate.pass_index,
                    support: 1,
                }),
            }
        }

        debug!(
            kept = kept.len(),
            anomalies = anomalies.len(),
            "Aggregated candidates"
        );

        Aggregation {
            set: ExtractionSet::new(document.id().clone(), kept),
            anomalies,
        }
    }

    /// Check a candidate against the document, returning its global span
    fn verify(&self, document: &Document, candidate: &ExtractionCandidate) -> Result<Span, AnomalyKind> {
        let span = candidate.global_span().ok_or(AnomalyKind::Unaligned)?;
        if span.is_empty() {
            return Err(AnomalyKind::EmptySpan);
        }
        let found = document
            .slice(span.start, span.end)
            .ok_or(AnomalyKind::OutOfBounds)?;
        if found != candidate.text {
            return Err(AnomalyKind::TextMismatch);
        }
        Ok(span)
    }

    fn is_duplicate(&self, a: &Span, b: &Span) -> bool {
        let overlap = a.overlap(b);
        if overlap == 0 {
            return false;
        }
        let shorter = a.len().min(b.len()).max(1);
        overlap as f64 / shorter as f64 > self.config.overlap_threshold
    }
}

fn merge_attributes(target: &mut Attributes, incoming: Attributes, policy: AttributeConflictPolicy) {
    for (key, value) in incoming {
        match policy {
            AttributeConflictPolicy::LaterPassWins => {
                target.insert(key, value);
            }
            AttributeConflictPolicy::EarlierPassWins => {
                target.entry(key).or_insert(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TEXT: &str = "Patient takes Aspirin 81mg once daily by mouth.";

    fn doc() -> Document {
        Document::new("doc_test", TEXT)
    }

    fn candidate(class: &str, text: &str, span: Option<(usize, usize)>, pass: usize) -> ExtractionCandidate {
        ExtractionCandidate {
            class: class.into(),
            text: text.into(),
            span: span.map(|(s, e)| Span::new(s, e)),
            attributes: Attributes::new(),
            pass_index: pass,
            chunk_index: 0,
            chunk_start: 0,
        }
    }

    #[test]
    fn test_orders_by_position() {
        let agg = Aggregator::default().aggregate(
            &doc(),
            vec![
                candidate("dosage", "81mg", Some((22, 26)), 0),
                candidate("medication", "Aspirin", Some((14, 21)), 0),
            ],
        );

        let texts: Vec<_> = agg.set.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["Aspirin", "81mg"]);
        assert!(agg.anomalies.is_empty());
    }

    #[test]
    fn test_duplicates_across_passes_merge() {
        let mut first = candidate("medication", "Aspirin", Some((14, 21)), 0);
        first.attributes.insert("route".into(), "oral".into());
        let mut second = candidate("medication", "Aspirin", Some((14, 21)), 1);
        second.attributes.insert("route".into(), "by mouth".into());
        second.attributes.insert("kind".into(), "nsaid".into());

        let agg = Aggregator::default().aggregate(&doc(), vec![second, first]);

        assert_eq!(agg.set.len(), 1);
        let e = &agg.set.extractions()[0];
        assert_eq!(e.pass_index, 0);
        assert_eq!(e.support, 2);
        assert_eq!(e.attributes["route"], "by mouth");
        assert_eq!(e.attributes["kind"], "nsaid");
    }

    #[test]
    fn test_earlier_pass_wins_policy() {
        let mut first = candidate("medication", "Aspirin", Some((14, 21)), 0);
        first.attributes.insert("route".into(), "oral".into());
        let mut second = candidate("medication", "Aspirin", Some((14, 21)), 1);
        second.attributes.insert("route".into(), "by mouth".into());

        let aggregator = Aggregator::new(DedupConfig {
            attribute_conflict: AttributeConflictPolicy::EarlierPassWins,
            ..DedupConfig::default()
        });
        let agg = aggregator.aggregate(&doc(), vec![first, second]);

        assert_eq!(agg.set.extractions()[0].attributes["route"], "oral");
    }

    #[test]
    fn test_different_classes_are_not_merged() {
        let agg = Aggregator::default().aggregate(
            &doc(),
            vec![
                candidate("medication", "Aspirin", Some((14, 21)), 0),
                candidate("drug", "Aspirin", Some((14, 21)), 0),
            ],
        );
        assert_eq!(agg.set.len(), 2);
        assert_eq!(agg.set.extractions()[0].class, "drug");
    }

    #[test]
    fn test_partial_overlap_respects_threshold() {
        let candidates = vec![
            candidate("dosage", "81mg once", Some((22, 31)), 0),
            candidate("dosage", "once daily", Some((27, 37)), 1),
        ];

        let any_overlap = Aggregator::default().aggregate(&doc(), candidates.clone());
        assert_eq!(any_overlap.set.len(), 1);
        assert_eq!(any_overlap.set.extractions()[0].text, "81mg once");

        let strict = Aggregator::new(DedupConfig {
            overlap_threshold: 0.5,
            ..DedupConfig::default()
        })
        .aggregate(&doc(), candidates);
        assert_eq!(strict.set.len(), 2);
    }

    #[test]
    fn test_anomalies_are_recorded() {
        let agg = Aggregator::default().aggregate(
            &doc(),
            vec![
                candidate("medication", "Ibuprofen", None, 0),
                candidate("medication", "Aspirin", Some((40, 47)), 0),
                candidate("medication", "Aspirin", Some((100, 107)), 0),
                candidate("medication", "", Some((3, 3)), 0),
            ],
        );

        assert!(agg.set.is_empty());
        let kinds: Vec<_> = agg.anomalies.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                AnomalyKind::Unaligned,
                AnomalyKind::TextMismatch,
                AnomalyKind::OutOfBounds,
                AnomalyKind::EmptySpan,
            ]
        );
    }

    #[test]
    fn test_chunk_offsets_are_applied() {
        let mut c = candidate("dosage", "81mg", Some((2, 6)), 0);
        c.chunk_start = 20;
        c.chunk_index = 1;

        let agg = Aggregator::default().aggregate(&doc(), vec![c]);
        assert_eq!(agg.set.extractions()[0].span, Span::new(22, 26));
    }

    #[test]
    fn test_no_candidates_yields_empty_set() {
        let agg = Aggregator::default().aggregate(&doc(), Vec::new());
        assert!(agg.set.is_empty());
        assert_eq!(agg.set.document_id.as_str(), "doc_test");
    }

    proptest! {
        #[test]
        fn prop_output_always_matches_document(
            raw in prop::collection::vec((0usize..60, 0usize..12, 0usize..3, any::<bool>()), 0..40)
        ) {
            let document = doc();
            let chars: Vec<char> = TEXT.chars().collect();
            let candidates: Vec<_> = raw
                .into_iter()
                .map(|(start, len, pass, honest)| {
                    let end = start + len;
                    let text = if honest && end <= chars.len() {
                        chars[start..end].iter().collect::<String>()
                    } else {
                        "bogus".to_string()
                    };
                    candidate("x", &text, Some((start, end)), pass)
                })
                .collect();

            let agg = Aggregator::default().aggregate(&document, candidates);

            let kept = agg.set.extractions();
            for e in kept {
                prop_assert_eq!(document.slice(e.span.start, e.span.end), Some(e.text.as_str()));
            }
            for (i, a) in kept.iter().enumerate() {
                for b in &kept[i + 1..] {
                    prop_assert_eq!(a.span.overlap(&b.span), 0);
                }
            }
        }
    }
}
