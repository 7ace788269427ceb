use crate::{
    diagnostics::{DiagnosticLogger, InternalMessageId, LoggingSeverity},
    models::context_tag_keys::{OPERATION_ID, USER_ID},
    telemetry_item::{TelemetryItem, TelemetryKind},
};
use serde_json::{json, Value};

const MIN_INPUT_LENGTH: usize = 8;
const FULL_SAMPLE_RATE: f64 = 100.0;

/// Deterministic sampling by user or operation id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Sampler {
    sample_rate: f64,
}

impl Sampler {
    /// Rates outside `0..=100` are reported and replaced by 100, which disables sampling.
    pub(crate) fn new(logger: &DiagnosticLogger, sample_rate: f64) -> Self {
        let sample_rate = if (0.0..=FULL_SAMPLE_RATE).contains(&sample_rate) {
            sample_rate
        } else {
            logger.throw_internal(
                LoggingSeverity::Critical,
                InternalMessageId::SampleRateOutOfRange,
                "Sampling rate is out of range (0..100). Sampling will be disabled, you may be sending too much data which may affect your AI service level.",
                Some(json!({ "samplingRate": sample_rate })),
                true,
            );
            FULL_SAMPLE_RATE
        };
        Self { sample_rate }
    }

    pub(crate) fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Whether the item is kept. Metrics are never sampled out.
    pub(crate) fn is_sampled_in(&self, kind: &TelemetryKind, item: &TelemetryItem) -> bool {
        if self.sample_rate >= FULL_SAMPLE_RATE || *kind == TelemetryKind::Metric {
            return true;
        }
        sampling_score(item) < self.sample_rate
    }
}

fn tag<'a>(item: &'a TelemetryItem, key: &str) -> Option<&'a str> {
    item.tags
        .iter()
        .find_map(|tags| tags.get(key))
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

/// Score in `0..=100` of an item. Items of the same user or operation share a score.
pub(crate) fn sampling_score(item: &TelemetryItem) -> f64 {
    let key = tag(item, USER_ID.as_str())
        .or_else(|| item.ext.user.id.as_deref().filter(|id| !id.is_empty()))
        .or_else(|| tag(item, OPERATION_ID.as_str()))
        .or_else(|| item.ext.trace.trace_id.as_deref().filter(|id| !id.is_empty()));
    match key {
        Some(key) => hash_code_score(key),
        None => rand::random::<f64>() * FULL_SAMPLE_RATE,
    }
}

fn hash_code_score(key: &str) -> f64 {
    hash_code(key) as f64 / i32::MAX as f64 * FULL_SAMPLE_RATE
}

/// Absolute value of the 32-bit djb2 hash over the UTF-16 code units of `input`. Short inputs
/// are repeated until they are at least 8 units long.
pub(crate) fn hash_code(input: &str) -> i64 {
    let mut units: Vec<u16> = input.encode_utf16().collect();
    if units.is_empty() {
        return 0;
    }
    while units.len() < MIN_INPUT_LENGTH {
        units.extend_from_within(..);
    }
    let hash = units.iter().fold(5381i32, |hash, unit| {
        (hash << 5).wrapping_add(hash).wrapping_add(i32::from(*unit))
    });
    i64::from(hash).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry_item::{Extensions, UserExt};
    use serde_json::Map;
    use test_case::test_case;

    fn hash_reference(input: &str) -> i64 {
        let mut input: Vec<u16> = input.encode_utf16().collect();
        while input.len() < MIN_INPUT_LENGTH {
            input = [input.clone(), input].concat();
        }
        let mut hash: i64 = 5381;
        for unit in input {
            hash = (((hash << 5) + hash + i64::from(unit)) as i32).into();
        }
        hash.abs()
    }

    #[test_case("" ; "empty")]
    #[test_case("a" ; "single")]
    #[test_case("abcdefgh" ; "exact length")]
    #[test_case("f8bcf1c0-6a8c-4c52-a2e2-6a3b7f9b0e11" ; "guid")]
    #[test_case("ünïcödé" ; "non ascii")]
    fn hash_matches_reference(input: &str) {
        if input.is_empty() {
            assert_eq!(0, hash_code(input));
        } else {
            assert_eq!(hash_reference(input), hash_code(input));
        }
    }

    #[test]
    fn short_inputs_are_repeated() {
        assert_eq!(hash_code("abababab"), hash_code("ab"));
        assert_eq!(hash_code("abcabcabcabc"), hash_code("abc"));
    }

    #[test]
    fn score_is_a_percentage() {
        for key in ["a", "user1", "00000000-0000-0000-0000-000000000000"] {
            let score = hash_code_score(key);
            assert!((0.0..=100.0).contains(&score), "{} -> {}", key, score);
        }
    }

    #[test]
    fn user_tag_wins_over_ext() {
        let mut tags = Map::new();
        tags.insert("ai.user.id".into(), Value::from("from-tag"));
        let item = TelemetryItem::new("EventData")
            .with_tags(tags)
            .with_ext(Extensions {
                user: UserExt {
                    id: Some("from-ext".into()),
                    ..Default::default()
                },
                ..Default::default()
            });
        assert_eq!(hash_code_score("from-tag"), sampling_score(&item));
    }

    #[test]
    fn same_user_gets_same_decision() {
        let logger = DiagnosticLogger::default();
        let sampler = Sampler::new(&logger, 50.0);
        let item = |user: &str| {
            TelemetryItem::new("EventData").with_ext(Extensions {
                user: UserExt {
                    id: Some(user.into()),
                    ..Default::default()
                },
                ..Default::default()
            })
        };
        for user in ["alice", "bob", "carol"] {
            let first = sampler.is_sampled_in(&TelemetryKind::Event, &item(user));
            assert_eq!(first, sampler.is_sampled_in(&TelemetryKind::Event, &item(user)));
            assert_eq!(hash_code_score(user) < 50.0, first);
        }
    }

    #[test]
    fn metrics_are_always_sampled_in() {
        let logger = DiagnosticLogger::default();
        let sampler = Sampler::new(&logger, 0.0);
        let item = TelemetryItem::new("MetricData");
        assert!(sampler.is_sampled_in(&TelemetryKind::Metric, &item));
        assert!(!sampler.is_sampled_in(&TelemetryKind::Event, &item));
    }

    #[test_case(-1.0 ; "negative")]
    #[test_case(101.0 ; "above hundred")]
    fn out_of_range_rate_disables_sampling(rate: f64) {
        let logger = DiagnosticLogger::default();
        let sampler = Sampler::new(&logger, rate);
        assert_eq!(100.0, sampler.sample_rate());
        assert_eq!(1, logger.times_reported(InternalMessageId::SampleRateOutOfRange));
        assert!(sampler.is_sampled_in(&TelemetryKind::Event, &TelemetryItem::new("EventData")));
    }
}
