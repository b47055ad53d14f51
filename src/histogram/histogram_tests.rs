#[cfg(test)]
mod tests {
    use crate::common::encoding::{write_bytes, write_i64, write_str, write_uvarint};
    use crate::common::time::{MILLIS_PER_DAY, MILLIS_PER_HOUR};
    use crate::config::FacetSettings;
    use crate::error::FacetError;
    use crate::facets::{
        CountFacet, Facet, FacetCollector, FacetContext, FacetRegistry, FacetType, TermsFacet,
    };
    use crate::histogram::{
        histogram_to_bytes, read_histogram, reduce, CollectorState, FacetedDateHistogram,
        FinalBucket, HistogramCollector, HistogramFacetType, HistogramRequest, ENCODING_VERSION,
    };
    use crate::partition::{Document, MemoryPartition, PartitionContext};
    use serde_json::{json, Value};
    use std::sync::Arc;

    const WEEK_1: i64 = 1341187200000;
    const WEEK_2: i64 = 1341792000000;

    fn isolated_context() -> FacetContext {
        FacetContext::new(
            Arc::new(FacetRegistry::with_defaults()),
            FacetSettings::default(),
        )
    }

    fn request(body: Value) -> HistogramRequest {
        HistogramRequest::parse("h", &body, &FacetRegistry::with_defaults()).unwrap()
    }

    fn count_request(interval: &str) -> HistogramRequest {
        request(json!({ "field": "ts", "interval": interval, "facet": { "count": {} } }))
    }

    fn terms_request(interval: &str) -> HistogramRequest {
        request(json!({
            "field": "ts",
            "interval": interval,
            "facet": { "terms": { "field": "tag" } }
        }))
    }

    fn tagged(ts: i64, tag: &str) -> Document {
        Document::new().numeric("ts", [ts]).keyword("tag", [tag])
    }

    fn collector(request: &HistogramRequest, context: &FacetContext) -> HistogramCollector {
        let factory = Arc::new(request.factory(context).unwrap());
        HistogramCollector::new(request, factory, context.recycler.clone())
    }

    fn collect(
        request: &HistogramRequest,
        partition: &PartitionContext,
        context: &FacetContext,
    ) -> Result<FacetedDateHistogram, FacetError> {
        let mut collector = collector(request, context);
        collector.bind_partition(partition)?;
        for doc in 0..partition.max_doc() {
            collector.observe(doc)?;
        }
        collector.finish()
    }

    fn partition(ordinal: usize, docs: Vec<Document>) -> PartitionContext {
        MemoryPartition::from_documents(ordinal, docs).into_context()
    }

    fn count_at(histogram: &FacetedDateHistogram, key: i64) -> Option<u64> {
        histogram
            .get(key)
            .and_then(|facet| facet.as_any().downcast_ref::<CountFacet>())
            .map(|facet| facet.count)
    }

    fn terms_at(histogram: &FacetedDateHistogram, key: i64) -> TermsFacet {
        histogram
            .get(key)
            .and_then(|facet| facet.as_any().downcast_ref::<TermsFacet>())
            .cloned()
            .unwrap()
    }

    fn count_histogram(buckets: &[(i64, u64)]) -> FacetedDateHistogram {
        FacetedDateHistogram::from_buckets(
            "h",
            buckets
                .iter()
                .map(|&(key, count)| FinalBucket::new(key, Box::new(CountFacet { count })))
                .collect(),
        )
    }

    #[test]
    fn test_weekly_terms() {
        let context = FacetContext::default();
        let partition = partition(
            0,
            vec![
                tagged(WEEK_1 + MILLIS_PER_DAY + 10 * MILLIS_PER_HOUR, "a"),
                tagged(WEEK_1 + 3 * MILLIS_PER_DAY, "a"),
                tagged(WEEK_2 + 2 * MILLIS_PER_HOUR, "b"),
            ],
        );

        let histogram = collect(&terms_request("week"), &partition, &context).unwrap();
        assert_eq!(histogram.keys(), vec![WEEK_1, WEEK_2]);

        let first = terms_at(&histogram, WEEK_1);
        assert_eq!(first.entries.len(), 1);
        assert_eq!(first.count_of("a"), Some(2));

        let second = terms_at(&histogram, WEEK_2);
        assert_eq!(second.entries.len(), 1);
        assert_eq!(second.count_of("b"), Some(1));
    }

    #[test]
    fn test_reduce_merges_nested_results_per_key() {
        let context = FacetContext::default();
        let request = terms_request("1s");
        let first = partition(0, vec![tagged(1000, "x"), tagged(1200, "x"), tagged(1999, "y")]);
        let second = partition(1, vec![tagged(1500, "x")]);

        let partials = vec![
            collect(&request, &first, &context).unwrap(),
            collect(&request, &second, &context).unwrap(),
        ];
        let merged = reduce("h", partials, &context).unwrap();

        assert_eq!(merged.keys(), vec![1000]);
        let terms = terms_at(&merged, 1000);
        assert_eq!(terms.count_of("x"), Some(3));
        assert_eq!(terms.count_of("y"), Some(1));
        assert_eq!(terms.total, 4);
    }

    #[test]
    fn test_reduce_disjoint_keys_is_a_sorted_union() {
        let merged = reduce(
            "h",
            vec![
                count_histogram(&[(3000, 1), (1000, 2)]),
                count_histogram(&[(2000, 5)]),
                count_histogram(&[]),
            ],
            &FacetContext::default(),
        )
        .unwrap();
        assert_eq!(merged.keys(), vec![1000, 2000, 3000]);
        assert_eq!(count_at(&merged, 2000), Some(5));
    }

    #[test]
    fn test_reduce_of_nothing_is_empty() {
        let merged = reduce("nothing", Vec::new(), &FacetContext::default()).unwrap();
        assert!(merged.is_empty());
        assert_eq!(merged.name(), "nothing");
    }

    #[test]
    fn test_reduce_single_partial_keeps_results() {
        let context = isolated_context();
        let partition = partition(
            0,
            vec![
                Document::new().numeric("ts", [5000]),
                Document::new().numeric("ts", [10]),
                Document::new().numeric("ts", [5001]),
            ],
        );
        let partial = collect(&count_request("1s"), &partition, &context).unwrap();
        let merged = reduce("h", vec![partial], &context).unwrap();

        assert_eq!(merged.keys(), vec![0, 5000]);
        assert_eq!(count_at(&merged, 0), Some(1));
        assert_eq!(count_at(&merged, 5000), Some(2));
        assert_eq!(context.recycler.merge_map_stats().acquired, 0);
    }

    #[test]
    fn test_reduce_rejects_mixed_nested_types() {
        let terms = FacetedDateHistogram::from_buckets(
            "h",
            vec![FinalBucket::new(1000, Box::new(TermsFacet::default()))],
        );
        let err = reduce(
            "h",
            vec![count_histogram(&[(1000, 1)]), terms],
            &FacetContext::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            FacetError::MergeTypeMismatch {
                key: Some(1000),
                expected: "count".to_string(),
                found: "terms".to_string(),
            }
        );
    }

    #[test]
    fn test_multi_valued_document_visits_a_bucket_per_distinct_value() {
        let partition = partition(
            0,
            vec![
                Document::new().numeric("ts", [100, 200, 200, 1500]),
                Document::new().numeric("ts", [1700]),
            ],
        );
        let histogram =
            collect(&count_request("1s"), &partition, &FacetContext::default()).unwrap();
        assert_eq!(count_at(&histogram, 0), Some(2));
        assert_eq!(count_at(&histogram, 1000), Some(2));
    }

    #[test]
    fn test_two_values_in_one_bucket_are_two_observations() {
        let partition = partition(0, vec![Document::new().numeric("ts", [100, 200])]);
        let histogram =
            collect(&count_request("1s"), &partition, &FacetContext::default()).unwrap();
        assert_eq!(histogram.keys(), vec![0]);
        assert_eq!(count_at(&histogram, 0), Some(2));
    }

    #[test]
    fn test_final_bucket_equality_compares_nested_results() {
        let bucket = |key: i64, count: u64| FinalBucket::new(key, Box::new(CountFacet { count }));
        assert_eq!(bucket(1000, 2), bucket(1000, 2));
        assert_ne!(bucket(1000, 2), bucket(1000, 3));
        assert_ne!(bucket(1000, 2), bucket(2000, 2));
        assert_ne!(
            bucket(1000, 0),
            FinalBucket::new(1000, Box::new(TermsFacet::default()))
        );
    }

    #[test]
    fn test_documents_without_key_values_are_skipped() {
        let partition = partition(
            0,
            vec![
                Document::new().keyword("tag", ["a"]),
                Document::new().numeric("ts", [42]),
            ],
        );
        let histogram =
            collect(&count_request("1s"), &partition, &FacetContext::default()).unwrap();
        assert_eq!(histogram.keys(), vec![0]);
        assert_eq!(count_at(&histogram, 0), Some(1));
    }

    #[test]
    fn test_factor_scales_raw_values() {
        let request = request(json!({
            "field": "ts",
            "interval": "minute",
            "factor": 1000,
            "facet": { "count": {} }
        }));
        let partition = partition(
            0,
            vec![
                Document::new().numeric("ts", [59]),
                Document::new().numeric("ts", [61]),
            ],
        );
        let histogram = collect(&request, &partition, &FacetContext::default()).unwrap();
        assert_eq!(histogram.keys(), vec![0, 60_000]);
    }

    #[test]
    fn test_missing_key_field_fails_at_bind() {
        let partition = partition(0, vec![Document::new().numeric("other", [1])]);
        let mut collector = collector(&count_request("1s"), &FacetContext::default());
        let err = collector.bind_partition(&partition).unwrap_err();
        assert_eq!(err, FacetError::MissingField("ts".to_string()));
        assert_eq!(collector.state(), CollectorState::Unbound);
    }

    #[test]
    fn test_nested_failure_names_facet_and_bucket() {
        let context = isolated_context();
        let partition = partition(0, vec![Document::new().numeric("ts", [2500])]);

        let err = collect(&terms_request("1s"), &partition, &context).unwrap_err();
        assert_eq!(
            err,
            FacetError::NestedAggregation {
                facet: "h".to_string(),
                key: 2000,
                source: Box::new(FacetError::MissingField("tag".to_string())),
            }
        );
        assert_eq!(err.root_cause(), &FacetError::MissingField("tag".to_string()));

        let stats = context.recycler.table_stats();
        assert_eq!(stats.acquired, 1);
        assert_eq!(stats.released, 1);
    }

    #[test]
    fn test_collector_state_transitions() {
        let context = FacetContext::default();
        let partition = partition(0, vec![Document::new().numeric("ts", [1])]);
        let mut collector = collector(&count_request("1s"), &context);

        assert!(matches!(collector.observe(0), Err(FacetError::IllegalState(_))));
        collector.bind_partition(&partition).unwrap();
        assert_eq!(collector.state(), CollectorState::Bound);
        collector.observe(0).unwrap();
        assert_eq!(collector.state(), CollectorState::Collecting);

        let result = collector.finalize().unwrap();
        assert_eq!(result.type_name(), "faceted_date_histogram");
        assert_eq!(collector.state(), CollectorState::Finalized);
        assert!(matches!(collector.finish(), Err(FacetError::IllegalState(_))));
        assert!(matches!(collector.observe(0), Err(FacetError::IllegalState(_))));
        assert!(matches!(
            collector.bind_partition(&partition),
            Err(FacetError::IllegalState(_))
        ));
    }

    #[test]
    fn test_rebinding_moves_existing_buckets_to_the_new_partition() {
        let context = FacetContext::default();
        let first = partition(0, vec![tagged(1000, "x"), tagged(2000, "y")]);
        let second = partition(1, vec![tagged(1100, "z"), tagged(1200, "x")]);

        let mut collector = collector(&terms_request("1s"), &context);
        for partition in [&first, &second] {
            collector.bind_partition(partition).unwrap();
            for doc in 0..partition.max_doc() {
                collector.observe(doc).unwrap();
            }
        }
        assert_eq!(collector.bucket_count(), 2);
        let histogram = collector.finish().unwrap();

        let terms = terms_at(&histogram, 1000);
        assert_eq!(terms.count_of("x"), Some(2));
        assert_eq!(terms.count_of("z"), Some(1));
        assert_eq!(terms_at(&histogram, 2000).count_of("y"), Some(1));
    }

    #[test]
    fn test_pooled_tables_are_released_exactly_once() {
        let context = isolated_context();
        let request = count_request("1s");
        let partials: Vec<_> = (0..3)
            .map(|i| {
                let docs = vec![Document::new().numeric("ts", [i * 1000, 500])];
                collect(&request, &partition(i as usize, docs), &context).unwrap()
            })
            .collect();

        let stats = context.recycler.table_stats();
        assert_eq!(stats.acquired, 3);
        assert_eq!(stats.released, 0);

        let merged = reduce("h", partials, &context).unwrap();
        assert_eq!(count_at(&merged, 0), Some(4));

        let stats = context.recycler.table_stats();
        assert_eq!(stats.released, 3);
        let merge_stats = context.recycler.merge_map_stats();
        assert_eq!(merge_stats.acquired, 1);
        assert_eq!(merge_stats.released, 1);
    }

    #[test]
    fn test_tables_are_released_when_reduce_fails() {
        let context = isolated_context();
        let partition = partition(0, vec![Document::new().numeric("ts", [1000])]);
        let partial = collect(&count_request("1s"), &partition, &context).unwrap();
        let terms = FacetedDateHistogram::from_buckets(
            "h",
            vec![FinalBucket::new(1000, Box::new(TermsFacet::default()))],
        );

        assert!(reduce("h", vec![partial, terms], &context).is_err());
        let stats = context.recycler.table_stats();
        assert_eq!(stats.acquired, stats.released);
        let merge_stats = context.recycler.merge_map_stats();
        assert_eq!(merge_stats.acquired, merge_stats.released);
    }

    #[test]
    fn test_round_trip() {
        let context = FacetContext::default();
        let partition = partition(
            0,
            vec![
                tagged(WEEK_2, "b"),
                Document::new().numeric("ts", [WEEK_1, WEEK_2 + 1]).keyword("tag", ["a", "c"]),
                tagged(-MILLIS_PER_DAY, "old"),
            ],
        );
        let histogram = collect(&terms_request("day"), &partition, &context).unwrap();

        let bytes = histogram_to_bytes(&histogram).unwrap();
        let read = read_histogram(&bytes, &context).unwrap();
        assert_eq!(read, histogram);
        assert_eq!(read.keys(), vec![-MILLIS_PER_DAY, WEEK_1, WEEK_2]);
        assert_eq!(terms_at(&read, WEEK_2).count_of("b"), Some(1));
        assert_eq!(terms_at(&read, WEEK_2).count_of("c"), Some(1));
    }

    #[test]
    fn test_nested_histograms() {
        let context = FacetContext::default();
        let request = request(json!({
            "field": "ts",
            "interval": "day",
            "facet": {
                "faceted_date_histogram": {
                    "field": "ts",
                    "interval": "hour",
                    "facet": { "count": {} }
                }
            }
        }));
        let first = partition(
            0,
            vec![
                Document::new().numeric("ts", [MILLIS_PER_HOUR + 1]),
                Document::new().numeric("ts", [MILLIS_PER_DAY + 5]),
            ],
        );
        let second = partition(1, vec![Document::new().numeric("ts", [MILLIS_PER_HOUR + 2])]);

        let partials = vec![
            collect(&request, &first, &context).unwrap(),
            collect(&request, &second, &context).unwrap(),
        ];
        let merged = reduce("h", partials, &context).unwrap();
        assert_eq!(merged.keys(), vec![0, MILLIS_PER_DAY]);

        let inner = merged
            .get(0)
            .and_then(|facet| facet.as_any().downcast_ref::<FacetedDateHistogram>())
            .unwrap();
        assert_eq!(inner.keys(), vec![MILLIS_PER_HOUR]);
        assert_eq!(count_at(inner, MILLIS_PER_HOUR), Some(2));

        let bytes = histogram_to_bytes(&merged).unwrap();
        let read = HistogramFacetType.read(&bytes, &context).unwrap();
        assert!(read.facet_eq(&merged));
    }

    #[test]
    fn test_named_document() {
        let histogram = count_histogram(&[(2000, 1), (1000, 2)]);
        assert_eq!(
            histogram.to_named_document(),
            json!({
                "h": {
                    "_type": "faceted_date_histogram",
                    "entries": [
                        { "time": 1000, "facet": { "_type": "count", "count": 2 } },
                        { "time": 2000, "facet": { "_type": "count", "count": 1 } }
                    ]
                }
            })
        );
        assert_eq!(
            FacetedDateHistogram::empty("e").to_named_document(),
            json!({ "e": { "_type": "faceted_date_histogram", "entries": [] } })
        );
    }

    fn count_payload(count: u64) -> Vec<u8> {
        let mut payload = Vec::new();
        CountFacet { count }.write_to(&mut payload).unwrap();
        payload
    }

    fn encode(buckets: &[(i64, &str, Vec<u8>)]) -> Vec<u8> {
        let mut buf = vec![ENCODING_VERSION];
        write_str(&mut buf, "h");
        write_uvarint(&mut buf, buckets.len() as u64);
        for (key, tag, payload) in buckets {
            write_i64(&mut buf, *key);
            write_str(&mut buf, tag);
            write_bytes(&mut buf, payload);
        }
        buf
    }

    #[test]
    fn test_read_rejects_malformed_input() {
        let context = FacetContext::default();
        let good = encode(&[(1000, "count", count_payload(1)), (2000, "count", count_payload(2))]);
        let read = read_histogram(&good, &context).unwrap();
        assert_eq!(read, count_histogram(&[(1000, 1), (2000, 2)]));

        let mut bad_version = good.clone();
        bad_version[0] = ENCODING_VERSION + 1;
        let mut trailing = good.clone();
        trailing.push(0);
        let truncated = &good[..good.len() - 1];
        let unknown_tag = encode(&[(1000, "nope", Vec::new())]);
        let unordered = encode(&[(2000, "count", count_payload(1)), (1000, "count", count_payload(1))]);
        let duplicate = encode(&[(1000, "count", count_payload(1)), (1000, "count", count_payload(1))]);

        for bytes in [
            bad_version.as_slice(),
            trailing.as_slice(),
            truncated,
            unknown_tag.as_slice(),
            unordered.as_slice(),
            duplicate.as_slice(),
            b"".as_slice(),
        ] {
            assert!(
                matches!(read_histogram(bytes, &context), Err(FacetError::Serialization(_))),
                "expected a serialization error for {bytes:?}"
            );
        }
    }

    #[test]
    fn test_read_wraps_nested_payload_errors() {
        let bytes = encode(&[(1000, "count", vec![0xff, 0xff, 0xff])]);
        let err = read_histogram(&bytes, &FacetContext::default()).unwrap_err();
        assert!(matches!(err, FacetError::NestedAggregation { key: 1000, .. }));
        assert!(matches!(err.root_cause(), FacetError::Serialization(_)));
    }
}
