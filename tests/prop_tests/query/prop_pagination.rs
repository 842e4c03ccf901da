use devcamper::query::{QueryLimits, QuerySpec, RawParams, ResourceQueryEngine, paginate};
use devcamper::store::Engine;
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_page_info_matches_window_arithmetic(total in 0u64..10_000, page in 1u64..500, size in 1u64..=100) {
        let info = paginate(total, page, size);
        prop_assert_eq!(info.has_next, page * size < total);
        prop_assert_eq!(info.has_previous, page > 1);
        prop_assert_eq!(info.next.is_some(), info.has_next);
        prop_assert_eq!(info.previous.map(|w| w.page), info.has_previous.then(|| page - 1));
    }

    #[test]
    fn prop_limit_is_clamped_and_positive(limit in 1i64..1_000_000) {
        let params: RawParams = [("limit".to_string(), limit.to_string())].into();
        let spec = QuerySpec::build(&params, &QueryLimits::default(), &[]).unwrap();
        prop_assert_eq!(spec.page_size(), u64::try_from(limit).unwrap().min(100));
    }

    #[test]
    fn prop_non_positive_limit_is_rejected(limit in -1_000i64..=0) {
        let params: RawParams = [("limit".to_string(), limit.to_string())].into();
        prop_assert!(QuerySpec::build(&params, &QueryLimits::default(), &[]).is_err());
    }
}

proptest! {
    #![proptest_config(proptest::test_runner::Config { cases: 32, .. proptest::test_runner::Config::default() })]
    #[test]
    fn prop_pages_past_the_end_are_empty(n in 0usize..30, size in 1u64..10, extra in 1u64..5) {
        let engine = Engine::new();
        let col = engine.create_collection("items");
        for i in 0..n {
            col.insert(bson::doc! {"i": i64::try_from(i).unwrap()}).unwrap();
        }
        let total = u64::try_from(n).unwrap();
        let last = total.div_ceil(size).max(1);
        let page = last + extra;
        let params: RawParams = [
            ("page".to_string(), page.to_string()),
            ("limit".to_string(), size.to_string()),
        ]
        .into();
        let spec = QuerySpec::build(&params, &QueryLimits::default(), &[]).unwrap();
        let res = ResourceQueryEngine::default().execute(&spec, col.as_ref()).unwrap();
        prop_assert!(res.data.is_empty());
        prop_assert_eq!(res.total, total);
        prop_assert!(!res.pagination.has_next);
    }
}
