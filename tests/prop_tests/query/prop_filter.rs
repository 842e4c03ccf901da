use devcamper::query::{FindOptions, QueryLimits, QuerySpec, RawParams, translate};
use devcamper::store::{Engine, ResourceCollection};
use proptest::prelude::*;

fn params(pairs: &[(&str, String)]) -> RawParams {
    pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
}

proptest! {
    #![proptest_config(proptest::test_runner::Config { cases: 48, .. proptest::test_runner::Config::default() })]
    #[test]
    fn prop_range_filter_returns_exactly_matching_records(
        prices in proptest::collection::vec(0i64..1_000, 0..25),
        lo in 0i64..1_000,
        span in 0i64..1_000,
    ) {
        let hi = lo + span;
        let engine = Engine::new();
        let col = engine.create_collection("courses");
        for p in &prices {
            col.insert(bson::doc! {"price": *p}).unwrap();
        }
        let expr = translate(&params(&[("price[gte]", lo.to_string()), ("price[lte]", hi.to_string())])).unwrap();
        let found = col.find(&expr.to_filter(), &FindOptions::default()).unwrap();
        let expected = prices.iter().filter(|p| (lo..=hi).contains(*p)).count();
        prop_assert_eq!(found.len(), expected);
        for d in &found {
            let p = d.get_i64("price").unwrap();
            prop_assert!(p >= lo && p <= hi);
        }
        prop_assert_eq!(col.count(&expr.to_filter(), None).unwrap(), u64::try_from(expected).unwrap());
    }

    #[test]
    fn prop_strict_bounds_and_membership(
        prices in proptest::collection::vec(0i64..50, 1..20),
        pivot in 0i64..50,
        members in proptest::collection::vec(0i64..50, 1..5),
    ) {
        let engine = Engine::new();
        let col = engine.create_collection("courses");
        for p in &prices {
            col.insert(bson::doc! {"price": *p}).unwrap();
        }
        let gt = translate(&params(&[("price[gt]", pivot.to_string())])).unwrap();
        let lt = translate(&params(&[("price[lt]", pivot.to_string())])).unwrap();
        let n_gt = col.count(&gt.to_filter(), None).unwrap();
        let n_lt = col.count(&lt.to_filter(), None).unwrap();
        let n_eq = prices.iter().filter(|p| **p == pivot).count();
        prop_assert_eq!(n_gt + n_lt + u64::try_from(n_eq).unwrap(), u64::try_from(prices.len()).unwrap());

        let list = members.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
        let within = translate(&params(&[("price[in]", list)])).unwrap();
        let expected = prices.iter().filter(|p| members.contains(p)).count();
        prop_assert_eq!(col.count(&within.to_filter(), None).unwrap(), u64::try_from(expected).unwrap());
    }

    #[test]
    fn prop_reserved_keys_never_filter(page in 1u64..50, limit in 1u64..50, field in "[a-z]{1,8}") {
        let p = params(&[
            ("page", page.to_string()),
            ("limit", limit.to_string()),
            ("select", field.clone()),
            ("sort", format!("-{field}")),
        ]);
        let spec = QuerySpec::build(&p, &QueryLimits::default(), &[]).unwrap();
        prop_assert!(spec.filter().is_empty());
    }
}
