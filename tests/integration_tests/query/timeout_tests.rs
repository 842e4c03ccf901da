use crate::integration_tests::support::{params, service_with};
use devcamper::api::error_response;
use devcamper::query::EngineOptions;
use devcamper::{ApiError, ServiceOptions};
use std::time::Duration;

fn slow_options(concurrent_reads: bool) -> ServiceOptions {
    ServiceOptions {
        engine: EngineOptions { concurrent_reads, store_timeout_ms: Some(10) },
        ..ServiceOptions::default()
    }
}

#[test]
fn slow_store_surfaces_retryable_timeout() {
    for concurrent in [false, true] {
        let svc = service_with(slow_options(concurrent));
        let camps = svc.store().get_collection("bootcamps").unwrap();
        camps.set_read_delay(Duration::from_millis(60));
        let err = svc.list("bootcamps", &params(&[])).unwrap_err();
        assert!(matches!(err, ApiError::StoreTimeout(_)), "concurrent={concurrent}: {err:?}");
        assert!(err.is_retryable());
        assert_eq!(error_response(&err).status, 504);
    }
}

#[test]
fn fast_store_is_unaffected_by_deadline() {
    let svc = service_with(ServiceOptions {
        engine: EngineOptions { concurrent_reads: true, store_timeout_ms: Some(5_000) },
        ..ServiceOptions::default()
    });
    let page = svc.list("bootcamps", &params(&[])).unwrap();
    assert_eq!(page.total, 1);
}

#[test]
fn unavailable_store_is_a_server_error() {
    let svc = service_with(ServiceOptions::default());
    svc.store().get_collection("bootcamps").unwrap().set_unavailable(true);
    let err = svc.list("bootcamps", &params(&[])).unwrap_err();
    let resp = error_response(&err);
    assert_eq!(resp.status, 503);
    assert!(resp.body["error"].as_str().unwrap().contains("unavailable"));
}
