use devcamper::query::RawParams;
use devcamper::{Service, ServiceOptions};

pub fn params(pairs: &[(&str, &str)]) -> RawParams {
    pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

/// Service with one bootcamp `b1` ("Devworks").
pub fn service_with(options: ServiceOptions) -> Service {
    let svc = Service::in_memory(options);
    svc.create(
        "bootcamps",
        bson::doc! {"_id": "b1", "name": "Devworks", "description": "Full stack web development", "housing": true},
    )
    .unwrap();
    svc
}

pub fn service() -> Service {
    service_with(ServiceOptions::default())
}
