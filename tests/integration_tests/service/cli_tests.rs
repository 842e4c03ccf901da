use devcamper::cli::{Command, parse_params, run};
use devcamper::{Service, ServiceOptions};
use std::io::Write;

const FIXTURE: &str = r#"{
    "bootcamps": [
        {"_id": "5d713995b721c3bb38c1f5d0", "name": "Devworks Bootcamp", "description": "Full stack", "careers": ["Web Development", "UI/UX"]},
        {"_id": "5d713a66ec8f2b88b8f830b8", "name": "ModernTech Bootcamp", "description": "Front end", "careers": ["Business"]}
    ],
    "courses": [
        {"title": "Front End Web Development", "tuition": 10000, "bootcamp": "5d713995b721c3bb38c1f5d0"},
        {"title": "Full Stack Web Development", "tuition": 12000, "bootcamp": "5d713995b721c3bb38c1f5d0"},
        {"title": "UI/UX", "tuition": 8000, "bootcamp": "5d713a66ec8f2b88b8f830b8"}
    ]
}"#;

fn fixture_file() -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(FIXTURE.as_bytes()).unwrap();
    f
}

#[test]
fn query_with_seed_prints_filtered_page() {
    let svc = Service::in_memory(ServiceOptions::default());
    let f = fixture_file();
    let cmd = Command::Query {
        resource: "bootcamps".into(),
        params: parse_params(&["averageCost[gte]=10000", "select=name,averageCost"]).unwrap(),
        seed: Some(f.path().to_path_buf()),
    };
    let mut out = Vec::new();
    run(&svc, cmd, &mut out).unwrap();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["count"], 1);
    assert_eq!(v["data"][0]["name"], "Devworks Bootcamp");
    assert_eq!(v["data"][0]["averageCost"], 11000.0);
}

#[test]
fn seed_reports_counts_and_membership_filter_works_on_arrays() {
    let svc = Service::in_memory(ServiceOptions::default());
    let f = fixture_file();
    let mut out = Vec::new();
    run(&svc, Command::Seed { file: f.path().to_path_buf() }, &mut out).unwrap();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["seeded"]["bootcamps"], 2);
    assert_eq!(v["seeded"]["courses"], 3);
    let page = svc.list("bootcamps", &parse_params(&["careers[in]=Business,Data Science"]).unwrap()).unwrap();
    assert_eq!(page.total, 1);
}

#[test]
fn bad_fixture_is_rejected() {
    let svc = Service::in_memory(ServiceOptions::default());
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(b"{\"bootcamps\": {}}").unwrap();
    assert!(run(&svc, Command::Seed { file: f.path().to_path_buf() }, &mut Vec::new()).is_err());
    let missing = Command::Seed { file: "/no/such/fixture.json".into() };
    assert!(run(&svc, missing, &mut Vec::new()).is_err());
}
