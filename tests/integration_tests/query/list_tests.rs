use crate::integration_tests::support::{params, service};
use bson::doc;
use devcamper::ApiError;
use devcamper::api::{error_response, list_response};

fn priced() -> devcamper::Service {
    let svc = service();
    for (title, tuition) in [("a", 50), ("b", 100), ("c", 300), ("d", 500), ("e", 700)] {
        svc.create_child("courses", "b1", doc! {"title": title, "tuition": tuition, "minimumSkill": "beginner"})
            .unwrap();
    }
    svc
}

#[test]
fn inclusive_range_returns_records_between_bounds() {
    let svc = priced();
    let page = svc
        .list("courses", &params(&[("tuition[gte]", "100"), ("tuition[lte]", "500"), ("sort", "tuition")]))
        .unwrap();
    assert_eq!(page.total, 3);
    let titles: Vec<&str> = page.data.iter().map(|d| d.get_str("title").unwrap()).collect();
    assert_eq!(titles, vec!["b", "c", "d"]);
}

#[test]
fn membership_and_equality_filters() {
    let svc = priced();
    let page = svc.list("courses", &params(&[("title[in]", "a,e,zzz,a")])).unwrap();
    assert_eq!(page.total, 2);
    let page = svc.list("courses", &params(&[("minimumSkill", "beginner"), ("tuition", "300")])).unwrap();
    assert_eq!(page.total, 1);
    let page = svc.list("bootcamps", &params(&[("housing", "true")])).unwrap();
    assert_eq!(page.total, 1);
}

#[test]
fn select_limits_fields_and_keeps_id() {
    let svc = priced();
    let page = svc.list("courses", &params(&[("select", "title"), ("limit", "1")])).unwrap();
    let rec = &page.data[0];
    assert!(rec.get("title").is_some());
    assert!(rec.get("_id").is_some());
    assert!(rec.get("tuition").is_none());
    assert_eq!(page.total, 5);
    assert!(page.pagination.has_next);
}

#[test]
fn list_expands_parent_summary() {
    let svc = priced();
    let page = svc.list("courses", &params(&[("limit", "1")])).unwrap();
    let camp = page.data[0].get_document("bootcamp").unwrap();
    assert_eq!(camp.get_str("name").unwrap(), "Devworks");
    assert!(camp.get("housing").is_none());
}

#[test]
fn default_sort_is_newest_first() {
    let svc = priced();
    let page = svc.list("courses", &params(&[])).unwrap();
    let stamps: Vec<i64> = page
        .data
        .iter()
        .map(|d| d.get_datetime("createdAt").unwrap().timestamp_millis())
        .collect();
    assert_eq!(stamps.len(), 5);
    assert!(stamps.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn paging_past_the_end_is_empty() {
    let svc = priced();
    let page = svc.list("courses", &params(&[("page", "4"), ("limit", "2")])).unwrap();
    assert!(page.data.is_empty());
    assert_eq!(page.total, 5);
    assert!(!page.pagination.has_next);
    let body = list_response(&page).body;
    assert_eq!(body["count"], 5);
    assert_eq!(body["pagination"]["previous"]["page"], 3);
}

#[test]
fn oversized_limit_is_clamped() {
    let svc = service();
    for i in 0..120 {
        svc.create("users", doc! {"name": format!("user-{i}"), "email": format!("u{i}@example.com")}).unwrap();
    }
    let page = svc.list("users", &params(&[("limit", "1000")])).unwrap();
    assert_eq!(page.data.len(), 100);
    assert_eq!(page.pagination.next.map(|w| w.limit), Some(100));
}

#[test]
fn bad_controls_render_as_client_errors() {
    let svc = priced();
    for (k, v) in [("limit", "0"), ("limit", "-1"), ("page", "x"), ("tuition[near]", "5")] {
        let err = svc.list("courses", &params(&[(k, v)])).unwrap_err();
        assert!(matches!(err, ApiError::Validation { .. }), "{k}={v}");
        let resp = error_response(&err);
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body["success"], false);
    }
    assert_eq!(error_response(&svc.list("payments", &params(&[])).unwrap_err()).status, 404);
}

#[test]
fn digit_strings_match_string_fields_verbatim() {
    let svc = service();
    svc.create("bootcamps", doc! {"_id": "b2", "name": "Codemasters", "zipcode": "02118", "phone": "5551234"})
        .unwrap();
    svc.create("bootcamps", doc! {"_id": "b3", "name": "Devcentral", "zipcode": "2118"}).unwrap();
    let page = svc.list("bootcamps", &params(&[("zipcode", "02118")])).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].get_str("_id").unwrap(), "b2");
    assert_eq!(svc.list("bootcamps", &params(&[("phone", "5551234")])).unwrap().total, 1);
    assert_eq!(svc.list("bootcamps", &params(&[("zipcode[in]", "99999,02118")])).unwrap().total, 1);
}

#[test]
fn oversized_membership_list_fails_instead_of_truncating() {
    let svc = service();
    svc.create("users", doc! {"name": "target"}).unwrap();
    let mut names: Vec<String> = (0..1000).map(|i| format!("decoy{i}")).collect();
    names.push("target".into());
    let list = names.join(",");
    let err = svc.list("users", &params(&[("name[in]", list.as_str())])).unwrap_err();
    assert!(matches!(err, ApiError::Validation { ref field, .. } if field == "name"));
    assert_eq!(error_response(&err).status, 400);
    let last = names[1..].join(",");
    assert_eq!(svc.list("users", &params(&[("name[in]", last.as_str())])).unwrap().total, 1);
}
