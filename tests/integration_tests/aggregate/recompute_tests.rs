use crate::integration_tests::support::service;
use bson::{Bson, doc};
use devcamper::aggregate::{ChildEvent, MutationKind, Outcome, standard_dependencies};

fn average_cost(svc: &devcamper::Service) -> Bson {
    svc.derived_value("bootcamps", "b1", "averageCost").unwrap()
}

#[test]
fn ceil_to_ten_policy() {
    for (tuitions, expected) in [(vec![10, 20, 30], 20.0), (vec![11, 19, 30], 20.0), (vec![11, 19, 31], 30.0)] {
        let svc = service();
        for t in tuitions {
            svc.create_child("courses", "b1", doc! {"title": "c", "tuition": t}).unwrap();
        }
        assert_eq!(average_cost(&svc), Bson::Double(expected));
    }
}

#[test]
fn rating_mean_is_unrounded() {
    let svc = service();
    for (user, rating) in [("u1", 7), ("u2", 8), ("u3", 8)] {
        svc.create_child("reviews", "b1", doc! {"title": "ok", "rating": rating, "user": user}).unwrap();
    }
    let Bson::Double(v) = svc.derived_value("bootcamps", "b1", "averageRating").unwrap() else {
        panic!("expected a double");
    };
    assert!((v - 23.0 / 3.0).abs() < 1e-9);
}

#[test]
fn removing_every_child_leaves_null() {
    let svc = service();
    let a = svc.create_child("courses", "b1", doc! {"tuition": 100}).unwrap();
    let b = svc.create_child("courses", "b1", doc! {"tuition": 200}).unwrap();
    svc.delete("courses", a.get_str("_id").unwrap()).unwrap();
    assert_eq!(average_cost(&svc), Bson::Double(200.0));
    svc.delete("courses", b.get_str("_id").unwrap()).unwrap();
    assert_eq!(average_cost(&svc), Bson::Null);
}

#[test]
fn failed_write_back_does_not_fail_the_mutation_and_heals_later() {
    let svc = service();
    let c = svc.create_child("courses", "b1", doc! {"tuition": 100}).unwrap();
    let id = c.get_str("_id").unwrap().to_string();
    let camps = svc.store().get_collection("bootcamps").unwrap();

    camps.set_unavailable(true);
    let updated = svc.update("courses", &id, doc! {"tuition": 400}).unwrap();
    assert_eq!(updated.get_i32("tuition").unwrap(), 400);
    camps.set_unavailable(false);
    assert_eq!(average_cost(&svc), Bson::Double(100.0));

    svc.create_child("courses", "b1", doc! {"tuition": 200}).unwrap();
    assert_eq!(average_cost(&svc), Bson::Double(300.0));
}

#[test]
fn synthetic_events_drive_recompute_without_service() {
    let svc = service();
    let courses = svc.store().get_collection("courses").unwrap();
    courses.insert(doc! {"bootcamp": "b1", "tuition": 990}).unwrap();
    let dep = &standard_dependencies()[0];
    let child = doc! {"bootcamp": "b1", "tuition": 990};
    let out = svc.maintainer().on_child_mutated(ChildEvent {
        kind: &MutationKind::Created,
        child: &child,
        dependency: dep,
    });
    assert_eq!(out, vec![Outcome::Written { parent: "b1".into(), value: Bson::Double(990.0) }]);
}
