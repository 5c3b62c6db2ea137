mod test_support;

use serde_json::json;
use test_support::{departments, requests_to, row_ids, spawn_sidecar};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn students(ids: &[&str]) -> serde_json::Value {
    let rows: Vec<_> = ids
        .iter()
        .map(|id| {
            json!({
                "userID": id,
                "name": format!("Student {id}"),
                "surname": "Okafor",
                "gender": "female",
                "classID": "F2"
            })
        })
        .collect();
    json!(rows)
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_is_reconciled_after_confirmation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/departments/school/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(departments("d", 6)))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/departments/delete/d6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "deleted" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/departments/delete/d1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "not found" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/activitylog/create"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut sidecar = spawn_sidecar(&format!("{}/api", server.uri()), &[]);
    sidecar.login_and_open("departments");
    sidecar.request_ok("1", "scope.select", json!({ "screen": "departments", "scopeId": "u1" }));
    let on_last_page = sidecar.request_ok("2", "page.set", json!({ "screen": "departments", "page": 1 }));
    assert_eq!(row_ids(&on_last_page["view"]), vec!["d6"]);

    let deleted = sidecar.request_ok(
        "3",
        "row.action",
        json!({ "screen": "departments", "action": "delete", "id": "d6" }),
    );
    assert_eq!(deleted["applied"], true);
    assert_eq!(deleted["view"]["page"]["total"], 5);
    assert_eq!(deleted["view"]["page"]["index"], 0);

    let (code, error) = sidecar.request_err(
        "4",
        "row.action",
        json!({ "screen": "departments", "action": "delete", "id": "d1" }),
    );
    assert_eq!(code, "server_failure");
    assert_eq!(error["details"]["status"], 404);
    let view = sidecar.request_ok("5", "screen.view", json!({ "screen": "departments" }));
    assert_eq!(view["view"]["page"]["total"], 5);

    // The activity log rejected the write; the delete still stands.
    let logged = requests_to(&server, "/api/activitylog/create").await;
    assert_eq!(logged[0]["activity"], "Department Dept 6 was deleted from school Hill School");

    let (code, _) = sidecar.request_err(
        "6",
        "row.action",
        json!({ "screen": "departments", "action": "withdraw", "id": "d2" }),
    );
    assert_eq!(code, "not_offered");
    let (code, _) = sidecar.request_err(
        "7",
        "row.action",
        json!({ "screen": "departments", "action": "delete", "id": "zz" }),
    );
    assert_eq!(code, "not_found");
    let (code, _) = sidecar.request_err(
        "8",
        "row.action",
        json!({ "screen": "departments", "action": "expel", "id": "d2" }),
    );
    assert_eq!(code, "bad_params");
}

#[tokio::test(flavor = "multi_thread")]
async fn withdraw_and_reinstate_move_students_between_rosters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/students/school/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(students(&["S1", "S2"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/students/withdraw/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(students(&["S3"])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/students/update/S1"))
        .and(body_json(json!({ "withdraw": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/students/update/S3"))
        .and(body_json(json!({ "withdraw": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut sidecar = spawn_sidecar(&format!("{}/api", server.uri()), &[]);
    sidecar.login_and_open("students");
    sidecar.request_ok("1", "screen.open", json!({ "screen": "withdrawn-students" }));
    sidecar.request_ok("2", "scope.select", json!({ "screen": "students", "scopeId": "u1" }));
    sidecar.request_ok(
        "3",
        "scope.select",
        json!({ "screen": "withdrawn-students", "scopeId": "u1" }),
    );

    let withdrawn = sidecar.request_ok(
        "4",
        "row.action",
        json!({ "screen": "students", "action": "withdraw", "id": "S1" }),
    );
    assert_eq!(row_ids(&withdrawn["view"]), vec!["S2"]);

    let reinstated = sidecar.request_ok(
        "5",
        "row.action",
        json!({ "screen": "withdrawn-students", "action": "reinstate", "id": "S3" }),
    );
    assert_eq!(row_ids(&reinstated["view"]), Vec::<String>::new());
    assert_eq!(reinstated["view"]["message"], "No withdrawn students found");

    let (code, _) = sidecar.request_err("6", "editor.openAdd", json!({ "screen": "withdrawn-students" }));
    assert_eq!(code, "not_offered");

    // Rosters without an activity log never write one.
    assert!(requests_to(&server, "/api/activitylog/create").await.is_empty());
}
