#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Form lifecycle tests: creation, hydration, reconciliation and access.

mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

use common::{TestApp, field_ids, id_of};
use formcraft_kernel::store::Table;
use formcraft_test_utils::{TestField, TestOption, assert, test_form};

fn option_values(field: &Value) -> Vec<String> {
    field["options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["value"].as_str().unwrap().to_string())
        .collect()
}

fn orders(items: &Value) -> Vec<i64> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["order"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn create_form_assigns_dense_order() {
    let app = TestApp::new();
    let owner = app.account("owner@example.com");

    let form = app
        .create_form(
            &owner,
            test_form("Survey")
                .with_field(TestField::short_text("Name").required())
                .with_field(TestField::dropdown("Colour", &["red", "green", "blue"]))
                .with_field(TestField::number("Age"))
                .to_json(),
        )
        .await;

    let labels: Vec<_> = form["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["Name", "Colour", "Age"]);
    assert_eq!(orders(&form["fields"]), vec![0, 1, 2]);
    assert_eq!(option_values(&form["fields"][1]), vec!["red", "green", "blue"]);
    assert_eq!(orders(&form["fields"][1]["options"]), vec![0, 1, 2]);
    assert!(form["fields"][0].get("options").is_none());
    assert_eq!(form["responseCount"], 0);
    assert_eq!(form["userId"], owner.id.to_string());

    let fetched = app
        .get(&format!("/api/forms/{}", id_of(&form)), Some(&owner.token))
        .await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(field_ids(fetched.data()), field_ids(&form));
}

#[tokio::test]
async fn create_form_applies_defaults() {
    let app = TestApp::new();
    let owner = app.account("owner@example.com");

    let form = app
        .create_form(&owner, test_form("ignored").untitled().to_json())
        .await;

    assert_eq!(form["title"], "Untitled Form");
    assert_eq!(form["description"], "");
    assert_eq!(form["isPublic"], false);
    assert_eq!(form["settings"]["submitButtonText"], "Submit");
    assert_eq!(
        form["settings"]["confirmationMessage"],
        "Thank you for your submission!"
    );
    assert_eq!(form["fields"], json!([]));
}

#[tokio::test]
async fn settings_and_properties_round_trip() {
    let app = TestApp::new();
    let owner = app.account("owner@example.com");

    let form = app
        .create_form(
            &owner,
            test_form("Rated")
                .with_settings(json!({"submitButtonText": "Send", "theme": "dark"}))
                .with_field(
                    TestField::new("rating", "Stars")
                        .with_property("maxRating", json!(5))
                        .with_property("emoji", json!(true)),
                )
                .to_json(),
        )
        .await;

    assert_eq!(form["settings"]["submitButtonText"], "Send");
    assert_eq!(form["settings"]["theme"], "dark");
    assert_eq!(form["fields"][0]["maxRating"], 5);
    assert_eq!(form["fields"][0]["emoji"], true);
}

#[tokio::test]
async fn options_on_plain_field_are_rejected() {
    let app = TestApp::new();
    let owner = app.account("owner@example.com");

    let response = app
        .post(
            "/api/forms",
            Some(&owner.token),
            test_form("Bad")
                .with_field(TestField::short_text("Name").with_options(&["a"]))
                .to_json(),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert::failure_contains(&response.body, "does not take options");
    assert_eq!(app.store.row_count(Table::Forms), 0);
}

#[tokio::test]
async fn list_forms_returns_only_own_forms_newest_first() {
    let app = TestApp::new();
    let owner = app.account("owner@example.com");
    let other = app.account("other@example.com");

    let first = app.create_form(&owner, test_form("First").to_json()).await;
    let second = app.create_form(&owner, test_form("Second").to_json()).await;
    app.create_form(&other, test_form("Elsewhere").to_json())
        .await;

    // Touching the first form moves it to the top.
    let updated = app
        .put(
            &format!("/api/forms/{}", id_of(&first)),
            Some(&owner.token),
            json!({"title": "First, renamed"}),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);

    let listed = app.get("/api/forms", Some(&owner.token)).await;
    assert_eq!(listed.status, StatusCode::OK);
    let ids: Vec<_> = listed.data().as_array().unwrap().iter().map(id_of).collect();
    assert_eq!(ids, vec![id_of(&first), id_of(&second)]);
    assert_eq!(listed.data()[0]["title"], "First, renamed");
}

#[tokio::test]
async fn list_forms_requires_authentication() {
    let app = TestApp::new();

    let response = app.get("/api/forms", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert::failure_contains(&response.body, "Authentication required");
}

#[tokio::test]
async fn update_with_same_fields_is_idempotent() {
    let app = TestApp::new();
    let owner = app.account("owner@example.com");

    let form = app
        .create_form(
            &owner,
            test_form("Stable")
                .with_field(TestField::short_text("Name"))
                .with_field(TestField::checkbox("Toppings", &["cheese", "ham"]))
                .to_json(),
        )
        .await;
    let path = format!("/api/forms/{}", id_of(&form));
    let fields_before = app.store.row_count(Table::FormFields);
    let options_before = app.store.row_count(Table::FieldOptions);

    let patch = json!({"fields": form["fields"].clone()});
    let once = app.put(&path, Some(&owner.token), patch.clone()).await;
    let twice = app.put(&path, Some(&owner.token), patch).await;

    assert_eq!(once.status, StatusCode::OK);
    assert_eq!(twice.status, StatusCode::OK);
    assert_eq!(once.data()["fields"], form["fields"]);
    assert_eq!(twice.data()["fields"], form["fields"]);
    assert_eq!(app.store.row_count(Table::FormFields), fields_before);
    assert_eq!(app.store.row_count(Table::FieldOptions), options_before);
}

#[tokio::test]
async fn reorder_keeps_field_identity() {
    let app = TestApp::new();
    let owner = app.account("owner@example.com");

    let form = app
        .create_form(
            &owner,
            test_form("Ordered")
                .with_field(TestField::short_text("A"))
                .with_field(TestField::short_text("B"))
                .with_field(TestField::short_text("C"))
                .to_json(),
        )
        .await;
    let ids = field_ids(&form);

    let reordered = json!({"fields": [
        form["fields"][2].clone(),
        form["fields"][0].clone(),
        form["fields"][1].clone(),
    ]});
    let updated = app
        .put(
            &format!("/api/forms/{}", id_of(&form)),
            Some(&owner.token),
            reordered,
        )
        .await;

    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(
        field_ids(updated.data()),
        vec![ids[2].clone(), ids[0].clone(), ids[1].clone()]
    );
    assert_eq!(orders(&updated.data()["fields"]), vec![0, 1, 2]);
}

#[tokio::test]
async fn omitted_field_is_deleted_with_its_options() {
    let app = TestApp::new();
    let owner = app.account("owner@example.com");

    let form = app
        .create_form(
            &owner,
            test_form("Trim")
                .public()
                .with_field(TestField::short_text("Keep"))
                .with_field(TestField::dropdown("Drop", &["x", "y"]))
                .to_json(),
        )
        .await;
    let ids = field_ids(&form);
    let response_id = app
        .submit(
            &id_of(&form),
            None,
            json!({ ids[0].clone(): "kept", ids[1].clone(): "x" }),
        )
        .await;
    assert_eq!(app.store.row_count(Table::FieldOptions), 2);

    let updated = app
        .put(
            &format!("/api/forms/{}", id_of(&form)),
            Some(&owner.token),
            json!({"fields": [form["fields"][0].clone()]}),
        )
        .await;

    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(field_ids(updated.data()), vec![ids[0].clone()]);
    assert_eq!(app.store.row_count(Table::FieldOptions), 0);

    let response = app
        .get(&format!("/api/responses/{response_id}"), Some(&owner.token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["values"], json!({ ids[0].clone(): "kept" }));
}

#[tokio::test]
async fn unknown_and_missing_ids_create_fresh_fields() {
    let app = TestApp::new();
    let owner = app.account("owner@example.com");

    let form = app
        .create_form(
            &owner,
            test_form("Fresh")
                .with_field(TestField::short_text("Old"))
                .to_json(),
        )
        .await;
    let old_id = field_ids(&form)[0].clone();

    let updated = app
        .put(
            &format!("/api/forms/{}", id_of(&form)),
            Some(&owner.token),
            json!({"fields": [
                TestField::short_text("Client temp").with_id("temp-1").to_json(),
                TestField::number("No id").to_json(),
            ]}),
        )
        .await;

    assert_eq!(updated.status, StatusCode::OK);
    let ids = field_ids(updated.data());
    assert_eq!(ids.len(), 2);
    assert!(!ids.contains(&old_id));
    assert!(!ids.contains(&"temp-1".to_string()));
    assert_eq!(app.store.row_count(Table::FormFields), 2);
}

#[tokio::test]
async fn options_reconcile_by_id() {
    let app = TestApp::new();
    let owner = app.account("owner@example.com");

    let form = app
        .create_form(
            &owner,
            test_form("Choices")
                .with_field(TestField::dropdown("Pick", &["one", "two", "three"]))
                .to_json(),
        )
        .await;
    let field = &form["fields"][0];
    let options = field["options"].as_array().unwrap();
    let (one, three) = (id_of(&options[0]), id_of(&options[2]));

    let edited = TestField::dropdown("Pick", &[])
        .with_id(id_of(field))
        .with_option_list(vec![
            TestOption::existing(&three, "three"),
            TestOption::existing(&one, "uno"),
            TestOption::new("four"),
        ]);
    let updated = app
        .put(
            &format!("/api/forms/{}", id_of(&form)),
            Some(&owner.token),
            json!({"fields": [edited.to_json()]}),
        )
        .await;

    assert_eq!(updated.status, StatusCode::OK);
    let field = &updated.data()["fields"][0];
    assert_eq!(id_of(field), id_of(&form["fields"][0]));
    assert_eq!(option_values(field), vec!["three", "uno", "four"]);
    assert_eq!(orders(&field["options"]), vec![0, 1, 2]);
    let ids: Vec<_> = field["options"].as_array().unwrap().iter().map(id_of).collect();
    assert_eq!(ids[0], three);
    assert_eq!(ids[1], one);
    assert_eq!(app.store.row_count(Table::FieldOptions), 3);
}

#[tokio::test]
async fn absent_options_leave_options_untouched() {
    let app = TestApp::new();
    let owner = app.account("owner@example.com");

    let form = app
        .create_form(
            &owner,
            test_form("Keep options")
                .with_field(TestField::dropdown("Pick", &["a", "b"]))
                .to_json(),
        )
        .await;
    let field = &form["fields"][0];

    let relabelled = TestField::new("dropdown", "Pick one").with_id(id_of(field));
    let updated = app
        .put(
            &format!("/api/forms/{}", id_of(&form)),
            Some(&owner.token),
            json!({"fields": [relabelled.to_json()]}),
        )
        .await;

    assert_eq!(updated.status, StatusCode::OK);
    let field = &updated.data()["fields"][0];
    assert_eq!(field["label"], "Pick one");
    assert_eq!(option_values(field), vec!["a", "b"]);
}

#[tokio::test]
async fn changing_to_plain_type_drops_options() {
    let app = TestApp::new();
    let owner = app.account("owner@example.com");

    let form = app
        .create_form(
            &owner,
            test_form("Retype")
                .with_field(TestField::dropdown("Pick", &["a", "b"]))
                .to_json(),
        )
        .await;
    let field_id = id_of(&form["fields"][0]);

    let updated = app
        .put(
            &format!("/api/forms/{}", id_of(&form)),
            Some(&owner.token),
            json!({"fields": [TestField::short_text("Free text").with_id(&field_id).to_json()]}),
        )
        .await;

    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(id_of(&updated.data()["fields"][0]), field_id);
    assert!(updated.data()["fields"][0].get("options").is_none());
    assert_eq!(app.store.row_count(Table::FieldOptions), 0);
}

#[tokio::test]
async fn scalar_patch_leaves_fields_alone() {
    let app = TestApp::new();
    let owner = app.account("owner@example.com");

    let form = app
        .create_form(
            &owner,
            test_form("Scalar")
                .with_field(TestField::short_text("Name"))
                .to_json(),
        )
        .await;

    let updated = app
        .put(
            &format!("/api/forms/{}", id_of(&form)),
            Some(&owner.token),
            json!({"isPublic": true, "description": "Now public"}),
        )
        .await;

    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.data()["isPublic"], true);
    assert_eq!(updated.data()["description"], "Now public");
    assert_eq!(updated.data()["title"], "Scalar");
    assert_eq!(field_ids(updated.data()), field_ids(&form));
}

#[tokio::test]
async fn private_form_is_hidden_from_others() {
    let app = TestApp::new();
    let owner = app.account("owner@example.com");
    let other = app.account("other@example.com");

    let form = app.create_form(&owner, test_form("Secret").to_json()).await;
    let path = format!("/api/forms/{}", id_of(&form));

    let anonymous = app.get(&path, None).await;
    assert_eq!(anonymous.status, StatusCode::FORBIDDEN);
    assert::failure_contains(&anonymous.body, "permission to view this form");

    let stranger = app.get(&path, Some(&other.token)).await;
    assert_eq!(stranger.status, StatusCode::FORBIDDEN);

    let own = app.get(&path, Some(&owner.token)).await;
    assert_eq!(own.status, StatusCode::OK);
}

#[tokio::test]
async fn public_form_is_visible_to_anyone() {
    let app = TestApp::new();
    let owner = app.account("owner@example.com");

    let form = app
        .create_form(&owner, test_form("Open").public().to_json())
        .await;

    let response = app.get(&format!("/api/forms/{}", id_of(&form)), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["title"], "Open");
}

#[tokio::test]
async fn only_owner_may_update_or_delete() {
    let app = TestApp::new();
    let owner = app.account("owner@example.com");
    let other = app.account("other@example.com");

    let form = app
        .create_form(&owner, test_form("Mine").public().to_json())
        .await;
    let path = format!("/api/forms/{}", id_of(&form));

    let update = app
        .put(&path, Some(&other.token), json!({"title": "Theirs"}))
        .await;
    assert_eq!(update.status, StatusCode::FORBIDDEN);
    assert::failure_contains(&update.body, "permission to update this form");

    let delete = app.delete(&path, Some(&other.token)).await;
    assert_eq!(delete.status, StatusCode::FORBIDDEN);
    assert::failure_contains(&delete.body, "permission to delete this form");

    let unchanged = app.get(&path, None).await;
    assert_eq!(unchanged.data()["title"], "Mine");
}

#[tokio::test]
async fn delete_form_cascades() {
    let app = TestApp::new();
    let owner = app.account("owner@example.com");

    let form = app
        .create_form(
            &owner,
            test_form("Doomed")
                .public()
                .with_field(TestField::dropdown("Pick", &["a", "b"]))
                .to_json(),
        )
        .await;
    let field_id = field_ids(&form)[0].clone();
    app.submit(&id_of(&form), None, json!({ field_id: "a" }))
        .await;

    let path = format!("/api/forms/{}", id_of(&form));
    let deleted = app.delete(&path, Some(&owner.token)).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "Form deleted successfully");

    for table in [
        Table::Forms,
        Table::FormFields,
        Table::FieldOptions,
        Table::FormResponses,
        Table::ResponseValues,
    ] {
        assert_eq!(app.store.row_count(table), 0, "{table} not empty");
    }

    let gone = app.get(&path, Some(&owner.token)).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert::failure_contains(&gone.body, "Form not found");
}

#[tokio::test]
async fn unknown_form_is_not_found() {
    let app = TestApp::new();
    let owner = app.account("owner@example.com");

    let missing = app
        .get(&format!("/api/forms/{}", uuid::Uuid::now_v7()), None)
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let malformed = app.get("/api/forms/not-a-uuid", None).await;
    assert_eq!(malformed.status, StatusCode::NOT_FOUND);

    let delete = app
        .delete(
            &format!("/api/forms/{}", uuid::Uuid::now_v7()),
            Some(&owner.token),
        )
        .await;
    assert_eq!(delete.status, StatusCode::NOT_FOUND);
}
