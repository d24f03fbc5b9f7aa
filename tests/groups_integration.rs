mod common;

use common::{spawn_app, TestApp, TestUser};
use serde_json::{json, Value};

async fn create_group(app: &TestApp, user: &TestUser, name: &str) -> i64 {
    let (status, body) = app.post_as(user, "/api/groups", &json!({ "name": name })).await;
    assert_eq!(201, status, "group creation failed: {}", body);
    body["group_id"].as_i64().unwrap()
}

async fn create_location(app: &TestApp, user: &TestUser, name: &str) -> i64 {
    let (status, body) = app
        .post_as(
            user,
            "/api/locations",
            &json!({ "name": name, "latitude": 48.8566, "longitude": 2.3522 }),
        )
        .await;
    assert_eq!(201, status, "location creation failed: {}", body);
    body["location_id"].as_i64().unwrap()
}

// --- Groups ---

#[tokio::test]
async fn group_creator_is_not_a_member() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;

    let group_id = create_group(&app, &alice, "Family").await;

    let (status, body) = app.get_as(&alice, &format!("/api/groups/{}", group_id)).await;
    assert_eq!(200, status);
    assert_eq!(body["name"], "Family");

    let (status, members) = app.get_as(&alice, &format!("/api/groups/{}/users", group_id)).await;
    assert_eq!(200, status);
    assert_eq!(members, json!([]));
}

#[tokio::test]
async fn group_crud_round_trip() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let group_id = create_group(&app, &alice, "Family").await;

    let (status, body) = app
        .put_as(&alice, &format!("/api/groups/{}", group_id), &json!({ "name": "Friends" }))
        .await;
    assert_eq!(200, status);
    assert_eq!(body["name"], "Friends");

    let (_, groups) = app.get_as(&alice, "/api/groups").await;
    assert_eq!(groups.as_array().unwrap().len(), 1);

    let status = app.delete_as(&alice, &format!("/api/groups/{}", group_id)).await;
    assert_eq!(204, status);

    let (status, body) = app.get_as(&alice, &format!("/api/groups/{}", group_id)).await;
    assert_eq!(404, status);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn group_requires_a_name() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;

    for body in [json!({}), json!({ "name": "" })] {
        let (status, body) = app.post_as(&alice, "/api/groups", &body).await;
        assert_eq!(400, status);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn non_numeric_path_returns_400() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;

    let (status, body) = app.get_as(&alice, "/api/groups/abc").await;

    assert_eq!(400, status);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

// --- Membership ---

#[tokio::test]
async fn add_member_lifecycle() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let group_id = create_group(&app, &alice, "Family").await;
    let members_path = format!("/api/groups/{}/users", group_id);

    let (status, body) = app.post_as(&alice, &members_path, &json!({ "user_id": bob.id })).await;
    assert_eq!(201, status);
    assert_eq!(body["group_id"], group_id);
    assert_eq!(body["user_id"], bob.id);

    let (status, body) = app.post_as(&alice, &members_path, &json!({ "user_id": bob.id })).await;
    assert_eq!(409, status);
    assert_eq!(body["code"], "CONFLICT");

    let (status, _) = app.post_as(&alice, &members_path, &json!({ "user_id": 9999 })).await;
    assert_eq!(404, status);

    let (status, members) = app.get_as(&alice, &members_path).await;
    assert_eq!(200, status);
    let members = members.as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["username"], "bob");
    assert!(members[0].get("password_hash").is_none());

    let (_, groups) = app.get_as(&bob, &format!("/api/users/{}/groups", bob.id)).await;
    assert_eq!(groups[0]["group_id"], group_id);

    let status = app
        .delete_as(&alice, &format!("/api/groups/{}/users/{}", group_id, bob.id))
        .await;
    assert_eq!(204, status);

    let (_, members) = app.get_as(&alice, &members_path).await;
    assert_eq!(members, json!([]));
}

#[tokio::test]
async fn add_member_to_missing_group_returns_404() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;

    let (status, _) = app
        .post_as(&alice, "/api/groups/4242/users", &json!({ "user_id": alice.id }))
        .await;

    assert_eq!(404, status);
}

#[tokio::test]
async fn lists_of_missing_group_are_empty() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;

    for path in ["/api/groups/4242/users", "/api/groups/4242/locations"] {
        let (status, body) = app.get_as(&alice, path).await;
        assert_eq!(200, status);
        assert_eq!(body, json!([]));
    }
}

// --- Locations ---

#[tokio::test]
async fn location_is_owned_by_its_creator() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let location_id = create_location(&app, &alice, "Home").await;
    let path = format!("/api/locations/{}", location_id);

    let (status, body) = app.get_as(&bob, &path).await;
    assert_eq!(200, status);
    assert_eq!(body["user_id"], alice.id);

    let (status, _) = app.put_as(&bob, &path, &json!({ "name": "Mine now" })).await;
    assert_eq!(403, status);
    assert_eq!(403, app.delete_as(&bob, &path).await);

    let (status, body) = app.put_as(&alice, &path, &json!({ "latitude": 10.5 })).await;
    assert_eq!(200, status);
    assert_eq!(body["latitude"], 10.5);
    assert_eq!(body["name"], "Home");

    let (_, owned) = app.get_as(&bob, &format!("/api/users/{}/locations", alice.id)).await;
    assert_eq!(owned.as_array().unwrap().len(), 1);

    assert_eq!(204, app.delete_as(&alice, &path).await);
    let (status, _) = app.get_as(&alice, &path).await;
    assert_eq!(404, status);
}

#[tokio::test]
async fn location_coordinates_are_validated() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;

    let test_cases = vec![
        (json!({ "name": "North", "latitude": 91.0, "longitude": 0.0 }), "latitude above 90"),
        (json!({ "name": "South", "latitude": -90.5, "longitude": 0.0 }), "latitude below -90"),
        (json!({ "name": "East", "latitude": 0.0, "longitude": 180.5 }), "longitude above 180"),
        (json!({ "name": "Nowhere", "latitude": 0.0 }), "missing longitude"),
        (json!({ "latitude": 0.0, "longitude": 0.0 }), "missing name"),
    ];

    for (body, description) in test_cases {
        let (status, body) = app.post_as(&alice, "/api/locations", &body).await;
        assert_eq!(400, status, "accepted a location with {}", description);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }
}

// --- Sharing ---

#[tokio::test]
async fn shared_location_is_visible_by_default() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let group_id = create_group(&app, &alice, "Family").await;
    let location_id = create_location(&app, &alice, "Home").await;

    let (status, body) = app
        .post_as(
            &alice,
            &format!("/api/groups/{}/locations", group_id),
            &json!({ "location_id": location_id }),
        )
        .await;

    assert_eq!(201, status);
    assert_eq!(body["is_visible_coordinates"], true);

    let (_, groups) = app
        .get_as(&alice, &format!("/api/locations/{}/groups", location_id))
        .await;
    assert_eq!(groups[0]["group_id"], group_id);
}

#[tokio::test]
async fn hidden_coordinates_are_only_shown_to_the_owner() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let group_id = create_group(&app, &alice, "Family").await;
    let location_id = create_location(&app, &alice, "Home").await;
    let locations_path = format!("/api/groups/{}/locations", group_id);

    let (status, _) = app
        .post_as(
            &alice,
            &locations_path,
            &json!({ "location_id": location_id, "is_visible_coordinates": false }),
        )
        .await;
    assert_eq!(201, status);

    let (_, seen_by_bob) = app.get_as(&bob, &locations_path).await;
    assert_eq!(seen_by_bob[0]["name"], "Home");
    assert_eq!(seen_by_bob[0]["latitude"], Value::Null);
    assert_eq!(seen_by_bob[0]["longitude"], Value::Null);

    let (_, seen_by_alice) = app.get_as(&alice, &locations_path).await;
    assert_eq!(seen_by_alice[0]["latitude"], 48.8566);

    let (status, body) = app
        .put_as(
            &alice,
            &format!("{}/{}", locations_path, location_id),
            &json!({ "is_visible_coordinates": true }),
        )
        .await;
    assert_eq!(200, status);
    assert_eq!(body["is_visible_coordinates"], true);

    let (_, seen_by_bob) = app.get_as(&bob, &locations_path).await;
    assert_eq!(seen_by_bob[0]["longitude"], 2.3522);
}

#[tokio::test]
async fn hidden_coordinates_stay_hidden_on_every_read_path() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let group_id = create_group(&app, &alice, "Family").await;
    let location_id = create_location(&app, &alice, "Home").await;

    let (status, _) = app
        .post_as(&alice, &format!("/api/groups/{}/users", group_id), &json!({ "user_id": bob.id }))
        .await;
    assert_eq!(201, status);
    let (status, _) = app
        .post_as(
            &alice,
            &format!("/api/groups/{}/locations", group_id),
            &json!({ "location_id": location_id, "is_visible_coordinates": false }),
        )
        .await;
    assert_eq!(201, status);

    let (_, direct) = app.get_as(&bob, &format!("/api/locations/{}", location_id)).await;
    let (_, all) = app.get_as(&bob, "/api/locations").await;
    let (_, by_owner) = app.get_as(&bob, &format!("/api/users/{}/locations", alice.id)).await;

    for (view, path) in [(&direct, "direct"), (&all[0], "list"), (&by_owner[0], "owner list")] {
        assert_eq!(view["name"], "Home", "{}", path);
        assert_eq!(view["latitude"], Value::Null, "{} leaked latitude", path);
        assert_eq!(view["longitude"], Value::Null, "{} leaked longitude", path);
    }

    // The owner still sees everything
    let (_, own) = app.get_as(&alice, &format!("/api/locations/{}", location_id)).await;
    assert_eq!(own["latitude"], 48.8566);
    let (_, own_list) = app.get_as(&alice, "/api/locations").await;
    assert_eq!(own_list[0]["longitude"], 2.3522);

    // Making the share visible exposes the coordinates
    let (status, _) = app
        .put_as(
            &alice,
            &format!("/api/groups/{}/locations/{}", group_id, location_id),
            &json!({ "is_visible_coordinates": true }),
        )
        .await;
    assert_eq!(200, status);

    let (_, direct) = app.get_as(&bob, &format!("/api/locations/{}", location_id)).await;
    assert_eq!(direct["latitude"], 48.8566);
    let (_, by_owner) = app.get_as(&bob, &format!("/api/users/{}/locations", alice.id)).await;
    assert_eq!(by_owner[0]["longitude"], 2.3522);
}

#[tokio::test]
async fn unshared_location_coordinates_are_private() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let location_id = create_location(&app, &alice, "Home").await;

    let (status, body) = app.get_as(&bob, &format!("/api/locations/{}", location_id)).await;

    assert_eq!(200, status);
    assert_eq!(body["user_id"], alice.id);
    assert_eq!(body["latitude"], Value::Null);
}

#[tokio::test]
async fn only_the_owner_manages_shares() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let group_id = create_group(&app, &alice, "Family").await;
    let location_id = create_location(&app, &alice, "Home").await;
    let locations_path = format!("/api/groups/{}/locations", group_id);
    let share_path = format!("{}/{}", locations_path, location_id);

    let (status, body) = app
        .post_as(&bob, &locations_path, &json!({ "location_id": location_id }))
        .await;
    assert_eq!(403, status);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = app
        .post_as(&alice, &locations_path, &json!({ "location_id": location_id }))
        .await;
    assert_eq!(201, status);

    let (status, _) = app
        .post_as(&alice, &locations_path, &json!({ "location_id": location_id }))
        .await;
    assert_eq!(409, status);

    let (status, _) = app
        .put_as(&bob, &share_path, &json!({ "is_visible_coordinates": false }))
        .await;
    assert_eq!(403, status);
    assert_eq!(403, app.delete_as(&bob, &share_path).await);

    assert_eq!(204, app.delete_as(&alice, &share_path).await);
    let (_, shared) = app.get_as(&alice, &locations_path).await;
    assert_eq!(shared, json!([]));
}

#[tokio::test]
async fn sharing_missing_location_returns_404() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let group_id = create_group(&app, &alice, "Family").await;

    let (status, _) = app
        .post_as(
            &alice,
            &format!("/api/groups/{}/locations", group_id),
            &json!({ "location_id": 4242 }),
        )
        .await;

    assert_eq!(404, status);
}

// --- Cascades ---

#[tokio::test]
async fn deleting_a_user_removes_their_memberships_and_shares() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let group_id = create_group(&app, &alice, "Family").await;
    let location_id = create_location(&app, &bob, "Office").await;

    let (status, _) = app
        .post_as(&alice, &format!("/api/groups/{}/users", group_id), &json!({ "user_id": bob.id }))
        .await;
    assert_eq!(201, status);
    let (status, _) = app
        .post_as(
            &bob,
            &format!("/api/groups/{}/locations", group_id),
            &json!({ "location_id": location_id }),
        )
        .await;
    assert_eq!(201, status);

    assert_eq!(204, app.delete_as(&bob, &format!("/api/users/{}", bob.id)).await);

    let (_, members) = app.get_as(&alice, &format!("/api/groups/{}/users", group_id)).await;
    assert_eq!(members, json!([]));
    let (_, shared) = app.get_as(&alice, &format!("/api/groups/{}/locations", group_id)).await;
    assert_eq!(shared, json!([]));
    let (status, _) = app.get_as(&alice, &format!("/api/locations/{}", location_id)).await;
    assert_eq!(404, status);

    // The group itself survives
    let (status, _) = app.get_as(&alice, &format!("/api/groups/{}", group_id)).await;
    assert_eq!(200, status);
}
