//! Integration tests for sponsor draft shortlists.

mod common;

use axum::http::StatusCode;
use common::{create_test_app, event_uri, Call};
use serde_json::json;

#[tokio::test]
async fn test_save_list_and_remove_drafts() {
    let app = create_test_app().await;

    let (status, body) = Call::post(event_uri("/drafts"))
        .as_user("rep-erin")
        .json(json!({ "inviteeIds": ["att-bob", "att-nobody", "rep-frank"] }))
        .send(&app)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 0);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);

    assert_eq!(results[0]["inviteeId"], "att-bob");
    assert_eq!(results[0]["success"], true);
    assert!(results[0]["meetingCode"].is_string());

    assert_eq!(results[1]["inviteeId"], "att-nobody");
    assert_eq!(results[1]["success"], false);
    assert_eq!(results[1]["status"], -4);
    assert!(results[1]["msg"].is_string());

    assert_eq!(results[2]["inviteeId"], "rep-frank");
    assert_eq!(results[2]["success"], false);
    assert_eq!(results[2]["status"], -1);

    // Shared by every rep of the sponsor.
    let (status, body) = Call::get(event_uri("/drafts"))
        .as_user("rep-frank")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    let drafts = body["drafts"].as_array().unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0]["inviteeId"], "att-bob");
    assert_eq!(drafts[0]["requestStatus"], "draft");

    let (status, body) = Call::delete(event_uri("/drafts"))
        .as_user("rep-frank")
        .json(json!({ "inviteeIds": ["att-bob", "att-carol"] }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["success"], true);
    assert_eq!(body["results"][1]["success"], false);
    assert_eq!(body["results"][1]["status"], -4);

    let (_, body) = Call::get(event_uri("/drafts"))
        .as_user("rep-erin")
        .send(&app)
        .await;
    assert!(body["drafts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_saving_twice_keeps_one_draft() {
    let app = create_test_app().await;

    for _ in 0..2 {
        let (status, body) = Call::post(event_uri("/drafts"))
            .as_user("rep-erin")
            .json(json!({ "inviteeIds": ["att-carol"] }))
            .send(&app)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"][0]["success"], true);
    }

    let (_, body) = Call::get(event_uri("/drafts"))
        .as_user("rep-erin")
        .send(&app)
        .await;
    assert_eq!(body["drafts"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_request_upgrades_draft() {
    let app = create_test_app().await;
    let (_, body) = Call::post(event_uri("/drafts"))
        .as_user("rep-erin")
        .json(json!({ "inviteeIds": ["att-dave"] }))
        .send(&app)
        .await;
    let draft_code = body["results"][0]["meetingCode"].as_str().unwrap().to_string();

    let (status, body) = Call::post(event_uri("/meetings"))
        .as_user("rep-frank")
        .json(json!({ "inviteeId": "att-dave" }))
        .send(&app)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meeting"]["meetingCode"], draft_code.as_str());
    assert_eq!(body["meeting"]["requestStatus"], "requested");

    let (_, body) = Call::get(event_uri("/drafts"))
        .as_user("rep-erin")
        .send(&app)
        .await;
    assert!(body["drafts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_drafts_require_sponsor_rep() {
    let app = create_test_app().await;

    let (status, body) = Call::post(event_uri("/drafts"))
        .as_user("att-alice")
        .json(json!({ "inviteeIds": ["att-bob"] }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], -1);

    let (status, body) = Call::get(event_uri("/drafts"))
        .as_user("att-alice")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], -1);
}

#[tokio::test]
async fn test_empty_batch_is_payload_error() {
    let app = create_test_app().await;

    let (status, body) = Call::post(event_uri("/drafts"))
        .as_user("rep-erin")
        .json(json!({ "inviteeIds": [] }))
        .send(&app)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], -1);
}

#[tokio::test]
async fn test_purge_sponsor_drafts_requires_admin() {
    let app = create_test_app().await;
    let (status, _) = Call::post(event_uri("/drafts"))
        .as_user("rep-erin")
        .json(json!({ "inviteeIds": ["att-bob", "att-carol"] }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = Call::delete(event_uri("/sponsors/spn-initech/drafts"))
        .as_user("rep-erin")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], -2);

    let (status, body) = Call::delete(event_uri("/sponsors/spn-initech/drafts"))
        .as_user("ops-1")
        .roles("support, Admin")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 2);

    let (_, body) = Call::get(event_uri("/drafts"))
        .as_user("rep-erin")
        .send(&app)
        .await;
    assert!(body["drafts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_draft_rejected_while_meeting_is_open() {
    let app = create_test_app().await;
    let (status, _) = Call::post(event_uri("/meetings"))
        .as_user("rep-frank")
        .json(json!({ "inviteeId": "att-carol" }))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = Call::post(event_uri("/drafts"))
        .as_user("rep-erin")
        .json(json!({ "inviteeIds": ["att-carol"] }))
        .send(&app)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["success"], false);
    assert_eq!(body["results"][0]["status"], -6);
}
