mod common;

use actix_web::{App, test, web};
use common::{FakeClassifier, FakeQuality, FakeSafety, jpeg_b64, service};
use lensforge::routes::{configure_routes, json_config};
use lensforge::state::AppState;
use serde_json::{Value, json};
use shared::{AnalyzeResponse, BatchAnalyzeResponse, DISCLAIMER};

fn state(quality: &std::sync::Arc<FakeQuality>) -> AppState {
    AppState::new(service(quality, &FakeSafety::safe(), &FakeClassifier::benign()))
}

#[actix_web::test]
async fn health_reports_ok() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(&FakeQuality::ok())))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "status": "ok" }));
}

#[actix_web::test]
async fn analyze_returns_envelope() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(&FakeQuality::ok())))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/analyze")
        .set_json(json!({ "image_base64": jpeg_b64(224, 224) }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: AnalyzeResponse = test::read_body_json(resp).await;
    assert!(body.is_success());
    assert_eq!(body.lesion_detected, Some(true));
    assert_eq!(body.predictions[0].label, "nv");
    assert_eq!(body.disclaimer, DISCLAIMER);
}

#[actix_web::test]
async fn quality_rejection_is_still_200() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(&FakeQuality::blurry())))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/analyze")
        .set_json(json!({ "image_base64": jpeg_b64(64, 64) }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "rejected_quality");
    assert_eq!(body["reason"], "Too blurry");
    assert!(body["lesion_detected"].is_null());
}

#[actix_web::test]
async fn client_errors_map_to_400() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(&FakeQuality::ok())))
            .configure(configure_routes),
    )
    .await;

    for payload in [
        json!({}),
        json!({ "image_base64": "!!!invalid!!!" }),
        json!({ "image_url": "not a url" }),
    ] {
        let req = test::TestRequest::post()
            .uri("/analyze")
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 400, "{}", payload);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string());
    }
}

#[actix_web::test]
async fn unreachable_url_maps_to_502() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(&FakeQuality::ok())))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/analyze")
        .set_json(json!({ "image_url": "http://127.0.0.1:1/a.png" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 502);
}

#[actix_web::test]
async fn malformed_json_gets_json_error() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(&FakeQuality::ok())))
            .app_data(json_config(1024 * 1024))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/analyze")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn batch_endpoint_aligns_results() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(&FakeQuality::ok())))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/batch-analyze")
        .set_json(json!({
            "images": [
                { "image_base64": jpeg_b64(32, 32) },
                { "image_base64": "!!!invalid!!!" },
            ]
        }))
        .to_request();
    let body: BatchAnalyzeResponse = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body.results.len(), 2);
    assert!(body.results[0].is_success());
    assert_eq!(body.results[1].status.to_string(), "error");
    assert!(body.results[1].disclaimer.is_empty());
}

#[actix_web::test]
async fn oversized_batch_maps_to_400() {
    let quality = FakeQuality::ok();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state(&quality)))
            .configure(configure_routes),
    )
    .await;

    let images: Vec<Value> = (0..51).map(|_| json!({ "image_base64": "AAAA" })).collect();
    let req = test::TestRequest::post()
        .uri("/batch-analyze")
        .set_json(json!({ "images": images }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status().as_u16(), 400);
    assert_eq!(quality.calls(), 0);
}
