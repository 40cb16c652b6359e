// integration tests for the server middleware stack, main.rs
use actix_web::{dev::Service, middleware::from_fn, test, web, App, HttpResponse};
use std::sync::Arc;

use boop_submitter::{
    config::API_KEY_HEADER,
    metrics::{middleware::record_request_metrics, REQUEST_COUNTER},
    models::SecretString,
    utils::check_api_key_header,
};

macro_rules! init_app {
    ($api_key:expr) => {{
        let api_key = Arc::new(SecretString::new($api_key));
        test::init_service(
            App::new()
                .wrap_fn(move |req, srv| {
                    if check_api_key_header(&req, &api_key) {
                        return srv.call(req);
                    }
                    Box::pin(async move {
                        Ok(req.into_response(
                            HttpResponse::Unauthorized().body(
                                r#"{"success": false, "code":401, "error": "Unauthorized", "message": "Unauthorized"}"#.to_string(),
                            ),
                        ))
                    })
                })
                .wrap(from_fn(record_request_metrics))
                .service(
                    web::resource("/ping").to(|| async { HttpResponse::Ok().body("Success") }),
                ),
        )
        .await
    }};
}

#[actix_web::test]
async fn test_api_key_middleware_success() {
    let app = init_app!("test_key");

    let req = test::TestRequest::get()
        .uri("/ping")
        .insert_header((API_KEY_HEADER, "test_key"))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn test_api_key_middleware_failure() {
    let app = init_app!("test_key");

    let missing = test::TestRequest::get().uri("/ping").to_request();
    assert_eq!(test::call_service(&app, missing).await.status(), 401);

    let wrong = test::TestRequest::get()
        .uri("/ping")
        .insert_header((API_KEY_HEADER, "other_key"))
        .to_request();
    assert_eq!(test::call_service(&app, wrong).await.status(), 401);
}

#[actix_web::test]
async fn test_authorized_requests_are_counted() {
    let app = init_app!("test_key");
    let labels = ["/ping", "GET", "200"];
    let before = REQUEST_COUNTER.with_label_values(&labels).get();

    let req = test::TestRequest::get()
        .uri("/ping")
        .insert_header((API_KEY_HEADER, "test_key"))
        .to_request();
    test::call_service(&app, req).await;

    assert!(REQUEST_COUNTER.with_label_values(&labels).get() > before);
}
