//! Prometheus metrics endpoints.
use crate::metrics::{gather_metrics, REGISTRY};
use actix_web::{get, web, HttpResponse, Responder};
use prometheus::{Encoder, TextEncoder};

/// All metrics in the text exposition format.
#[get("/metrics")]
async fn scrape_metrics() -> impl Responder {
    match gather_metrics() {
        Ok(body) => HttpResponse::Ok()
            .content_type(TextEncoder::new().format_type())
            .body(body),
        Err(e) => HttpResponse::InternalServerError().body(format!("Error: {}", e)),
    }
}

#[get("/metrics/names")]
async fn list_metrics() -> impl Responder {
    let metric_names: Vec<String> = REGISTRY
        .gather()
        .iter()
        .map(|mf| mf.get_name().to_string())
        .collect();
    HttpResponse::Ok().json(metric_names)
}

#[get("/metrics/{metric_name}")]
async fn metric_detail(path: web::Path<String>) -> impl Responder {
    let metric_name = path.into_inner();
    let metric_families = REGISTRY.gather();

    for mf in metric_families {
        if mf.get_name() == metric_name {
            let encoder = TextEncoder::new();
            let mut buffer = Vec::new();
            if let Err(e) = encoder.encode(&[mf], &mut buffer) {
                return HttpResponse::InternalServerError().body(format!("Encoding error: {}", e));
            }
            return HttpResponse::Ok()
                .content_type(encoder.format_type())
                .body(buffer);
        }
    }
    HttpResponse::NotFound().body("Metric not found")
}

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(scrape_metrics);
    // before the detail route so that `names` is not taken for a metric
    cfg.service(list_metrics);
    cfg.service(metric_detail);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::CURRENT_BLOCK;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_metric_endpoints() {
        CURRENT_BLOCK.set(7);
        let app = test::init_service(App::new().configure(init)).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/metrics").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("current_block_number"));

        let names: Vec<String> = test::read_body_json(
            test::call_service(&app, test::TestRequest::get().uri("/metrics/names").to_request()).await,
        )
        .await;
        assert!(names.contains(&"current_block_number".to_string()));

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/metrics/current_block_number").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/metrics/does_not_exist").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
