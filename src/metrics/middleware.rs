//! Request metrics middleware: counts requests and errors and records latency per route.

use crate::metrics::{ERROR_COUNTER, REQUEST_COUNTER, REQUEST_LATENCY};
use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    Error,
};
use std::time::Instant;

/// Use with `actix_web::middleware::from_fn(record_request_metrics)`.
pub async fn record_request_metrics(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    // route pattern keeps label cardinality bounded, raw path is the fallback for 404s
    let endpoint = req
        .match_pattern()
        .unwrap_or_else(|| req.path().to_string());
    let method = req.method().to_string();
    let start_time = Instant::now();

    let res = next.call(req).await;

    let status = match &res {
        Ok(response) => response.status().as_u16().to_string(),
        Err(e) => e.as_response_error().status_code().as_u16().to_string(),
    };
    let labels = [endpoint.as_str(), method.as_str(), status.as_str()];
    REQUEST_LATENCY
        .with_label_values(&labels)
        .observe(start_time.elapsed().as_secs_f64());
    match &res {
        Ok(response) if !response.status().is_client_error() && !response.status().is_server_error() => {
            REQUEST_COUNTER.with_label_values(&labels).inc();
        }
        _ => {
            ERROR_COUNTER.with_label_values(&labels).inc();
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{middleware::from_fn, test, web, App, HttpResponse};

    #[actix_web::test]
    async fn test_records_success_and_error() {
        let app = test::init_service(
            App::new()
                .wrap(from_fn(record_request_metrics))
                .route("/metrics-ok", web::get().to(|| async { HttpResponse::Ok().finish() }))
                .route(
                    "/metrics-fail",
                    web::get().to(|| async { HttpResponse::BadRequest().finish() }),
                ),
        )
        .await;

        let ok = REQUEST_COUNTER
            .with_label_values(&["/metrics-ok", "GET", "200"])
            .get();
        let failed = ERROR_COUNTER
            .with_label_values(&["/metrics-fail", "GET", "400"])
            .get();

        test::call_service(&app, test::TestRequest::get().uri("/metrics-ok").to_request()).await;
        test::call_service(&app, test::TestRequest::get().uri("/metrics-fail").to_request()).await;

        assert_eq!(
            REQUEST_COUNTER
                .with_label_values(&["/metrics-ok", "GET", "200"])
                .get(),
            ok + 1.0
        );
        assert_eq!(
            ERROR_COUNTER
                .with_label_values(&["/metrics-fail", "GET", "400"])
                .get(),
            failed + 1.0
        );
    }
}
