use actix_web::dev::ServiceRequest;

use crate::{config::API_KEY_HEADER, models::SecretString};

/// Checks that the request carries exactly one `x-api-key` header matching the expected key.
pub fn check_api_key_header(req: &ServiceRequest, expected_key: &SecretString) -> bool {
    let headers: Vec<_> = req.headers().get_all(API_KEY_HEADER).collect();
    if headers.len() != 1 {
        return false;
    }

    match headers[0].to_str() {
        Ok(key) => {
            let key = key.trim();
            !key.is_empty() && expected_key.matches(key)
        }
        Err(_) => false,
    }
}
