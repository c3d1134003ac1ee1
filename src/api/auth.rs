use std::env;

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse};
use if_chain::if_chain;
use moka::future::Cache;
use serde::Deserialize;

use crate::api::error_handler::ErrorMessage;
use crate::constant;

/// Identity as vouched for by the external verification service. The platform
/// keeps no user table of its own.
#[derive(Debug, Copy, Clone, Deserialize)]
pub struct UserInfo {
    pub id: i32,
}

lazy_static::lazy_static! {
    static ref GLOBAL_USER_CACHE: Cache<String,UserInfo> = {
        Cache::new(10000)
    };
}

async fn request_user_info(header: &str) -> Result<UserInfo, HttpResponse> {
    let header = header.to_string();
    if let Some(info) = GLOBAL_USER_CACHE.get(&header) {
        return Ok(info);
    }
    let client = reqwest::Client::new();
    let result = client
        .get(env::var(constant::ENV_USER_VERIFICATION_ADDRESS).unwrap())
        .header("Authorization", &header)
        .send()
        .await;
    match result {
        Ok(response) => {
            if let Ok(user) = response.json::<UserInfo>().await {
                GLOBAL_USER_CACHE.insert(header, user).await;
                Ok(user)
            } else {
                Err(HttpResponse::InternalServerError().json(ErrorMessage {
                    message: "Internal Error: Cannot validate authorization information.".to_string(),
                }))
            }
        }
        Err(e) => {
            if let Some(status_code) = e.status() {
                if status_code == StatusCode::UNAUTHORIZED {
                    return Err(HttpResponse::Unauthorized().json(ErrorMessage {
                        message: "Authorization Failed.".to_string(),
                    }));
                }
            }
            log::warn!("user verification request failed: {}", e);
            Err(HttpResponse::InternalServerError().json(ErrorMessage {
                message: "Internal Error: Cannot validate authorization information.".to_string(),
            }))
        }
    }
}

pub async fn require_authentication(req: &HttpRequest) -> Result<UserInfo, HttpResponse> {
    let authorization = req.headers().get("Authorization");
    if_chain! {
        if let Some(header) = authorization;
        if let Ok(header_value) = header.to_str();
        then {
            return request_user_info(header_value).await
        } else {
            return Err(HttpResponse::Unauthorized().json(ErrorMessage { message: "Authorization Information Needed.".to_string() }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::UserInfo;

    // the verifier sends more fields than the platform needs
    #[test]
    fn user_info_ignores_extra_verifier_fields() {
        let info: UserInfo =
            serde_json::from_str(r#"{"id": 7, "is_admin": true, "nickname": "ada"}"#).unwrap();
        assert_eq!(info.id, 7);
    }
}
