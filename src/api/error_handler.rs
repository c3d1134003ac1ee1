use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorMessage {
    pub(crate) message: String,
}

pub fn bad_request(error: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorMessage { message: error })
}

pub fn internal_server_error(error: String) -> HttpResponse {
    HttpResponse::InternalServerError().json(ErrorMessage { message: error })
}
