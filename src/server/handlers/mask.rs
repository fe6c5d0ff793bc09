use axum::Json;
use serde::{Deserialize, Serialize};

use crate::privacy::mask_aadhaar;

#[derive(Debug, Deserialize)]
pub struct MaskRequest {
    pub details: String,
}

#[derive(Debug, Serialize)]
pub struct MaskResponse {
    pub masked: String,
}

pub async fn mask(Json(request): Json<MaskRequest>) -> Json<MaskResponse> {
    Json(MaskResponse {
        masked: mask_aadhaar(&request.details),
    })
}
