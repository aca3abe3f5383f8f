//! Wire shapes of the ReviewCheck backend. Decoding is the schema
//! check: required envelope fields (`success`, ids, statuses) have no
//! defaults, so a malformed payload fails at the boundary instead of
//! propagating missing-field access into the views.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisCreateRequest {
    pub review_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisCreateResponse {
    pub success: bool,
    #[serde(default)]
    pub result_code: i32,
    #[serde(default)]
    pub analysis_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisDetailResponse {
    pub success: bool,
    pub analysis_id: i64,
    pub review_url: String,
    pub status: String,
    #[serde(default)]
    pub verdict: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub review_count: Option<u32>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminLoginResponse {
    pub success: bool,
    #[serde(default)]
    pub result_code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminLogoutRequest {
    pub request_user: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminLogoutResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminVerifyResponse {
    pub success: bool,
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub notice_id: i64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoticeDraft {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inquiry {
    pub inquiry_id: i64,
    pub content: String,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InquiryCreateRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InquiryReplyRequest {
    pub answer: String,
}
