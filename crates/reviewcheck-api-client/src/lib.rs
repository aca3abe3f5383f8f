//! reqwest implementation of the core transport seams plus the durable
//! session store. Everything privileged goes through one bearer
//! interceptor helper; the core crates never see a header.

pub mod store;
pub mod wire;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reviewcheck_client_core::{
    AdminTransport, AnalysisReport, AnalysisSnapshot, AnalysisTransport, ApiError, InputError,
    LoginGrant,
};
use uuid::Uuid;

use crate::wire::{
    AdminLoginRequest, AdminLoginResponse, AdminLogoutRequest, AdminLogoutResponse,
    AdminVerifyResponse, AnalysisCreateRequest, AnalysisCreateResponse, AnalysisDetailResponse,
    Inquiry, InquiryCreateRequest, InquiryReplyRequest, Notice, NoticeDraft,
};

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
pub const ENV_API_BASE_URL: &str = "REVIEWCHECK_API_BASE_URL";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiConfigError {
    #[error("base url must not be empty")]
    EmptyBaseUrl,
    #[error("base url must use http:// or https:// and include a host")]
    InvalidBaseUrl,
}

#[derive(Debug, Clone)]
pub struct ReviewCheckApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl ReviewCheckApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

pub fn normalize_base_url(raw: &str) -> Result<String, ApiConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ApiConfigError::EmptyBaseUrl);
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ApiConfigError::InvalidBaseUrl);
    }
    let Some((_, remainder)) = trimmed.split_once("://") else {
        return Err(ApiConfigError::InvalidBaseUrl);
    };
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(ApiConfigError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}

/// Resolves the backend base URL from the environment, falling back to
/// the local development server.
pub fn resolve_api_base_url() -> Result<String, ApiConfigError> {
    if let Ok(raw) = std::env::var(ENV_API_BASE_URL) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return normalize_base_url(trimmed);
        }
    }
    normalize_base_url(DEFAULT_API_BASE_URL)
}

/// Typed client for the ReviewCheck backend REST contract.
#[derive(Debug, Clone)]
pub struct ReviewCheckApi {
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl ReviewCheckApi {
    pub fn new(config: ReviewCheckApiConfig) -> Result<Self, ApiConfigError> {
        let base_url = normalize_base_url(&config.base_url)?;
        Ok(Self {
            base_url,
            timeout: Duration::from_millis(config.timeout_ms.max(250)),
            http: reqwest::Client::new(),
        })
    }

    pub fn from_env() -> Result<Self, ApiConfigError> {
        let base_url = resolve_api_base_url()?;
        Ok(Self {
            base_url,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            http: reqwest::Client::new(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    #[must_use]
    pub fn analyses_path() -> &'static str {
        "/users/analyses"
    }

    #[must_use]
    pub fn analysis_path(analysis_id: &str) -> String {
        format!("/users/analyses/{}", analysis_id.trim())
    }

    #[must_use]
    pub fn admin_login_path() -> &'static str {
        "/admin/login"
    }

    #[must_use]
    pub fn admin_logout_path() -> &'static str {
        "/admin/logout"
    }

    #[must_use]
    pub fn admin_verify_path() -> &'static str {
        "/admin/verify"
    }

    #[must_use]
    pub fn notices_path() -> &'static str {
        "/users/notices"
    }

    #[must_use]
    pub fn admin_notices_path() -> &'static str {
        "/admin/notices"
    }

    #[must_use]
    pub fn admin_notice_path(notice_id: i64) -> String {
        format!("/admin/notices/{notice_id}")
    }

    #[must_use]
    pub fn users_inquiries_path() -> &'static str {
        "/users/inquiries"
    }

    #[must_use]
    pub fn admin_inquiries_path() -> &'static str {
        "/admin/inquiries"
    }

    #[must_use]
    pub fn admin_inquiry_reply_path(inquiry_id: i64) -> String {
        format!("/admin/inquiries/{inquiry_id}/reply")
    }

    /// Submits a review URL for analysis; returns the server-assigned
    /// analysis id. A `success=false` envelope becomes
    /// [`ApiError::Rejected`] carrying the backend's message.
    pub async fn submit_analysis(&self, review_url: &str) -> Result<String, ApiError> {
        let request = AnalysisCreateRequest {
            review_url: review_url.to_string(),
        };
        let response: AnalysisCreateResponse = self
            .post_json(Self::analyses_path(), &request, None)
            .await?;

        if !response.success {
            return Err(ApiError::Rejected {
                reason: non_empty(response.message)
                    .unwrap_or_else(|| "analysis request was declined".to_string()),
            });
        }
        non_empty(response.analysis_id).ok_or_else(|| ApiError::Malformed {
            message: "accepted analysis without an analysis_id".to_string(),
        })
    }

    pub async fn analysis_detail(&self, analysis_id: &str) -> Result<AnalysisSnapshot, ApiError> {
        let detail: AnalysisDetailResponse = self
            .get_json(&Self::analysis_path(analysis_id), None)
            .await?;
        Ok(AnalysisSnapshot {
            status: detail.status,
            report: AnalysisReport {
                verdict: detail.verdict,
                confidence: detail.confidence,
                review_count: detail.review_count,
            },
            error_message: detail.error_message,
        })
    }

    pub async fn admin_login(&self, username: &str, password: &str) -> Result<LoginGrant, ApiError> {
        let request = AdminLoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response: AdminLoginResponse = self
            .post_json(Self::admin_login_path(), &request, None)
            .await?;

        if !response.success {
            return Err(ApiError::Rejected {
                reason: non_empty(response.message)
                    .unwrap_or_else(|| "login was declined".to_string()),
            });
        }
        let Some(token) = response.token.and_then(non_empty) else {
            return Err(ApiError::Malformed {
                message: "successful login without a token".to_string(),
            });
        };
        Ok(LoginGrant {
            token,
            expires_at: response.expires_at,
        })
    }

    pub async fn admin_logout(&self, token: &str, username: &str) -> Result<(), ApiError> {
        let request = AdminLogoutRequest {
            request_user: username.to_string(),
        };
        let response: AdminLogoutResponse = self
            .post_json(Self::admin_logout_path(), &request, Some(token))
            .await?;
        if !response.success {
            return Err(ApiError::Rejected {
                reason: non_empty(response.message)
                    .unwrap_or_else(|| "logout was declined".to_string()),
            });
        }
        Ok(())
    }

    pub async fn admin_verify(&self, token: &str) -> Result<bool, ApiError> {
        let response: AdminVerifyResponse = self
            .get_json(Self::admin_verify_path(), Some(token))
            .await?;
        Ok(response.success && response.valid)
    }

    pub async fn list_notices(&self) -> Result<Vec<Notice>, ApiError> {
        self.get_json(Self::notices_path(), None).await
    }

    pub async fn create_notice(&self, token: &str, draft: &NoticeDraft) -> Result<Notice, ApiError> {
        self.post_json(Self::admin_notices_path(), draft, Some(token))
            .await
    }

    pub async fn update_notice(
        &self,
        token: &str,
        notice_id: i64,
        draft: &NoticeDraft,
    ) -> Result<Notice, ApiError> {
        self.put_json(&Self::admin_notice_path(notice_id), draft, Some(token))
            .await
    }

    pub async fn delete_notice(&self, token: &str, notice_id: i64) -> Result<(), ApiError> {
        let url = self.endpoint(&Self::admin_notice_path(notice_id));
        let response = self
            .send(self.authorized(self.http.delete(url), Some(token)))
            .await?;
        check_status(response.status(), &[])
    }

    /// User-side inquiry submission; no credential required.
    pub async fn submit_inquiry(&self, content: &str) -> Result<Inquiry, ApiError> {
        let request = InquiryCreateRequest {
            content: content.to_string(),
        };
        self.post_json(Self::users_inquiries_path(), &request, None)
            .await
    }

    pub async fn list_inquiries(&self, token: &str) -> Result<Vec<Inquiry>, ApiError> {
        self.get_json(Self::admin_inquiries_path(), Some(token)).await
    }

    pub async fn reply_inquiry(
        &self,
        token: &str,
        inquiry_id: i64,
        answer: &str,
    ) -> Result<Inquiry, ApiError> {
        let request = InquiryReplyRequest {
            answer: answer.to_string(),
        };
        self.post_json(
            &Self::admin_inquiry_reply_path(inquiry_id),
            &request,
            Some(token),
        )
        .await
    }

    async fn get_json<T>(&self, path: &str, bearer: Option<&str>) -> Result<T, ApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = self.endpoint(path);
        let response = self.send(self.authorized(self.http.get(url), bearer)).await?;
        decode_json_response(response).await
    }

    async fn post_json<Req, Res>(
        &self,
        path: &str,
        payload: &Req,
        bearer: Option<&str>,
    ) -> Result<Res, ApiError>
    where
        Req: serde::Serialize + ?Sized,
        Res: serde::de::DeserializeOwned,
    {
        let url = self.endpoint(path);
        let response = self
            .send(self.authorized(self.http.post(url), bearer).json(payload))
            .await?;
        decode_json_response(response).await
    }

    async fn put_json<Req, Res>(
        &self,
        path: &str,
        payload: &Req,
        bearer: Option<&str>,
    ) -> Result<Res, ApiError>
    where
        Req: serde::Serialize + ?Sized,
        Res: serde::de::DeserializeOwned,
    {
        let url = self.endpoint(path);
        let response = self
            .send(self.authorized(self.http.put(url), bearer).json(payload))
            .await?;
        decode_json_response(response).await
    }

    /// The outbound-request interceptor: every privileged request gets
    /// its `Authorization: Bearer` header here and nowhere else.
    fn authorized(
        &self,
        builder: reqwest::RequestBuilder,
        bearer: Option<&str>,
    ) -> reqwest::RequestBuilder {
        match bearer {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        builder
            .timeout(self.timeout)
            .header("x-request-id", format!("req_{}", Uuid::new_v4().simple()))
            .send()
            .await
            .map_err(|err| ApiError::Transport {
                message: err.to_string(),
            })
    }
}

#[async_trait]
impl AnalysisTransport for ReviewCheckApi {
    async fn create_analysis(&self, review_url: &str) -> Result<String, ApiError> {
        self.submit_analysis(review_url).await
    }

    async fn fetch_analysis(&self, analysis_id: &str) -> Result<AnalysisSnapshot, ApiError> {
        self.analysis_detail(analysis_id).await
    }
}

#[async_trait]
impl AdminTransport for ReviewCheckApi {
    async fn login(&self, username: &str, password: &str) -> Result<LoginGrant, ApiError> {
        self.admin_login(username, password).await
    }

    async fn logout(&self, token: &str, username: &str) -> Result<(), ApiError> {
        self.admin_logout(token, username).await
    }

    async fn verify(&self, token: &str) -> Result<bool, ApiError> {
        self.admin_verify(token).await
    }
}

impl NoticeDraft {
    /// Client-side validation before submission; both fields are
    /// required by the admin form.
    pub fn validated(title: &str, content: &str) -> Result<Self, InputError> {
        let title = title.trim();
        let content = content.trim();
        if title.is_empty() {
            return Err(InputError::MissingField("title"));
        }
        if content.is_empty() {
            return Err(InputError::MissingField("content"));
        }
        Ok(Self {
            title: title.to_string(),
            content: content.to_string(),
        })
    }
}

fn check_status(status: StatusCode, body: &[u8]) -> Result<(), ApiError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ApiError::Unauthorized);
    }
    if !status.is_success() {
        let body = non_empty(String::from_utf8_lossy(body).trim().to_string())
            .unwrap_or_else(|| "<empty>".to_string());
        return Err(ApiError::Transport {
            message: format!("http {}: {}", status.as_u16(), body),
        });
    }
    Ok(())
}

async fn decode_json_response<T>(response: reqwest::Response) -> Result<T, ApiError>
where
    T: serde::de::DeserializeOwned,
{
    let status = response.status();
    let bytes = response.bytes().await.map_err(|err| ApiError::Transport {
        message: err.to_string(),
    })?;
    check_status(status, &bytes)?;

    serde_json::from_slice::<T>(&bytes).map_err(|err| {
        tracing::warn!(error = %err, "response payload did not match the expected schema");
        ApiError::Malformed {
            message: err.to_string(),
        }
    })
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
