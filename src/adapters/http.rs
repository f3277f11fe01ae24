use crate::domain::model::{
    CreateEnrollmentRequest, Enrollment, EnrollmentPage, EnrollmentPatch, ListQuery, Pagination,
    TransitionAction,
};
use crate::domain::ports::EnrollmentRepository;
use crate::utils::error::{EnrollError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// 錯誤訊息最多保留多少字元,避免把整頁 HTML 塞進錯誤裡。
const MAX_ERROR_BODY: usize = 200;

/// 後端統一的回應信封。
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    pub data: Option<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// 權威存放區的 HTTP 實作。
pub struct HttpEnrollmentRepository {
    client: Client,
    base_url: Url,
    headers: HashMap<String, String>,
    timeout: Option<Duration>,
}

impl HttpEnrollmentRepository {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| EnrollError::ConfigError {
            message: format!("Invalid base URL {}: {}", base_url, e),
        })?;
        Ok(Self {
            client: Client::new(),
            base_url,
            headers: HashMap::new(),
            timeout: None,
        })
    }

    /// 每個請求都會帶上的自定義標頭(例如認證 token)。
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| EnrollError::ConfigError {
                message: format!("Base URL cannot be a base: {}", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn apply(&self, mut request: RequestBuilder) -> RequestBuilder {
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        request
    }

    /// 解碼信封;非 2xx 或 success=false 都對應成 ServerError,
    /// 帶上後端給的 code 與 message 供上層分類。
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<ApiEnvelope<T>> {
        let status = response.status();
        let body = response.text().await?;

        let envelope: ApiEnvelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                // 非 JSON 的錯誤頁(proxy、gateway),保留截斷後的原文
                let message: String = body.trim().chars().take(MAX_ERROR_BODY).collect();
                return Err(EnrollError::ServerError {
                    status: status.as_u16(),
                    code: None,
                    message,
                });
            }
            Err(e) => return Err(e.into()),
        };

        if status.is_success() && envelope.success {
            Ok(envelope)
        } else {
            Err(EnrollError::ServerError {
                status: status.as_u16(),
                code: envelope.code,
                message: envelope.message,
            })
        }
    }

    async fn decode_data<T: DeserializeOwned>(response: Response, context: &str) -> Result<T> {
        let envelope = Self::decode::<T>(response).await?;
        envelope.data.ok_or_else(|| EnrollError::MissingData {
            context: context.to_string(),
        })
    }
}

#[async_trait]
impl EnrollmentRepository for HttpEnrollmentRepository {
    async fn create(&self, request: &CreateEnrollmentRequest) -> Result<Enrollment> {
        let url = self.endpoint(&["enrollments"])?;
        tracing::debug!("POST {}", url);
        let response = self.apply(self.client.post(url).json(request)).send().await?;
        Self::decode_data(response, "create enrollment").await
    }

    async fn read(&self, id: &str) -> Result<Enrollment> {
        let url = self.endpoint(&["enrollments", id])?;
        tracing::debug!("GET {}", url);
        let response = self.apply(self.client.get(url)).send().await?;
        Self::decode_data(response, "read enrollment").await
    }

    async fn list(&self, query: &ListQuery) -> Result<EnrollmentPage> {
        let url = self.endpoint(&["enrollments"])?;

        let mut params: Vec<(&str, String)> = vec![
            ("page", query.page.to_string()),
            ("size", query.size.to_string()),
        ];
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }
        if let Some(status) = &query.status {
            params.push(("status", status.as_str().to_string()));
        }
        if let Some(program) = &query.program {
            params.push(("program", program.clone()));
        }
        if let Some(student) = &query.student {
            params.push(("student", student.clone()));
        }

        tracing::debug!("GET {} (page {}, size {})", url, query.page, query.size);
        let response = self
            .apply(self.client.get(url).query(&params))
            .send()
            .await?;
        let envelope = Self::decode::<Vec<Enrollment>>(response).await?;
        Ok(EnrollmentPage {
            items: envelope.data.unwrap_or_default(),
            pagination: envelope.pagination,
        })
    }

    async fn update(&self, id: &str, patch: &EnrollmentPatch) -> Result<Enrollment> {
        let url = self.endpoint(&["enrollments", id])?;
        tracing::debug!("PUT {}", url);
        let response = self.apply(self.client.put(url).json(patch)).send().await?;
        Self::decode_data(response, "update enrollment").await
    }

    async fn transition(&self, id: &str, action: TransitionAction) -> Result<Enrollment> {
        let url = self.endpoint(&["enrollments", id, action.as_str()])?;
        tracing::debug!("PATCH {}", url);
        let response = self.apply(self.client.patch(url)).send().await?;
        Self::decode_data(response, "transition enrollment").await
    }
}
