// citywatch-client/src/http.rs
// HTTP 客户端 - 网络通信

use std::time::Duration;

use async_trait::async_trait;
use http::Method;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{ClientError, ClientResult};

/// 路径段中保留原样的字符 (unreserved 与 `@`)
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'@');

/// Percent-encode an email or id for use as one path segment
pub fn path_segment(raw: &str) -> String {
    utf8_percent_encode(raw, PATH_SEGMENT).to_string()
}

/// 服务端返回的错误响应格式
#[derive(serde::Deserialize)]
struct ApiErrorResponse {
    code: u16,
    message: String,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

/// HTTP 客户端 trait
///
/// The bearer token is passed per call so one client can serve whichever
/// session is current.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&B>,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync;

    async fn get_query<T, Q>(&self, path: &str, token: Option<&str>, query: &Q) -> ClientResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + Sync;

    async fn get<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> ClientResult<T> {
        self.request::<T, ()>(Method::GET, path, token, None).await
    }

    async fn post<T, B>(&self, path: &str, token: Option<&str>, body: &B) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        self.request(Method::POST, path, token, Some(body)).await
    }

    async fn put<T, B>(&self, path: &str, token: Option<&str>, body: &B) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        self.request(Method::PUT, path, token, Some(body)).await
    }

    async fn patch<T, B>(&self, path: &str, token: Option<&str>, body: &B) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        self.request(Method::PATCH, path, token, Some(body)).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> ClientResult<T> {
        self.request::<T, ()>(Method::DELETE, path, token, None).await
    }
}

/// 网络 HTTP 客户端
#[derive(Debug, Clone)]
pub struct NetworkHttpClient {
    client: Client,
    base_url: String,
}

impl NetworkHttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 获取基础 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(req: reqwest::RequestBuilder, token: Option<&str>) -> reqwest::RequestBuilder {
        match token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            // 尝试解析为 API 错误响应
            if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&text) {
                return Err(ClientError::Api {
                    code: api_err.code,
                    message: api_err.message,
                    details: api_err.details,
                });
            }
            return Err(ClientError::InvalidResponse {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl HttpClient for NetworkHttpClient {
    async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&B>,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let mut req = Self::authorize(self.client.request(method, self.url(path)), token);
        if let Some(body) = body {
            req = req.json(body);
        }
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn get_query<T, Q>(&self, path: &str, token: Option<&str>, query: &Q) -> ClientResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + Sync,
    {
        let req = Self::authorize(self.client.get(self.url(path)).query(query), token);
        let response = req.send().await?;
        self.handle_response(response).await
    }
}
