use anyhow::Result;
use async_trait::async_trait;

/// Status code and raw body of a completed request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request boundary shared by the geocoding and weather fetchers.
#[async_trait]
pub trait HttpGet: Send + Sync {
    async fn get(&self, url: &str, params: &[(&str, String)]) -> Result<HttpResponse>;
}

/// Bearer-authenticated JSON calls, used by the warehouse client.
#[async_trait]
pub trait HttpJson: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        token: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse>;

    async fn get_authed(
        &self,
        url: &str,
        token: &str,
        params: &[(&str, String)],
    ) -> Result<HttpResponse>;
}

pub struct ReqwestHttp {
    client: reqwest::Client,
}

impl ReqwestHttp {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn finish(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

impl Default for ReqwestHttp {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpGet for ReqwestHttp {
    async fn get(&self, url: &str, params: &[(&str, String)]) -> Result<HttpResponse> {
        let response = self.client.get(url).query(params).send().await?;
        Self::finish(response).await
    }
}

#[async_trait]
impl HttpJson for ReqwestHttp {
    async fn post_json(
        &self,
        url: &str,
        token: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse> {
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        Self::finish(response).await
    }

    async fn get_authed(
        &self,
        url: &str,
        token: &str,
        params: &[(&str, String)],
    ) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(params)
            .send()
            .await?;
        Self::finish(response).await
    }
}
