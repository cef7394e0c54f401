use anyhow::{anyhow, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Thin client over the PostgREST-style entity store. Predicates travel as
/// query-string operators (`eq.`, `gte.`, `lt.`, `is.null`), writes return
/// the affected rows under `Prefer: return=representation`, and totals come
/// back in the `Content-Range` header under `Prefer: count=exact`.
pub struct PostgrestClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.postgrest_url.clone(),
            api_key: config.postgrest_api_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(key) = HeaderValue::from_str(&self.api_key) {
            headers.insert("apikey", key);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, bearer);
            }
        }

        headers
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, auth_token, body, None)
            .await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut headers = self.get_headers(auth_token);
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Store error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("Store error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Fetch rows together with the exact filtered total, computed by the
    /// store before any limit/offset slice is applied.
    pub async fn request_with_count(
        &self,
        path: &str,
        auth_token: Option<&str>,
    ) -> Result<(Vec<Value>, i64)> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making counted request to {}", url);

        let mut headers = self.get_headers(auth_token);
        headers.insert("Prefer", HeaderValue::from_static("count=exact"));

        let response = self
            .client
            .request(Method::GET, &url)
            .headers(headers)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Store error ({}): {}", status, error_text);
            return Err(anyhow!("Store error ({}): {}", status, error_text));
        }

        let total = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);

        let rows: Vec<Value> = response.json().await?;
        let total = total.unwrap_or(rows.len() as i64);

        Ok((rows, total))
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

/// `Content-Range: 0-9/57` or `*/0` when no rows match.
fn parse_content_range_total(value: &str) -> Option<i64> {
    let total = value.rsplit('/').next()?;
    total.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_total_from_content_range() {
        assert_eq!(parse_content_range_total("0-9/57"), Some(57));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
    }

    #[test]
    fn ignores_unknown_totals() {
        assert_eq!(parse_content_range_total("0-9/*"), None);
        assert_eq!(parse_content_range_total("nonsense"), None);
    }
}
