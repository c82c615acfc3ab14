/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/key_rotator/src/providers/flashblade.rs
*
* `StorageClient` implementation for the Pure Storage FlashBlade REST 2.x API.
*
* Session handling follows the array's token exchange:
* 1. `GET /api/api_version` lists the REST versions; the highest 2.x is used.
* 2. `POST /api/login` with the `api-token` header returns a session token in
*    the `x-auth-token` response header.
* 3. Every later request carries that session token.
*
* List endpoints page with `limit` and `continuation_token`; all pages are
* collected before returning. Certificate validation can be disabled for
* arrays using self-signed certificates.
*
* SPDX-License-Identifier: Apache-2.0 */

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::error::{Error, Result};
use crate::models::{AccessKey, Identity, ObjectStoreAccount, ObjectStoreUser, UserRef};
use crate::providers::StorageClient;

const AUTH_HEADER: &str = "x-auth-token";
const API_TOKEN_HEADER: &str = "api-token";
const PAGE_LIMIT: u32 = 100;

/// Connection settings for the array.
#[derive(Clone)]
pub struct FlashBladeSettings {
    /// Management address, with or without scheme (`https://` is assumed).
    pub url: String,
    pub api_token: String,
    pub verify_tls: bool,
    pub timeout: Duration,
}

impl std::fmt::Debug for FlashBladeSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlashBladeSettings")
            .field("url", &self.url)
            .field("api_token", &"<redacted>")
            .field("verify_tls", &self.verify_tls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Deserialize, Debug)]
struct ApiVersions {
    #[serde(default)]
    versions: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct ItemsResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    continuation_token: Option<String>,
}

pub struct FlashBladeClient {
    client: reqwest::Client,
    endpoint: String,
    api_version: String,
    auth_token: String,
}

impl FlashBladeClient {
    /// Negotiates the API version and opens a session. Any failure here is
    /// fatal for the run.
    pub async fn connect(settings: &FlashBladeSettings) -> Result<Self> {
        tracing::debug!("Instantiating FlashBlade client");

        if !settings.verify_tls {
            tracing::warn!("TLS certificate verification against the FlashBlade is disabled");
        }

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!settings.verify_tls)
            .timeout(settings.timeout)
            .build()?;
        let endpoint = normalize_endpoint(&settings.url);

        let api_version = negotiate_version(&client, &endpoint).await?;
        let auth_token = login(&client, &endpoint, &settings.api_token).await?;

        tracing::debug!(api_version = %api_version, "FlashBlade client instantiated OK");
        Ok(Self {
            client,
            endpoint,
            api_version,
            auth_token,
        })
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Ends the session. Sessions also expire on their own, so failures are
    /// only logged.
    pub async fn logout(&self) {
        let url = format!("{}/api/logout", self.endpoint);
        match self
            .client
            .post(&url)
            .header(AUTH_HEADER, &self.auth_token)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("FlashBlade session closed");
            }
            Ok(response) => {
                tracing::warn!(status = response.status().as_u16(), "FlashBlade logout was refused");
            }
            Err(e) => tracing::warn!("FlashBlade logout failed: {}", e),
        }
    }

    fn request(&self, method: Method, resource: &str) -> RequestBuilder {
        let url = format!("{}/api/{}/{}", self.endpoint, self.api_version, resource);
        tracing::debug!(%method, %url, "FlashBlade request");
        self.client
            .request(method, url)
            .header(AUTH_HEADER, &self.auth_token)
    }

    /// Collects every page of a list endpoint.
    async fn get_all<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        resource: &str,
        filter: Option<&str>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = vec![("limit", PAGE_LIMIT.to_string())];
            if let Some(filter) = filter {
                query.push(("filter", filter.to_string()));
            }
            if let Some(token) = &continuation_token {
                query.push(("continuation_token", token.clone()));
            }

            let response = self.request(Method::GET, resource).query(&query).send().await?;
            let page: ItemsResponse<T> = ensure_success(operation, response).await?.json().await?;
            items.extend(page.items);

            match page.continuation_token {
                Some(token) if !token.is_empty() => continuation_token = Some(token),
                _ => break,
            }
        }

        Ok(items)
    }
}

#[async_trait]
impl StorageClient for FlashBladeClient {
    async fn user_exists(&self, name: &str) -> Result<bool> {
        let response = self
            .request(Method::GET, "object-store-users")
            .query(&[("filter", name_filter("name", name))])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                "Failed to fetch object store users with status code {}",
                status.as_u16()
            );
            return Ok(false);
        }

        let page: ItemsResponse<ObjectStoreUser> = response.json().await?;
        Ok(!page.items.is_empty())
    }

    async fn list_keys(&self, identity: &Identity) -> Result<Vec<AccessKey>> {
        let filter = match identity.user_ref() {
            UserRef::Id(id) => name_filter("user.id", id),
            UserRef::Name(name) => name_filter("user.name", name),
        };
        self.get_all("list access keys", "object-store-access-keys", Some(&filter))
            .await
    }

    async fn create_key(&self, identity: &Identity) -> Result<Option<AccessKey>> {
        let user = match identity.user_ref() {
            UserRef::Id(id) => json!({ "id": id }),
            UserRef::Name(name) => json!({ "name": name }),
        };
        let response = self
            .request(Method::POST, "object-store-access-keys")
            .json(&json!({ "user": user }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                body = %body,
                "An error occurred creating a key for user {}",
                identity
            );
            return Ok(None);
        }

        let page: ItemsResponse<AccessKey> = response.json().await?;
        Ok(page.items.into_iter().next())
    }

    async fn delete_keys(&self, names: &[String]) -> Result<bool> {
        let response = self
            .request(Method::DELETE, "object-store-access-keys")
            .query(&[("names", names.join(","))])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                body = %body,
                "An error occurred deleting keys {:?}",
                names
            );
            return Ok(false);
        }
        Ok(true)
    }

    async fn list_accounts(&self) -> Result<Vec<ObjectStoreAccount>> {
        self.get_all("list object store accounts", "object-store-accounts", None)
            .await
    }

    async fn list_users(&self) -> Result<Vec<Identity>> {
        let users: Vec<ObjectStoreUser> = self
            .get_all("list object store users", "object-store-users", None)
            .await?;
        Ok(users.into_iter().map(Identity::from).collect())
    }
}

/// Builds a FlashBlade filter expression such as `name="acct/user"`.
fn name_filter(field: &str, value: &str) -> String {
    format!("{}=\"{}\"", field, value.replace('"', "\\\""))
}

fn normalize_endpoint(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Picks the highest advertised `2.x` version.
fn select_api_version(versions: &[String]) -> Option<String> {
    versions
        .iter()
        .filter_map(|v| {
            let (major, minor) = v.split_once('.')?;
            let major: u32 = major.parse().ok()?;
            let minor: u32 = minor.parse().ok()?;
            (major == 2).then_some((minor, v))
        })
        .max_by_key(|(minor, _)| *minor)
        .map(|(_, v)| v.clone())
}

async fn negotiate_version(client: &reqwest::Client, endpoint: &str) -> Result<String> {
    let url = format!("{}/api/api_version", endpoint);
    let response = client.get(&url).send().await?;
    let versions: ApiVersions = ensure_success("api version discovery", response)
        .await?
        .json()
        .await?;
    select_api_version(&versions.versions).ok_or(Error::UnsupportedApiVersion)
}

async fn login(client: &reqwest::Client, endpoint: &str, api_token: &str) -> Result<String> {
    let url = format!("{}/api/login", endpoint);
    let response = client
        .post(&url)
        .header(API_TOKEN_HEADER, api_token)
        .send()
        .await?;
    let response = ensure_success("login", response).await?;

    response
        .headers()
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or(Error::MissingAuthToken)
}

async fn ensure_success(operation: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body.".to_string());
    Err(Error::Api {
        operation,
        status: status.as_u16(),
        body,
    })
}
