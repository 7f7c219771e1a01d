use crate::config;
use crate::types::{CastLead, Mention, PostReceipt};
use anyhow::Context as _;
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

/// Client for the Neynar Farcaster API.
///
/// Read paths return empty collections on any failure so a flaky social
/// feed reads as "no mentions / no hits", never as a cycle error.
pub struct NeynarClient {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NotificationsEnvelope {
    #[serde(default)]
    notifications: Vec<Notification>,
}

#[derive(Debug, Deserialize)]
struct Notification {
    cast: Option<CastData>,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    result: Option<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    casts: Vec<CastData>,
}

#[derive(Debug, Deserialize)]
struct CastData {
    hash: Option<String>,
    text: Option<String>,
    author: Option<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    username: Option<String>,
    #[serde(default)]
    verifications: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PostEnvelope {
    cast: Option<PostedCast>,
}

#[derive(Debug, Deserialize)]
struct PostedCast {
    hash: Option<String>,
}

impl NeynarClient {
    pub fn new(cfg: &config::Neynar, api_key: Option<&str>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: cfg.api_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    fn mentions_url(&self, fid: &str, limit: u32) -> anyhow::Result<String> {
        let mut url = Url::parse(&format!("{}/notifications/type", self.api_url))
            .context("neynar.api_url is not a valid absolute URL")?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("fid", fid);
            qp.append_pair("type", "mentions");
            qp.append_pair("limit", &limit.to_string());
        }
        Ok(url.to_string())
    }

    fn search_url(&self, query: &str, limit: u32) -> anyhow::Result<String> {
        let mut url = Url::parse(&format!("{}/cast/search", self.api_url))
            .context("neynar.api_url is not a valid absolute URL")?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("q", query);
            qp.append_pair("limit", &limit.to_string());
        }
        Ok(url.to_string())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> anyhow::Result<T> {
        let Some(key) = &self.api_key else {
            anyhow::bail!("no Neynar API key configured");
        };
        let body = self
            .http
            .get(url)
            .header("api_key", key.clone())
            .header("accept", "application/json")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Mentions of the agent account, flattened. Empty on failure.
    pub async fn fetch_mentions(&self, fid: &str, limit: u32) -> Vec<Mention> {
        let url = match self.mentions_url(fid, limit) {
            Ok(url) => url,
            Err(e) => {
                warn!(fid, error = %e, "cannot build mentions URL");
                return Vec::new();
            }
        };
        match self.get_json::<NotificationsEnvelope>(&url).await {
            Ok(envelope) => envelope
                .notifications
                .into_iter()
                .filter_map(|n| n.cast)
                .filter_map(|cast| {
                    Some(Mention {
                        hash: cast.hash?,
                        author: cast
                            .author
                            .as_ref()
                            .and_then(|a| a.username.clone())
                            .unwrap_or_default(),
                        address: cast
                            .author
                            .as_ref()
                            .and_then(|a| a.verifications.first().cloned()),
                        text: cast.text.unwrap_or_default(),
                    })
                })
                .collect(),
            Err(e) => {
                warn!(fid, error = %e, "failed to fetch mentions");
                Vec::new()
            }
        }
    }

    /// Keyword search over the public feed. Empty on failure.
    pub async fn search_casts(&self, query: &str, limit: u32) -> Vec<CastLead> {
        let url = match self.search_url(query, limit) {
            Ok(url) => url,
            Err(e) => {
                warn!(query, error = %e, "cannot build cast search URL");
                return Vec::new();
            }
        };
        match self.get_json::<SearchEnvelope>(&url).await {
            Ok(envelope) => envelope
                .result
                .map(|r| r.casts)
                .unwrap_or_default()
                .into_iter()
                .map(|cast| CastLead {
                    author: cast
                        .author
                        .as_ref()
                        .and_then(|a| a.username.clone())
                        .unwrap_or_default(),
                    address: cast
                        .author
                        .as_ref()
                        .and_then(|a| a.verifications.first().cloned()),
                    text: cast.text.unwrap_or_default(),
                })
                .collect(),
            Err(e) => {
                warn!(query, error = %e, "cast search failed");
                Vec::new()
            }
        }
    }

    /// Post a cast, optionally as a reply to `parent_hash`.
    /// A failed post is a `success: false` receipt, never an error.
    pub async fn post_cast(
        &self,
        signer_uuid: &str,
        text: &str,
        parent_hash: Option<&str>,
    ) -> PostReceipt {
        let Some(key) = &self.api_key else {
            return PostReceipt {
                success: false,
                id: None,
            };
        };

        let mut body = json!({
            "signer_uuid": signer_uuid,
            "text": text,
        });
        if let Some(parent) = parent_hash {
            body["parent"] = json!(parent);
        }

        let url = format!("{}/cast", self.api_url);
        let response = self
            .http
            .post(&url)
            .header("api_key", key.clone())
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let id = resp
                    .json::<PostEnvelope>()
                    .await
                    .ok()
                    .and_then(|e| e.cast)
                    .and_then(|c| c.hash);
                PostReceipt { success: true, id }
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "cast post rejected");
                PostReceipt {
                    success: false,
                    id: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "cast post failed");
                PostReceipt {
                    success: false,
                    id: None,
                }
            }
        }
    }
}
