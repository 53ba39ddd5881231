//! Tracker matching against the Disconnect catalogue.

use std::path::Path;

use anyhow::Context;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::config::ScanOptions;
use crate::page::SharedPageLogs;
use crate::results::ScanResult;

pub const DISCONNECT_DIR: &str = "disconnect";
pub const DISCONNECT_FILE: &str = "disconnect.json";
pub const SERVICES_DOWNLOAD_URL: &str =
    "https://raw.githubusercontent.com/disconnectme/disconnect-tracking-protection/master/services.json";

/// A hit against the catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerMatch {
    pub category: String,
    pub company: String,
    pub company_url: String,
    pub domain: String,
}

/// Matches recorded request URLs against the Disconnect catalogue (the
/// `Content` top-level category is already stripped by the offline refresh).
pub struct TrackerExtractor {
    disconnect_list: Value,
}

impl TrackerExtractor {
    pub fn new(options: &ScanOptions) -> anyhow::Result<Self> {
        let path = options
            .storage_path()
            .join(DISCONNECT_DIR)
            .join(DISCONNECT_FILE);
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read tracker catalogue {}", path.display()))?;
        let disconnect_list = serde_json::from_str(&contents)
            .with_context(|| format!("invalid tracker catalogue {}", path.display()))?;
        Ok(Self { disconnect_list })
    }

    pub fn from_value(disconnect_list: Value) -> Self {
        Self { disconnect_list }
    }

    /// Check each recorded request and publish the matches plus their
    /// count. Running twice over the same log yields equal lists.
    pub async fn extract_information(
        &self,
        logs: &SharedPageLogs,
        result: &mut ScanResult,
    ) -> anyhow::Result<()> {
        let request_urls: Vec<String> = {
            let logs = logs.lock();
            logs.request_log.iter().map(|r| r.url.clone()).collect()
        };
        let mut trackers = Vec::new();
        for url in &request_urls {
            if let Some(hit) = self.check_against_disconnect_list(url) {
                trackers.push(json!({
                    "url": url,
                    "category": hit.category,
                    "company": hit.company,
                    "company_url": hit.company_url,
                    "domain": hit.domain,
                }));
            }
        }
        debug!("{} tracker request(s) matched", trackers.len());
        result.insert("disconnect_num", trackers.len());
        result.insert("disconnect", trackers);
        Ok(())
    }

    /// A catalogue domain matches when it is a non-trivial substring of the
    /// request URL and the request's registered domain differs (same-site
    /// requests are not trackers).
    pub fn check_against_disconnect_list(&self, request_url: &str) -> Option<TrackerMatch> {
        let request_domain = registered_domain(request_url).unwrap_or_default();
        let categories = self.disconnect_list.get("categories")?.as_object()?;
        for (category, entities) in categories {
            let Some(entities) = entities.as_array() else {
                continue;
            };
            for entity in entities {
                let Some(entity) = entity.as_object() else {
                    continue;
                };
                for (company, services) in entity {
                    let Some(services) = services.as_object() else {
                        continue;
                    };
                    for (company_url, domains) in services {
                        // Some entries carry marker keys set to "true".
                        let Some(domains) = domains.as_array() else {
                            continue;
                        };
                        for domain in domains {
                            let Some(domain) = domain.as_str() else {
                                continue;
                            };
                            if request_url.contains(domain)
                                && domain.len() > 5
                                && request_domain != domain
                            {
                                return Some(TrackerMatch {
                                    category: category.clone(),
                                    company: company.clone(),
                                    company_url: company_url.clone(),
                                    domain: domain.to_string(),
                                });
                            }
                        }
                    }
                }
            }
        }
        None
    }

    /// Download `services.json` and derive `disconnect.json` with the
    /// `Content` category removed.
    pub async fn update_dependencies(options: &ScanOptions) -> anyhow::Result<()> {
        let disconnect_dir = options.storage_path().join(DISCONNECT_DIR);
        std::fs::create_dir_all(&disconnect_dir)?;
        let response = reqwest::get(SERVICES_DOWNLOAD_URL)
            .await
            .context("failed to download services.json")?
            .error_for_status()?;
        let body = response.bytes().await?;
        std::fs::write(disconnect_dir.join("services.json"), &body)?;
        let mut services: Value = serde_json::from_slice(&body)?;
        if let Some(categories) = services
            .get_mut("categories")
            .and_then(Value::as_object_mut)
        {
            categories.shift_remove("Content");
        }
        let derived = serde_json::to_string_pretty(&services)?;
        std::fs::write(disconnect_dir.join(DISCONNECT_FILE), derived)?;
        Ok(())
    }
}

/// Registered domain of a URL, e.g. `sub.example.co.uk` -> `example.co.uk`.
pub fn registered_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    psl::domain_str(host).map(str::to_owned)
}
