//! Filter-list banner detection using the element-hiding rules of the
//! EasyList Cookie and "I don't care about cookies" lists.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::dom::NodeId;
use tracing::{debug, info};
use url::Url;

use crate::bridge::{self, js, node};
use crate::capture;
use crate::config::ScanOptions;
use crate::detectors::notice;
use crate::imaging;
use crate::page::SharedPageLogs;
use crate::results::ScanResult;

pub const EASYLIST_COOKIE_URL: &str = "https://secure.fanboy.co.nz/fanboy-cookiemonster.txt";
pub const I_DONT_CARE_ABOUT_COOKIES_URL: &str = "https://www.i-dont-care-about-cookies.eu/abp/";
pub const COOKIE_LISTS_DIR: &str = "cookie_lists";

/// One element-hiding rule: a CSS selector plus its domain option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    pub selector: String,
    /// Domains the rule is restricted to, exclusions already removed.
    pub include_domains: Vec<String>,
    pub has_domain_option: bool,
}

impl FilterRule {
    /// A rule applies when it has no domain option, when only exclusions
    /// were listed, or when any listed domain occurs in the scan host.
    /// The substring test is deliberately unanchored.
    pub fn is_applicable(&self, domain: &str) -> bool {
        if !self.has_domain_option {
            return true;
        }
        if self.include_domains.is_empty() {
            // Exclusion-only rules: the notices exist, the ABP plugin is
            // just unable to remove them correctly.
            return true;
        }
        self.include_domains
            .iter()
            .any(|include| domain.contains(include.as_str()))
    }
}

/// An Adblock Plus filter list reduced to its element-hiding rules.
/// URL-pattern rules, metadata, comments and exception rules are skipped.
#[derive(Debug, Default)]
pub struct AdblockPlusFilter {
    rules: Vec<FilterRule>,
}

impl AdblockPlusFilter {
    pub fn parse(contents: &str) -> Self {
        let rules = contents.lines().filter_map(parse_rule).collect();
        Self { rules }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read filter list {}", path.display()))?;
        Ok(Self::parse(&contents))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn applicable_selectors(&self, domain: &str) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|rule| rule.is_applicable(domain))
            .map(|rule| rule.selector.as_str())
            .collect()
    }
}

fn parse_rule(line: &str) -> Option<FilterRule> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('!') || line.starts_with('[') {
        return None;
    }
    if line.contains("#@#") || line.contains("#?#") {
        return None;
    }
    let (prefix, selector) = line.split_once("##")?;
    if selector.is_empty() {
        return None;
    }
    let has_domain_option = !prefix.is_empty();
    let include_domains = prefix
        .split(',')
        .map(str::trim)
        .filter(|domain| !domain.is_empty() && !domain.starts_with('~'))
        .map(str::to_owned)
        .collect();
    Some(FilterRule {
        selector: selector.to_string(),
        include_domains,
        has_domain_option,
    })
}

/// Host part of the site URL, used for the domain-applicability test.
pub fn scan_domain(site_url: &str) -> String {
    if let Ok(url) = Url::parse(site_url)
        && let Some(host) = url.host_str()
    {
        return host.to_string();
    }
    site_url
        .strip_prefix("https://")
        .or_else(|| site_url.strip_prefix("http://"))
        .unwrap_or(site_url)
        .to_string()
}

/// Detector producing the `easylist-cookie` and
/// `i-dont-care-about-cookies` results.
pub struct FilterListDetector {
    filters: Vec<(String, AdblockPlusFilter)>,
}

impl FilterListDetector {
    /// Parse the enabled lists once. Missing files are an error: the
    /// offline refresh path is responsible for fetching them.
    pub fn new(options: &ScanOptions) -> anyhow::Result<Self> {
        let lists_dir = options.storage_path().join(COOKIE_LISTS_DIR);
        let mut names: Vec<&str> = Vec::new();
        if options.detectors().easylist_cookie {
            names.push("easylist-cookie");
        }
        if options.detectors().i_dont_care_about_cookies {
            names.push("i-dont-care-about-cookies");
        }
        let mut filters = Vec::with_capacity(names.len());
        for name in names {
            let path = lists_dir.join(format!("{name}.txt"));
            let filter = AdblockPlusFilter::from_file(&path)?;
            debug!("Loaded {} element-hiding rules from {name}", filter.len());
            filters.push((name.to_string(), filter));
        }
        Ok(Self { filters })
    }

    pub async fn extract_information(
        &self,
        page: &Page,
        _logs: &SharedPageLogs,
        result: &mut ScanResult,
        options: &ScanOptions,
    ) -> anyhow::Result<()> {
        let site_url = result.string("site_url").unwrap_or_default();
        let domain = scan_domain(&site_url);
        for (name, filter) in &self.filters {
            let node_ids = self.find_notices_by_rules(page, filter, &domain).await;
            let node_ids = node::filter_visible_nodes(page, node_ids).await;
            if node_ids.is_empty() {
                continue;
            }
            let screenshot = capture::take_screenshot(page)
                .await
                .and_then(|bytes| imaging::decode_screenshot(&bytes));
            let notices =
                notice::cookie_notices_properties(page, &node_ids, options, screenshot.as_ref())
                    .await;
            info!("{name} matched {} visible cookie notice(s)", notices.len());
            result.set_notices(name, &notices);
            capture::attach_detector_screenshots(page, result, &node_ids, &notices, name, options)
                .await;
        }
        Ok(())
    }

    /// Union of elements matched by every applicable selector, resolved in
    /// one page-side query.
    async fn find_notices_by_rules(
        &self,
        page: &Page,
        filter: &AdblockPlusFilter,
        domain: &str,
    ) -> Vec<NodeId> {
        let selectors = filter.applicable_selectors(domain);
        let rules_json = match serde_json::to_string(&selectors) {
            Ok(json) => json,
            Err(_) => return Vec::new(),
        };
        let script = js::FILTER_QUERY_TEMPLATE.replace("__rules__", &rules_json);
        let Some(result) = bridge::evaluate(page, &script).await else {
            return Vec::new();
        };
        match result.object_id {
            Some(array_id) => bridge::array_to_node_ids(page, &array_id).await,
            None => Vec::new(),
        }
    }

    /// Download the most recent cookie lists into the storage path.
    pub async fn update_dependencies(options: &ScanOptions) -> anyhow::Result<()> {
        let lists_dir = options.storage_path().join(COOKIE_LISTS_DIR);
        std::fs::create_dir_all(&lists_dir)?;
        download_list(EASYLIST_COOKIE_URL, &lists_dir.join("easylist-cookie.txt")).await?;
        download_list(
            I_DONT_CARE_ABOUT_COOKIES_URL,
            &lists_dir.join("i-dont-care-about-cookies.txt"),
        )
        .await?;
        Ok(())
    }
}

async fn download_list(url: &str, target: &PathBuf) -> anyhow::Result<()> {
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("failed to download {url}"))?
        .error_for_status()?;
    let body = response.bytes().await?;
    std::fs::write(target, &body)
        .with_context(|| format!("failed to write {}", target.display()))?;
    info!("Downloaded {url} to {}", target.display());
    Ok(())
}
