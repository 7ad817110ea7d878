//! Heuristic site analysis: map a URL to a synthetic graph node.
//!
//! No network access happens here. The hosting profile comes from a table
//! of well-known domains, then from the top-level domain, then from a
//! generic default. Merging the result into a graph is the caller's job.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::graph::{InfraEdge, InfraNode, InfraType, CUSTOM_NODE_PREFIX, USERS_NODE_ID};

/// Likely upstream providers of a site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomainProfile {
    pub cloud: &'static [&'static str],
    pub cdn: &'static [&'static str],
    pub dns: &'static [&'static str],
    /// Existing graph nodes the site is known to be built on
    pub extra_deps: &'static [&'static str],
    pub infra_type: InfraType,
    pub emoji: &'static str,
    pub user_count: f64,
    pub financial_impact: f64,
}

/// Where a profile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileSource {
    KnownDomain,
    TopLevelDomain,
    Default,
}

/// Result of analysing one URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteAnalysis {
    /// Normalized URL, always with a scheme
    pub url: String,
    pub domain: String,
    pub node: InfraNode,
    pub edges: Vec<InfraEdge>,
    pub dependency_ids: Vec<String>,
    pub summary: String,
    pub source: ProfileSource,
}

// =============================================================================
// Profile tables
// =============================================================================

/// Users and hourly impact assumed for sites not in the known table.
const UNKNOWN_SITE_USERS: f64 = 10.0;
const UNKNOWN_SITE_IMPACT: f64 = 1.0;

#[allow(clippy::too_many_arguments)]
const fn profile(
    cloud: &'static [&'static str],
    cdn: &'static [&'static str],
    dns: &'static [&'static str],
    extra_deps: &'static [&'static str],
    infra_type: InfraType,
    emoji: &'static str,
    user_count: f64,
    financial_impact: f64,
) -> DomainProfile {
    DomainProfile {
        cloud,
        cdn,
        dns,
        extra_deps,
        infra_type,
        emoji,
        user_count,
        financial_impact,
    }
}

const fn tld_profile(
    cloud: &'static [&'static str],
    cdn: &'static [&'static str],
    dns: &'static [&'static str],
    infra_type: InfraType,
    emoji: &'static str,
) -> DomainProfile {
    profile(
        cloud,
        cdn,
        dns,
        &[],
        infra_type,
        emoji,
        UNKNOWN_SITE_USERS,
        UNKNOWN_SITE_IMPACT,
    )
}

const DEFAULT_PROFILE: DomainProfile = tld_profile(
    &["aws"],
    &["cloudflare-cdn"],
    &["dns-root"],
    InfraType::Saas,
    "🌐",
);

#[rustfmt::skip]
const KNOWN_DOMAINS: &[(&str, DomainProfile)] = {
    use InfraType::*;
    &[
        // Big tech
        ("google.com", profile(&["gcp"], &[], &["google-dns"], &[], Saas, "🔍", 4000.0, 200.0)),
        ("youtube.com", profile(&["gcp"], &["cloudflare-cdn"], &["google-dns"], &[], Saas, "📺", 2500.0, 80.0)),
        ("gmail.com", profile(&["gcp"], &[], &["google-dns"], &["gmail"], Saas, "📧", 1800.0, 15.0)),
        ("facebook.com", profile(&["aws"], &["akamai-cdn"], &["dns-root"], &[], Social, "📘", 3000.0, 60.0)),
        ("instagram.com", profile(&["aws"], &["cloudflare-cdn", "akamai-cdn"], &["dns-root"], &[], Social, "📸", 2000.0, 40.0)),
        ("twitter.com", profile(&["aws"], &["fastly-cdn"], &["dns-root"], &["twitter"], Social, "🐦", 400.0, 5.0)),
        ("x.com", profile(&["aws"], &["fastly-cdn"], &["dns-root"], &["twitter"], Social, "🐦", 400.0, 5.0)),
        ("reddit.com", profile(&["aws"], &["fastly-cdn", "cloudflare-cdn"], &["cloudflare-dns"], &[], Social, "🤖", 800.0, 5.0)),
        ("tiktok.com", profile(&["aws", "gcp"], &["akamai-cdn", "cloudflare-cdn"], &["cloudflare-dns"], &[], Social, "🎵", 1500.0, 30.0)),
        ("linkedin.com", profile(&["azure"], &["akamai-cdn"], &["dns-root"], &[], Saas, "💼", 900.0, 15.0)),
        ("whatsapp.com", profile(&["aws"], &["cloudflare-cdn"], &["dns-root"], &[], Social, "💬", 2000.0, 10.0)),
        // Development
        ("github.com", profile(&["azure"], &["fastly-cdn"], &["dns-root"], &["github"], Saas, "💻", 100.0, 10.0)),
        ("gitlab.com", profile(&["gcp"], &["cloudflare-cdn"], &["cloudflare-dns"], &[], Saas, "🦊", 30.0, 5.0)),
        ("stackoverflow.com", profile(&["aws"], &["fastly-cdn"], &["cloudflare-dns"], &[], Saas, "📚", 100.0, 2.0)),
        ("npmjs.com", profile(&["aws"], &["cloudflare-cdn"], &["cloudflare-dns"], &[], Saas, "📦", 20.0, 8.0)),
        ("vercel.com", profile(&["aws"], &["cloudflare-cdn"], &["cloudflare-dns"], &[], Cloud, "▲", 10.0, 3.0)),
        ("netlify.com", profile(&["aws"], &["cloudflare-cdn"], &["dns-root"], &[], Cloud, "🌐", 5.0, 2.0)),
        // Commerce and finance
        ("amazon.com", profile(&["aws"], &["cloudflare-cdn", "akamai-cdn"], &["dns-root"], &["stripe"], Saas, "📦", 2000.0, 400.0)),
        ("shopify.com", profile(&["gcp"], &["cloudflare-cdn"], &["cloudflare-dns"], &["shopify", "stripe"], Saas, "🛒", 50.0, 20.0)),
        ("stripe.com", profile(&["aws"], &["cloudflare-cdn"], &["dns-root"], &["stripe"], Finance, "💳", 100.0, 100.0)),
        ("paypal.com", profile(&["gcp", "aws"], &["akamai-cdn"], &["dns-root"], &[], Finance, "💰", 400.0, 150.0)),
        ("ebay.com", profile(&["gcp"], &["akamai-cdn"], &["dns-root"], &["stripe"], Saas, "🏷️", 150.0, 30.0)),
        // Streaming
        ("netflix.com", profile(&["aws"], &["cloudflare-cdn"], &["dns-root"], &["netflix"], Saas, "🎬", 250.0, 30.0)),
        ("spotify.com", profile(&["gcp"], &["fastly-cdn", "cloudflare-cdn"], &["cloudflare-dns"], &[], Saas, "🎵", 500.0, 15.0)),
        ("twitch.tv", profile(&["aws"], &["cloudflare-cdn"], &["dns-root"], &[], Saas, "🎮", 140.0, 5.0)),
        ("disney.com", profile(&["aws"], &["akamai-cdn"], &["dns-root"], &[], Saas, "🏰", 200.0, 20.0)),
        // Workplace SaaS
        ("zoom.us", profile(&["aws", "azure"], &["cloudflare-cdn"], &["cloudflare-dns"], &[], Saas, "📹", 300.0, 25.0)),
        ("slack.com", profile(&["aws"], &["cloudflare-cdn"], &["cloudflare-dns"], &[], Saas, "💬", 30.0, 15.0)),
        ("notion.so", profile(&["aws"], &["cloudflare-cdn"], &["cloudflare-dns"], &[], Saas, "📝", 30.0, 3.0)),
        ("figma.com", profile(&["aws"], &["cloudflare-cdn"], &["cloudflare-dns"], &[], Saas, "🎨", 10.0, 5.0)),
        ("openai.com", profile(&["azure"], &["cloudflare-cdn"], &["cloudflare-dns"], &[], Saas, "🤖", 200.0, 20.0)),
        ("chatgpt.com", profile(&["azure"], &["cloudflare-cdn"], &["cloudflare-dns"], &[], Saas, "🤖", 200.0, 20.0)),
        // News
        ("nytimes.com", profile(&["gcp"], &["fastly-cdn"], &["dns-root"], &[], Saas, "📰", 100.0, 2.0)),
        ("bbc.com", profile(&["aws"], &["akamai-cdn"], &["dns-root"], &[], Saas, "📰", 400.0, 3.0)),
        ("cnn.com", profile(&["aws"], &["fastly-cdn", "akamai-cdn"], &["dns-root"], &[], Saas, "📰", 200.0, 2.0)),
        ("wikipedia.org", profile(&[], &["cloudflare-cdn"], &["cloudflare-dns"], &[], Saas, "📖", 1500.0, 0.0)),
        // Government
        ("irs.gov", profile(&["aws"], &["akamai-cdn"], &["dns-root"], &["gov-services"], Government, "🏛️", 50.0, 100.0)),
        ("usa.gov", profile(&["aws"], &["akamai-cdn"], &["dns-root"], &["gov-services"], Government, "🏛️", 30.0, 20.0)),
        ("gov.uk", profile(&["aws"], &["cloudflare-cdn"], &["dns-root"], &["gov-services"], Government, "🏛️", 60.0, 30.0)),
    ]
};

#[rustfmt::skip]
const TLD_PROFILES: &[(&str, DomainProfile)] = {
    use InfraType::*;
    &[
        (".gov", tld_profile(&["aws"], &["akamai-cdn"], &["dns-root"], Government, "🏛️")),
        (".edu", tld_profile(&["aws"], &["cloudflare-cdn"], &["dns-root"], Saas, "🎓")),
        (".org", tld_profile(&["aws"], &["cloudflare-cdn"], &["dns-root"], Saas, "🌍")),
        (".io", tld_profile(&["aws"], &["cloudflare-cdn"], &["cloudflare-dns"], Saas, "💻")),
        (".dev", tld_profile(&["gcp"], &["cloudflare-cdn"], &["google-dns"], Saas, "🔧")),
        (".app", tld_profile(&["gcp"], &["cloudflare-cdn"], &["google-dns"], Saas, "📱")),
        (".co", tld_profile(&["aws"], &["cloudflare-cdn"], &["cloudflare-dns"], Saas, "🏢")),
        (".ai", tld_profile(&["aws", "gcp"], &["cloudflare-cdn"], &["cloudflare-dns"], Saas, "🤖")),
    ]
};

// =============================================================================
// Profile resolution
// =============================================================================

/// Resolve the hosting profile for a bare domain.
///
/// Checks in order:
/// 1. exact match in the known-domain table
/// 2. longest matching top-level-domain suffix
/// 3. the generic default
pub fn resolve_profile(domain: &str) -> (DomainProfile, ProfileSource) {
    if let Some(profile) = match_known_domain(domain) {
        return (profile, ProfileSource::KnownDomain);
    }

    if let Some(profile) = match_tld(domain) {
        return (profile, ProfileSource::TopLevelDomain);
    }

    (DEFAULT_PROFILE, ProfileSource::Default)
}

fn match_known_domain(domain: &str) -> Option<DomainProfile> {
    KNOWN_DOMAINS
        .iter()
        .find(|(known, _)| *known == domain)
        .map(|(_, profile)| *profile)
}

fn match_tld(domain: &str) -> Option<DomainProfile> {
    TLD_PROFILES
        .iter()
        .filter(|(suffix, _)| domain.ends_with(suffix))
        .max_by_key(|(suffix, _)| suffix.len())
        .map(|(_, profile)| *profile)
}

// =============================================================================
// URL normalization
// =============================================================================

fn http_scheme() -> &'static Regex {
    static HTTP_SCHEME: OnceLock<Regex> = OnceLock::new();
    HTTP_SCHEME.get_or_init(|| Regex::new(r"(?i)^https?://").expect("valid scheme pattern"))
}

fn has_http_scheme(url: &str) -> bool {
    http_scheme().is_match(url)
}

/// Prepend `https://` unless the input already has an http(s) scheme.
fn normalize_url(raw: &str) -> String {
    let url = raw.trim();
    if has_http_scheme(url) {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Bare lowercase host of a normalized URL, without a leading `www.`.
///
/// Falls back to string stripping when the URL does not parse, so this
/// never fails; the worst case is an odd-looking domain.
fn extract_domain(url: &str) -> String {
    let host = match url::Url::parse(url) {
        Ok(parsed) => parsed.host_str().map(str::to_string),
        Err(_) => None,
    };

    let host = host.unwrap_or_else(|| strip_to_host(url));
    let host = host.to_lowercase();
    let bare = host.strip_prefix("www.").unwrap_or(&host);
    bare.to_string()
}

fn strip_to_host(url: &str) -> String {
    http_scheme()
        .replace(url, "")
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn node_id_for(domain: &str) -> String {
    format!("{}{}", CUSTOM_NODE_PREFIX, domain.replace('.', "-"))
}

// =============================================================================
// Analysis
// =============================================================================

/// Analyse a URL or bare domain. Never fails.
pub fn analyze_site(raw_url: &str) -> SiteAnalysis {
    let url = normalize_url(raw_url);
    let domain = extract_domain(&url);
    let (profile, source) = resolve_profile(&domain);

    tracing::debug!(%domain, ?source, "Resolved site profile");

    let node_id = node_id_for(&domain);
    let node = InfraNode::new(
        &node_id,
        &domain,
        profile.infra_type,
        profile.emoji,
        profile.user_count,
        profile.financial_impact,
    );

    let mut edges = Vec::new();
    let mut dependency_ids: Vec<String> = Vec::new();
    let mut depend_on = |id: &str| {
        if !dependency_ids.iter().any(|d| d == id) {
            dependency_ids.push(id.to_string());
        }
    };

    // Nothing resolves without DNS
    for &dns in profile.dns {
        edges.push(InfraEdge::new(dns, &node_id, true));
        depend_on(dns);
    }
    // A lone cloud provider has no failover
    let single_cloud = profile.cloud.len() == 1;
    for &cloud in profile.cloud {
        edges.push(InfraEdge::new(cloud, &node_id, single_cloud));
        depend_on(cloud);
    }
    for &cdn in profile.cdn {
        edges.push(InfraEdge::new(cdn, &node_id, false));
        depend_on(cdn);
    }
    for &extra in profile.extra_deps {
        depend_on(extra);
    }
    edges.push(InfraEdge::new(&node_id, USERS_NODE_ID, false));

    let summary = summarize(&domain, &profile);

    SiteAnalysis {
        url,
        domain,
        node,
        edges,
        dependency_ids,
        summary,
        source,
    }
}

/// Single-point vulnerabilities of a profile, in report order.
pub fn vulnerabilities(profile: &DomainProfile) -> Vec<String> {
    let mut found = Vec::new();
    if profile.cloud.len() == 1 {
        found.push(format!("single cloud provider ({})", profile.cloud.join(", ")));
    }
    if profile.dns.contains(&"dns-root") {
        found.push("depends on root DNS".to_string());
    }
    if profile.cdn.is_empty() {
        found.push("no CDN detected".to_string());
    }
    if profile.cloud.is_empty() {
        found.push("unknown hosting".to_string());
    }
    found
}

fn join_or(ids: &[&str], fallback: &str) -> String {
    if ids.is_empty() {
        fallback.to_string()
    } else {
        ids.join(", ")
    }
}

fn summarize(domain: &str, profile: &DomainProfile) -> String {
    let vulns = vulnerabilities(profile);
    let verdict = if vulns.is_empty() {
        "  No major single-point vulnerabilities detected.".to_string()
    } else {
        format!("  Vulnerabilities: {}", vulns.join("; "))
    };

    [
        format!("Analysis of {}:", domain),
        format!("  Cloud: {}", join_or(profile.cloud, "unknown")),
        format!("  CDN: {}", join_or(profile.cdn, "none detected")),
        format!("  DNS: {}", profile.dns.join(", ")),
        format!("  Est. users: {}M", profile.user_count),
        verdict,
    ]
    .join("\n")
}
