//! API endpoint URL builders

/// `GET /api/{resource}/pkg_name/{identifier}`
pub fn lookup_url(base_url: &str, resource: &str, identifier: &str) -> String {
    format!("{}/api/{}/pkg_name/{}", base_url, resource, identifier)
}

/// `POST /api/submit`
pub fn submit_url(base_url: &str) -> String {
    format!("{}/api/submit", base_url)
}
