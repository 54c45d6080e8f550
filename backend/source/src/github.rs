//! GitHub URL normalization.
//!
//! A `github.com/<owner>/<repo>/blob/<ref>/<path>` page URL is rewritten to the
//! matching `raw.githubusercontent.com` URL so the relay returns file contents
//! rather than the HTML viewer. Anything else passes through trimmed.

use codecontext_core::FetchError;
use url::Url;

const RAW_HOST: &str = "https://raw.githubusercontent.com";

pub fn normalize_source_url(input: &str) -> Result<String, FetchError> {
    let trimmed = input.trim();
    let not_found = || FetchError::NotFound {
        url: trimmed.to_string(),
    };

    if trimmed.is_empty() {
        return Err(not_found());
    }

    let parsed = Url::parse(trimmed).map_err(|_| not_found())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(not_found());
    }

    let is_github = matches!(parsed.host_str(), Some("github.com") | Some("www.github.com"));
    if !is_github {
        return Ok(trimmed.to_string());
    }

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        [owner, repo, "blob" | "raw", git_ref, path @ ..] if !path.is_empty() => Ok(format!(
            "{RAW_HOST}/{owner}/{repo}/{git_ref}/{}",
            path.join("/")
        )),
        _ => Ok(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_blob_url() {
        let url = "https://github.com/x/y/blob/main/src/a.py";
        assert_eq!(
            normalize_source_url(url).unwrap(),
            "https://raw.githubusercontent.com/x/y/main/src/a.py"
        );
    }

    #[test]
    fn rewrites_raw_view_url_and_drops_query() {
        let url = " https://github.com/x/y/raw/v1.2/a.rs?plain=1 ";
        assert_eq!(
            normalize_source_url(url).unwrap(),
            "https://raw.githubusercontent.com/x/y/v1.2/a.rs"
        );
    }

    #[test]
    fn raw_url_passes_through() {
        let url = "https://raw.githubusercontent.com/x/y/main/a.py";
        assert_eq!(normalize_source_url(url).unwrap(), url);
    }

    #[test]
    fn repo_root_passes_through() {
        let url = "https://github.com/x/y";
        assert_eq!(normalize_source_url(url).unwrap(), url);
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert!(matches!(
            normalize_source_url("   "),
            Err(FetchError::NotFound { .. })
        ));
        assert!(matches!(
            normalize_source_url("not a url"),
            Err(FetchError::NotFound { .. })
        ));
        assert!(matches!(
            normalize_source_url("ftp://github.com/x/y/blob/main/a"),
            Err(FetchError::NotFound { .. })
        ));
    }
}
