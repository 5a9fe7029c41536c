//! User-Agent string shared by every request the pipeline makes.

/// Product token sent ahead of the version.
const PRODUCT: &str = "paperfetch";

/// Default User-Agent (identifies the tool and its version).
#[must_use]
pub fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (academic-research-tool)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_crate_version() {
        let ua = default_user_agent();
        let version = ua
            .strip_prefix("paperfetch/")
            .and_then(|s| s.split(' ').next());
        assert_eq!(version, Some(env!("CARGO_PKG_VERSION")), "{ua}");
        assert!(ua.contains("academic-research-tool"), "{ua}");
    }
}
