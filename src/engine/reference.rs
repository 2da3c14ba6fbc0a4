//! Image reference parsing for publish targets

use super::error::EngineError;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

const DEFAULT_TAG: &str = "latest";

fn host_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)*(:[0-9]+)?$",
        )
        .expect("host pattern is valid")
    })
}

fn path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]+([._-]+[a-z0-9]+)*(/[a-z0-9]+([._-]+[a-z0-9]+)*)*$")
            .expect("path pattern is valid")
    })
}

fn looks_like_host(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

/// Hosts may use uppercase letters; path components may not
fn is_valid_repository(repository: &str) -> bool {
    match repository.split_once('/') {
        Some((host, path)) if looks_like_host(host) => {
            host_pattern().is_match(host) && path_pattern().is_match(path)
        }
        _ => path_pattern().is_match(repository),
    }
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").expect("tag pattern is valid"))
}

/// `repository[:tag]` address an image is pushed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub repository: String,
    pub tag: String,
}

impl ImageReference {
    pub fn parse(address: &str) -> Result<Self, EngineError> {
        let invalid = || EngineError::InvalidReference(address.to_string());

        if address.contains('@') {
            return Err(invalid());
        }

        // A colon after the last slash separates the tag; earlier colons
        // belong to a registry port.
        let last_slash = address.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (repository, tag) = match address[last_slash..].rfind(':') {
            Some(offset) => {
                let split = last_slash + offset;
                (&address[..split], &address[split + 1..])
            }
            None => (address, DEFAULT_TAG),
        };

        if !is_valid_repository(repository) || !tag_pattern().is_match(tag) {
            return Err(invalid());
        }

        Ok(Self {
            repository: repository.to_string(),
            tag: tag.to_string(),
        })
    }

    /// Registry host, when the first path component names one
    pub fn registry(&self) -> Option<&str> {
        let (first, rest) = self.repository.split_once('/')?;
        if rest.is_empty() {
            return None;
        }
        looks_like_host(first).then_some(first)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        ttl = { "ttl.sh/symfony-sample-app-4242", "ttl.sh/symfony-sample-app-4242", "latest" },
        tagged = { "ttl.sh/app:1h", "ttl.sh/app", "1h" },
        registry_port = { "localhost:5000/team/app", "localhost:5000/team/app", "latest" },
        registry_port_tagged = { "localhost:5000/app:v1.2", "localhost:5000/app", "v1.2" },
        bare = { "app", "app", "latest" },
        uppercase_host = { "Registry.Example.com/app", "Registry.Example.com/app", "latest" },
        uppercase_host_port = { "Registry.Example.com:5000/team/app:v1", "Registry.Example.com:5000/team/app", "v1" },
    )]
    fn test_parse_valid(address: &str, repository: &str, tag: &str) {
        let reference = ImageReference::parse(address).unwrap();
        assert_eq!(reference.repository, repository);
        assert_eq!(reference.tag, tag);
    }

    #[parameterized(
        empty = { "" },
        uppercase = { "ttl.sh/App" },
        uppercase_path_first = { "Team/app" },
        uppercase_namespace = { "ttl.sh/Team/app" },
        host_only = { "ttl.sh/" },
        digest = { "ttl.sh/app@sha256:abc" },
        empty_tag = { "ttl.sh/app:" },
        double_slash = { "ttl.sh//app" },
    )]
    fn test_parse_invalid(address: &str) {
        assert!(matches!(
            ImageReference::parse(address),
            Err(EngineError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_registry_host() {
        let ttl = ImageReference::parse("ttl.sh/app").unwrap();
        assert_eq!(ttl.registry(), Some("ttl.sh"));

        let hub = ImageReference::parse("library/php").unwrap();
        assert_eq!(hub.registry(), None);

        let local = ImageReference::parse("localhost:5000/app").unwrap();
        assert_eq!(local.registry(), Some("localhost:5000"));

        let upper = ImageReference::parse("Registry.Example.com/app").unwrap();
        assert_eq!(upper.registry(), Some("Registry.Example.com"));
    }

    #[test]
    fn test_display_includes_tag() {
        let reference = ImageReference::parse("ttl.sh/app").unwrap();
        assert_eq!(reference.to_string(), "ttl.sh/app:latest");
    }
}
