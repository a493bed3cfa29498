//! Path codec for provider URIs.
//!
//! A provider path looks like `/<protocol><host>:<port><posix-path>` — the
//! first segment embeds a root identifier with the protocol's `://` collapsed
//! to `:`, and the remainder is a POSIX-style relative path. Decoding is pure
//! and total: malformed input produces a root string that fails downstream
//! lookups, never a codec-level error.

/// A decoded provider path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootedPath {
    /// Normalized root identifier, e.g. `https://example.com:8443`.
    pub root: String,
    /// Relative path with a leading slash; `/` for the root itself.
    pub path: String,
}

/// Split a provider path into its root identifier and relative path.
pub fn split_path(full_path: &str) -> RootedPath {
    let trimmed = full_path.strip_prefix('/').unwrap_or(full_path);
    let (root, rest) = match trimmed.find('/') {
        Some(idx) => (&trimmed[..idx], &trimmed[idx..]),
        None => (trimmed, ""),
    };

    let path = if rest.is_empty() || rest == "/" {
        "/".to_string()
    } else {
        rest.strip_suffix('/').unwrap_or(rest).to_string()
    };

    RootedPath {
        root: expand_protocol(root),
        path,
    }
}

/// Re-encode a root identifier and relative path into a provider path.
///
/// Inverse of [`split_path`] modulo trailing-slash normalization.
pub fn join_path(root: &str, path: &str) -> String {
    let collapsed = collapse_protocol(root);
    if path == "/" {
        format!("/{collapsed}")
    } else {
        format!("/{collapsed}{path}")
    }
}

/// Parent path of a relative path; the parent of any top-level entry is `/`.
pub fn parent_path(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

/// Final path segment.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Key normalizer used for root identifiers: roots cached with and without a
/// trailing slash must land on the same entry.
pub fn ensure_trailing_slash(key: &str) -> String {
    if key.ends_with('/') {
        key.to_string()
    } else {
        format!("{key}/")
    }
}

/// Re-expand the protocol separator embedded in a path segment:
/// `https:host:8443` -> `https://host:8443`.
fn expand_protocol(root: &str) -> String {
    for scheme in ["https:", "http:"] {
        if let Some(rest) = root.strip_prefix(scheme) {
            if !rest.starts_with("//") {
                return format!("{scheme}//{rest}");
            }
        }
    }
    root.to_string()
}

fn collapse_protocol(root: &str) -> String {
    for scheme in ["https://", "http://"] {
        if let Some(rest) = root.strip_prefix(scheme) {
            return format!("{}{rest}", &scheme[..scheme.len() - 2]);
        }
    }
    root.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_root_and_path() {
        let rp = split_path("/https:example.com:8443/dir/a.txt");
        assert_eq!(rp.root, "https://example.com:8443");
        assert_eq!(rp.path, "/dir/a.txt");
    }

    #[test]
    fn bare_root_normalizes_to_slash() {
        for input in [
            "/https:example.com:8443",
            "/https:example.com:8443/",
        ] {
            let rp = split_path(input);
            assert_eq!(rp.root, "https://example.com:8443");
            assert_eq!(rp.path, "/");
        }
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let rp = split_path("/http:host:10000/folder/");
        assert_eq!(rp.root, "http://host:10000");
        assert_eq!(rp.path, "/folder");
    }

    #[test]
    fn malformed_input_does_not_panic() {
        assert_eq!(split_path("").path, "/");
        assert_eq!(split_path("").root, "");
        assert_eq!(split_path("/").path, "/");
        assert_eq!(split_path("no-leading-slash").root, "no-leading-slash");
    }

    #[test]
    fn join_inverts_split() {
        let uri = "/https:example.com:8443/dir/a.txt";
        let rp = split_path(uri);
        assert_eq!(join_path(&rp.root, &rp.path), uri);
    }

    #[test]
    fn parent_and_base() {
        assert_eq!(parent_path("/a/b/c.txt"), "/a/b");
        assert_eq!(parent_path("/a"), "/");
        assert_eq!(parent_path("/"), "/");
        assert_eq!(base_name("/a/b/c.txt"), "c.txt");
        assert_eq!(base_name("/a"), "a");
    }

    #[test]
    fn trailing_slash_normalizer() {
        assert_eq!(ensure_trailing_slash("https://h:1"), "https://h:1/");
        assert_eq!(ensure_trailing_slash("https://h:1/"), "https://h:1/");
    }

    mod props {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            /// Decode then re-encode is the identity for well-formed paths
            /// without trailing slashes.
            #[test]
            fn split_join_round_trip(
                host in "[a-z]{1,8}\\.[a-z]{2,3}",
                port in 1u16..u16::MAX,
                segs in prop::collection::vec("[a-zA-Z0-9_.]{1,12}", 0..5),
            ) {
                let mut uri = format!("/https:{host}:{port}");
                for s in &segs {
                    uri.push('/');
                    uri.push_str(s);
                }
                let rp = split_path(&uri);
                prop_assert_eq!(join_path(&rp.root, &rp.path), uri);
            }
        }
    }
}
