// ABOUTME: Source control URI handling for git-based builds.
// ABOUTME: Rewrites project SCM connection strings into URIs the cluster git fetcher can clone.

const SCM_PREFIX: &str = "scm:git:";

/// Normalize an SCM connection string for cloning over SSH.
///
/// Everything up to and including the last `@` becomes `ssh://git@`.
/// Connections without credentials keep their transport and lose only the
/// `scm:git:` prefix.
pub fn normalize_scm_uri(connection: &str) -> String {
    let connection = connection.trim();
    match connection.rfind('@') {
        Some(at) => format!("ssh://git@{}", &connection[at + 1..]),
        None => connection
            .strip_prefix(SCM_PREFIX)
            .unwrap_or(connection)
            .to_string(),
    }
}

/// Git ref to build from a project's SCM tag. Untagged and `HEAD` builds use `fallback`.
pub fn scm_ref<'a>(tag: Option<&'a str>, fallback: &'a str) -> &'a str {
    match tag {
        Some(tag) if !tag.eq_ignore_ascii_case("HEAD") => tag,
        _ => fallback,
    }
}
