use std::str::FromStr;

/// Namespace holding super-admin operations. Always validated.
pub const SUPER_ADMIN_NAMESPACE: &str = "/api/super-admin";

/// Namespaces reachable without a first-party token (intake forms, login).
pub const OPEN_NAMESPACES: &[&str] = &["/api/public", "/api/auth"];

/// Resource names that mark a cross-tenant-sensitive path.
pub const SENSITIVE_RESOURCES: &[&str] = &["users", "practices"];

/// How the sensitive-resource rule looks for `users` / `practices`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateMatch {
    /// Anywhere in the path, so `/api/public/practices-directory` is
    /// validated too.
    #[default]
    Substring,
    /// Only as a whole path segment.
    Segment,
}

impl FromStr for GateMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "substring" => Ok(Self::Substring),
            "segment" => Ok(Self::Segment),
            other => Err(format!(
                "unknown gate match mode {other:?} (expected substring or segment)"
            )),
        }
    }
}

/// Decides, from the request path alone, whether the origin token must be
/// checked. Independent of whether the authenticator is enforcing.
#[derive(Debug, Clone)]
pub struct RouteGate {
    api_prefix: String,
    matching: GateMatch,
}

impl Default for RouteGate {
    fn default() -> Self {
        Self::new(GateMatch::default())
    }
}

impl RouteGate {
    pub fn new(matching: GateMatch) -> Self {
        Self {
            api_prefix: "/api".into(),
            matching,
        }
    }

    pub fn matching(&self) -> GateMatch {
        self.matching
    }

    /// Rules, first match wins:
    /// 1. outside the API prefix: skip (pages, health checks);
    /// 2. super-admin namespace: validate;
    /// 3. `users` / `practices` resource: validate;
    /// 4. public or auth namespace: skip;
    /// 5. any other API path: validate.
    pub fn should_validate(&self, path: &str) -> bool {
        if !is_under(path, &self.api_prefix) {
            return false;
        }
        if is_under(path, SUPER_ADMIN_NAMESPACE) {
            return true;
        }
        if self.touches_sensitive_resource(path) {
            return true;
        }
        // `..` could walk out of an open namespace, so those never skip.
        if OPEN_NAMESPACES.iter().any(|ns| is_under(path, ns)) && !has_dot_segment(path) {
            return false;
        }
        true
    }

    fn touches_sensitive_resource(&self, path: &str) -> bool {
        match self.matching {
            GateMatch::Substring => SENSITIVE_RESOURCES.iter().any(|r| path.contains(r)),
            GateMatch::Segment => path
                .split('/')
                .any(|seg| SENSITIVE_RESOURCES.contains(&seg)),
        }
    }
}

/// `path` equals `prefix` or continues it with a `/`.
fn is_under(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(|seg| seg == "." || seg == "..")
}
