//! Request-time access control over the durable session mirror.
//!
//! The gate never calls the backend. It decides from the stored token and
//! role claim alone, so it is fast, side-effect free, and can act on stale
//! data if the mirror and the backend session have diverged.

use crate::session::{MirrorRecord, SessionMirror};
use crate::types::Role;

/// Why a navigation was redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    /// Protected path and no token.
    Unauthenticated,
    /// Authenticated, but the path belongs to another role.
    Forbidden,
}

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect { to: String, reason: RedirectReason },
}

impl Decision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Redirect target, if any.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::Redirect { to, .. } => Some(to.as_str()),
        }
    }
}

/// Static path classification.
///
/// Prefixes match whole segments: `/dashboard` covers `/dashboard` and
/// `/dashboard/mis-causas` but not `/dashboards`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateRules {
    protected: Vec<String>,
    restricted: Vec<(Role, Vec<String>)>,
    login_path: String,
    landing_path: String,
}

impl Default for GateRules {
    fn default() -> Self {
        Self {
            protected: vec!["/dashboard".into(), "/perfil".into()],
            restricted: vec![
                (Role::Admin, vec!["/dashboard/admin".into()]),
                (
                    Role::Beneficiary,
                    vec!["/dashboard/crear-causa".into(), "/dashboard/mis-causas".into()],
                ),
            ],
            login_path: "/auth/login".into(),
            landing_path: "/dashboard".into(),
        }
    }
}

impl GateRules {
    /// Rules with no protected or restricted paths.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            protected: Vec::new(),
            restricted: Vec::new(),
            ..Self::default()
        }
    }

    /// Replace the set of paths that only need a token.
    #[must_use]
    pub fn with_protected<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected = prefixes.into_iter().map(|p| normalize(&p.into())).collect();
        self
    }

    /// Replace the paths reserved for `role`.
    #[must_use]
    pub fn with_restricted<I, S>(mut self, role: Role, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefixes: Vec<String> = prefixes.into_iter().map(|p| normalize(&p.into())).collect();
        self.restricted.retain(|(r, _)| *r != role);
        if !prefixes.is_empty() {
            self.restricted.push((role, prefixes));
        }
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    #[must_use]
    pub fn with_landing_path(mut self, path: impl Into<String>) -> Self {
        self.landing_path = path.into();
        self
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    #[must_use]
    pub fn landing_path(&self) -> &str {
        &self.landing_path
    }
}

/// Stateless allow/redirect decision for a navigation.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    rules: GateRules,
}

impl AccessGate {
    #[must_use]
    pub fn new(rules: GateRules) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rules(&self) -> &GateRules {
        &self.rules
    }

    /// Whether `path` requires a token.
    #[must_use]
    pub fn is_protected(&self, path: &str) -> bool {
        let path = normalize(path);
        self.rules.protected.iter().any(|p| covers(p, &path))
    }

    /// Role that `path` is reserved for. The most specific prefix wins.
    #[must_use]
    pub fn required_role(&self, path: &str) -> Option<Role> {
        let path = normalize(path);
        self.rules
            .restricted
            .iter()
            .flat_map(|(role, prefixes)| prefixes.iter().map(move |p| (*role, p)))
            .filter(|(_, prefix)| covers(prefix, &path))
            .max_by_key(|(_, prefix)| prefix.len())
            .map(|(role, _)| role)
    }

    /// Decide from explicit inputs.
    ///
    /// Precedence: missing token on a protected path goes to login; a role
    /// claim that does not match the path's role goes to the landing page;
    /// everything else is allowed. An empty token counts as absent.
    #[must_use]
    pub fn check_parts(&self, path: &str, token: Option<&str>, claim: Option<Role>) -> Decision {
        let has_token = token.is_some_and(|t| !t.is_empty());

        if !has_token && self.is_protected(path) {
            tracing::debug!(path, "Gate: no token, redirecting to login");
            return Decision::Redirect {
                to: self.rules.login_path.clone(),
                reason: RedirectReason::Unauthenticated,
            };
        }

        if let (Some(claim), Some(required)) = (claim, self.required_role(path)) {
            if claim != required {
                tracing::debug!(path, %claim, %required, "Gate: role mismatch, redirecting to landing");
                return Decision::Redirect {
                    to: self.rules.landing_path.clone(),
                    reason: RedirectReason::Forbidden,
                };
            }
        }

        Decision::Allow
    }

    /// Decide from a mirror record. A malformed role claim counts as absent.
    #[must_use]
    pub fn check(&self, path: &str, record: &MirrorRecord) -> Decision {
        self.check_parts(path, record.token(), record.role_claim())
    }

    /// Decide from whatever `mirror` currently holds. Read failures count
    /// as an empty mirror.
    #[must_use]
    pub fn check_mirror(&self, path: &str, mirror: &impl SessionMirror) -> Decision {
        let record = mirror.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Gate could not read session mirror");
            None
        });
        self.check(path, &record.unwrap_or_default())
    }
}

fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

fn covers(prefix: &str, path: &str) -> bool {
    prefix == "/"
        || path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryMirror;
    use crate::types::{Session, User};

    fn gate() -> AccessGate {
        AccessGate::default()
    }

    fn record(token: Option<&str>, claim: Option<&str>) -> MirrorRecord {
        MirrorRecord {
            token: token.map(Into::into),
            refresh_token: None,
            user: claim.map(Into::into),
        }
    }

    fn redirect(to: &str, reason: RedirectReason) -> Decision {
        Decision::Redirect {
            to: to.into(),
            reason,
        }
    }

    #[test]
    fn protected_without_token_goes_to_login() {
        let decision = gate().check("/dashboard", &MirrorRecord::default());
        assert_eq!(decision, redirect("/auth/login", RedirectReason::Unauthenticated));
        assert!(!decision.is_allowed());
    }

    #[test]
    fn protected_with_token_is_allowed() {
        let decision = gate().check("/dashboard/donaciones", &record(Some("t1"), None));
        assert!(decision.is_allowed());
    }

    #[test]
    fn admin_path_with_donor_claim_goes_to_landing() {
        let decision = gate().check(
            "/dashboard/admin/usuarios",
            &record(Some("t1"), Some(r#"{"role":"DONOR"}"#)),
        );
        assert_eq!(decision, redirect("/dashboard", RedirectReason::Forbidden));
    }

    #[test]
    fn admin_path_with_admin_claim_is_allowed() {
        let decision = gate().check(
            "/dashboard/admin",
            &record(Some("t1"), Some(r#"{"role":"ADMIN"}"#)),
        );
        assert!(decision.is_allowed());
    }

    #[test]
    fn beneficiary_path_rejects_admin_claim_too() {
        let decision = gate().check(
            "/dashboard/mis-causas",
            &record(Some("t1"), Some(r#"{"role":"ADMIN"}"#)),
        );
        assert_eq!(decision.location(), Some("/dashboard"));
    }

    #[test]
    fn unknown_role_claim_is_denied_restricted_paths() {
        let decision = gate().check(
            "/dashboard/admin",
            &record(Some("t1"), Some(r#"{"role":"ROOT"}"#)),
        );
        assert_eq!(decision, redirect("/dashboard", RedirectReason::Forbidden));
    }

    #[test]
    fn unrestricted_path_is_allowed_regardless_of_token() {
        for record in [
            MirrorRecord::default(),
            record(Some("t1"), Some(r#"{"role":"DONOR"}"#)),
        ] {
            assert!(gate().check("/causas/agua-limpia", &record).is_allowed());
            assert!(gate().check("/", &record).is_allowed());
        }
    }

    #[test]
    fn malformed_claim_falls_back_to_token_check() {
        let with_token = record(Some("t1"), Some("not-json"));
        assert!(gate().check("/dashboard/admin", &with_token).is_allowed());

        let without_token = record(None, Some("not-json"));
        assert_eq!(
            gate().check("/dashboard/admin", &without_token),
            redirect("/auth/login", RedirectReason::Unauthenticated)
        );
    }

    #[test]
    fn missing_token_takes_precedence_over_role() {
        let decision = gate().check(
            "/dashboard/crear-causa",
            &record(None, Some(r#"{"role":"DONOR"}"#)),
        );
        assert_eq!(decision, redirect("/auth/login", RedirectReason::Unauthenticated));
    }

    #[test]
    fn empty_token_counts_as_absent() {
        let decision = gate().check_parts("/dashboard", Some(""), None);
        assert_eq!(decision.location(), Some("/auth/login"));
    }

    #[test]
    fn prefixes_match_whole_segments() {
        let gate = gate();
        assert!(gate.is_protected("/dashboard"));
        assert!(gate.is_protected("/dashboard/"));
        assert!(gate.is_protected("/dashboard?tab=2"));
        assert!(!gate.is_protected("/dashboards"));
        assert_eq!(gate.required_role("/dashboard/crear-causa/paso-2"), Some(Role::Beneficiary));
        assert_eq!(gate.required_role("/dashboard/crear-causas"), None);
        assert_eq!(gate.required_role("/dashboard//admin"), Some(Role::Admin));
        assert_eq!(gate.required_role("//dashboard///crear-causa/"), Some(Role::Beneficiary));
        assert!(gate.is_protected("//perfil"));
    }

    #[test]
    fn repeated_slashes_do_not_bypass_role_check() {
        let decision = gate().check_parts("/dashboard//admin", Some("t1"), Some(Role::Donor));
        assert_eq!(decision.location(), Some("/dashboard"));
        assert!(!decision.is_allowed());
    }

    #[test]
    fn most_specific_restriction_wins() {
        let gate = AccessGate::new(
            GateRules::default()
                .with_restricted(Role::Beneficiary, ["/panel"])
                .with_restricted(Role::Admin, ["/panel/admin/"]),
        );
        assert_eq!(gate.required_role("/panel/admin/x"), Some(Role::Admin));
        assert_eq!(gate.required_role("/panel/otro"), Some(Role::Beneficiary));
    }

    #[test]
    fn restricted_outside_protected_needs_no_token() {
        let gate = AccessGate::new(
            GateRules::empty().with_restricted(Role::Admin, ["/reportes"]),
        );
        assert!(gate.check_parts("/reportes", None, None).is_allowed());
        assert_eq!(
            gate.check_parts("/reportes", None, Some(Role::Donor)).location(),
            Some("/dashboard")
        );
    }

    #[test]
    fn custom_paths_are_used() {
        let gate = AccessGate::new(
            GateRules::default()
                .with_login_path("/ingresar")
                .with_landing_path("/inicio"),
        );
        assert_eq!(gate.check_parts("/perfil", None, None).location(), Some("/ingresar"));
        assert_eq!(
            gate.check_parts("/dashboard/admin", Some("t"), Some(Role::Donor)).location(),
            Some("/inicio")
        );
    }

    #[test]
    fn donor_session_is_sent_from_beneficiary_page_to_landing() {
        let mirror = MemoryMirror::new();
        let user = User::new("u1", "ana@example.com", "Ana", Role::Donor);
        let session = Session::new("t1", Some("t1".into()), user);
        mirror
            .persist(&MirrorRecord::from_session(&session).unwrap())
            .unwrap();

        assert_eq!(
            gate().check_mirror("/dashboard/crear-causa", &mirror),
            redirect("/dashboard", RedirectReason::Forbidden)
        );
    }

    #[test]
    fn empty_mirror_is_sent_to_login() {
        assert_eq!(
            gate().check_mirror("/dashboard", &MemoryMirror::new()),
            redirect("/auth/login", RedirectReason::Unauthenticated)
        );
    }
}
