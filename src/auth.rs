use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{
    Algorithm, DecodingKey, Validation, decode, decode_header, errors::ErrorKind, jwk::JwkSet,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    marker::PhantomData,
    str::FromStr,
    sync::Arc,
};

use crate::{
    config::{AppConfig, AuthConfig, Env},
    error::AppError,
};

// --- Permissions & Roles ---

/// Permission
///
/// Every action the API guards. The wire form is `<action>:<resource>`, e.g. `read:movies`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Permission {
    ReadMovies,
    CreateMovies,
    UpdateMovies,
    DeleteMovies,
    ReadActors,
    CreateActors,
    UpdateActors,
    DeleteActors,
}

impl Permission {
    pub const ALL: [Permission; 8] = [
        Permission::ReadMovies,
        Permission::CreateMovies,
        Permission::UpdateMovies,
        Permission::DeleteMovies,
        Permission::ReadActors,
        Permission::CreateActors,
        Permission::UpdateActors,
        Permission::DeleteActors,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ReadMovies => "read:movies",
            Permission::CreateMovies => "create:movies",
            Permission::UpdateMovies => "update:movies",
            Permission::DeleteMovies => "delete:movies",
            Permission::ReadActors => "read:actors",
            Permission::CreateActors => "create:actors",
            Permission::UpdateActors => "update:actors",
            Permission::DeleteActors => "delete:actors",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|permission| permission.as_str() == s)
            .ok_or_else(|| format!("unknown permission: {s}"))
    }
}

impl TryFrom<String> for Permission {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Permission> for String {
    fn from(permission: Permission) -> Self {
        permission.as_str().to_string()
    }
}

/// Role
///
/// The three roles the identity provider grants. The provider owns the real role-to-permission
/// mapping; these presets mirror it for local development and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    CastingAssistant,
    CastingDirector,
    ExecutiveProducer,
}

impl Role {
    pub fn permissions(&self) -> BTreeSet<Permission> {
        use Permission::*;
        match self {
            Role::CastingAssistant => BTreeSet::from([ReadMovies, ReadActors]),
            Role::CastingDirector => {
                BTreeSet::from([ReadMovies, ReadActors, CreateActors, UpdateActors])
            }
            Role::ExecutiveProducer => Permission::ALL.into_iter().collect(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::CastingAssistant => "casting-assistant",
            Role::CastingDirector => "casting-director",
            Role::ExecutiveProducer => "executive-producer",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "casting-assistant" => Ok(Role::CastingAssistant),
            "casting-director" => Ok(Role::CastingDirector),
            "executive-producer" => Ok(Role::ExecutiveProducer),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

// --- Token Claims ---

/// Claims
///
/// The subset of the access-token payload this service reads. Signature, `exp`, `iss` and `aud`
/// are checked by `jsonwebtoken` during decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the identity provider's user id.
    pub sub: String,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Either a single audience string or an array of them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<serde_json::Value>,
    /// RBAC permissions granted to the caller, e.g. `["read:movies", "create:actors"]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    /// Space separated OAuth scopes. Read only when `permissions` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Claims {
    /// The recognised permissions carried by the token. Unknown entries are ignored.
    pub fn granted_permissions(&self) -> BTreeSet<Permission> {
        let raw: Vec<&str> = match (&self.permissions, &self.scope) {
            (Some(permissions), _) => permissions.iter().map(String::as_str).collect(),
            (None, Some(scope)) => scope.split_whitespace().collect(),
            (None, None) => Vec::new(),
        };
        raw.into_iter()
            .filter_map(|entry| entry.parse::<Permission>().ok())
            .collect()
    }
}

// --- Token Verification ---

enum VerificationKeys {
    /// HS256 shared secret (local development and tests).
    Shared(DecodingKey),
    /// RS256 public keys published by the identity provider, indexed by `kid`.
    KeySet(HashMap<String, DecodingKey>),
}

/// TokenVerifier
///
/// Decodes bearer tokens and checks signature, expiry, issuer and audience. Built once at
/// startup and shared read-only between requests.
pub struct TokenVerifier {
    keys: VerificationKeys,
    validation: Validation,
}

/// VerifierState
///
/// The shared handle stored in the application state.
pub type VerifierState = Arc<TokenVerifier>;

fn build_validation(
    algorithm: Algorithm,
    issuer: Option<&str>,
    audience: Option<&str>,
) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = true;
    if let Some(issuer) = issuer {
        validation.set_issuer(&[issuer]);
    }
    match audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }
    validation
}

impl TokenVerifier {
    /// Verifier for HS256 tokens signed with `secret`. Issuer and audience are checked only
    /// when given.
    pub fn shared_secret(secret: &str, issuer: Option<&str>, audience: Option<&str>) -> Self {
        Self {
            keys: VerificationKeys::Shared(DecodingKey::from_secret(secret.as_bytes())),
            validation: build_validation(Algorithm::HS256, issuer, audience),
        }
    }

    /// Verifier for RS256 tokens signed by any key of `jwks`. Keys without a `kid` cannot be
    /// selected by a token header and are skipped.
    pub fn from_jwks(
        jwks: &JwkSet,
        issuer: Option<&str>,
        audience: Option<&str>,
    ) -> Result<Self, jsonwebtoken::errors::Error> {
        let mut keys = HashMap::new();
        for jwk in &jwks.keys {
            if let Some(kid) = &jwk.common.key_id {
                keys.insert(kid.clone(), DecodingKey::from_jwk(jwk)?);
            }
        }
        Ok(Self {
            keys: VerificationKeys::KeySet(keys),
            validation: build_validation(Algorithm::RS256, issuer, audience),
        })
    }

    /// Downloads the provider's key set from `https://{domain}/.well-known/jwks.json`.
    pub async fn fetch_jwks(auth: &AuthConfig) -> Result<Self, AppError> {
        let url = auth
            .jwks_url()
            .ok_or_else(|| AppError::Internal("AUTH0_DOMAIN is not configured".to_string()))?;

        tracing::info!(%url, "fetching identity provider key set");
        let jwks = reqwest::get(&url)
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AppError::Internal(format!("JWKS request failed: {e}")))?
            .json::<JwkSet>()
            .await
            .map_err(|e| AppError::Internal(format!("JWKS body invalid: {e}")))?;

        let issuer = auth.issuer();
        Self::from_jwks(&jwks, issuer.as_deref(), auth.audience.as_deref())
            .map_err(|e| AppError::Internal(format!("JWKS key unusable: {e}")))
    }

    /// from_config
    ///
    /// Production verifies RS256 tokens against the provider's published keys. Local runs use
    /// the HS256 shared secret so tokens can be minted without a provider.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        match config.env {
            Env::Production => Self::fetch_jwks(&config.auth).await,
            Env::Local => {
                let issuer = config.auth.issuer();
                Ok(Self::shared_secret(
                    &config.auth.jwt_secret,
                    issuer.as_deref(),
                    config.auth.audience.as_deref(),
                ))
            }
        }
    }

    /// verify
    ///
    /// Returns the decoded claims or a 401 describing why the token was refused.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let key = match &self.keys {
            VerificationKeys::Shared(key) => key,
            VerificationKeys::KeySet(keys) => {
                let header = decode_header(token)
                    .map_err(|_| unauthenticated("unable to parse authentication token"))?;
                let kid = header
                    .kid
                    .ok_or_else(|| unauthenticated("authorization malformed"))?;
                keys.get(&kid)
                    .ok_or_else(|| unauthenticated("unable to find the appropriate key"))?
            }
        };

        match decode::<Claims>(token, key, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => Err(match e.kind() {
                ErrorKind::ExpiredSignature => unauthenticated("token expired"),
                ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
                    unauthenticated("incorrect claims, please check the audience and issuer")
                }
                _ => unauthenticated("unable to parse authentication token"),
            }),
        }
    }
}

fn unauthenticated(reason: &str) -> AppError {
    tracing::warn!(reason, "credential rejected");
    AppError::Unauthenticated(reason.to_string())
}

/// bearer_token
///
/// Pulls the token out of `Authorization: Bearer <token>`. The scheme is matched
/// case-insensitively; anything other than exactly two parts is rejected.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| unauthenticated("authorization header is expected"))?
        .to_str()
        .map_err(|_| unauthenticated("authorization header is malformed"))?;

    let mut parts = value.split_whitespace();
    let scheme = parts.next();
    let token = parts.next();
    match (scheme, token, parts.next()) {
        (Some(scheme), _, _) if !scheme.eq_ignore_ascii_case("bearer") => Err(unauthenticated(
            "authorization header must start with \"Bearer\"",
        )),
        (Some(_), Some(token), None) => Ok(token),
        (Some(_), None, _) => Err(unauthenticated("token not found")),
        _ => Err(unauthenticated("authorization header must be bearer token")),
    }
}

// --- Extractors ---

/// Header honoured in `Env::Local` to act as a role without a token.
pub const DEV_ROLE_HEADER: &str = "x-casting-role";

/// AuthUser
///
/// The resolved identity of an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub subject: String,
    pub permissions: BTreeSet<Permission>,
}

impl AuthUser {
    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Fails with 403 unless the caller holds `permission`.
    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.has(permission) {
            Ok(())
        } else {
            tracing::warn!(subject = %self.subject, %permission, "permission denied");
            Err(AppError::Forbidden)
        }
    }
}

/// AuthUser Extractor Implementation
///
/// 1. Local bypass: in `Env::Local`, a request without `Authorization` but with a valid
///    `x-casting-role` header gets that role's preset permissions.
/// 2. Bearer token extraction.
/// 3. Token verification (signature, expiry, issuer, audience).
/// 4. Permission claims become the caller's permission set.
///
/// Rejection: 401 with the reason in the message.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
    VerifierState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local && !parts.headers.contains_key(header::AUTHORIZATION) {
            let role = parts
                .headers
                .get(DEV_ROLE_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<Role>().ok());
            if let Some(role) = role {
                tracing::debug!(role = role.as_str(), "local role bypass");
                return Ok(AuthUser {
                    subject: format!("local|{}", role.as_str()),
                    permissions: role.permissions(),
                });
            }
        }

        let token = bearer_token(&parts.headers)?;
        let verifier = VerifierState::from_ref(state);
        let claims = verifier.verify(token)?;

        Ok(AuthUser {
            permissions: claims.granted_permissions(),
            subject: claims.sub,
        })
    }
}

/// Guard
///
/// Type-level marker naming the permission an endpoint declares.
pub trait Guard {
    const PERMISSION: Permission;
}

/// Marker types for `Authorized<G>`, one per permission.
pub mod guard {
    use super::{Guard, Permission};

    macro_rules! permission_guards {
        ($($name:ident),* $(,)?) => {
            $(
                pub struct $name;

                impl Guard for $name {
                    const PERMISSION: Permission = Permission::$name;
                }
            )*
        };
    }

    permission_guards!(
        ReadMovies,
        CreateMovies,
        UpdateMovies,
        DeleteMovies,
        ReadActors,
        CreateActors,
        UpdateActors,
        DeleteActors,
    );
}

/// Authorized
///
/// An `AuthUser` proven to hold `G::PERMISSION`. Being a parts extractor, it runs before the
/// path and body extractors, so a 401 or 403 is returned before the payload is even read.
pub struct Authorized<G> {
    pub user: AuthUser,
    _guard: PhantomData<fn() -> G>,
}

impl<S, G> FromRequestParts<S> for Authorized<G>
where
    S: Send + Sync,
    G: Guard,
    AppConfig: FromRef<S>,
    VerifierState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        user.require(G::PERMISSION)?;
        Ok(Authorized {
            user,
            _guard: PhantomData,
        })
    }
}
