//! Auth session: the user profile query and the account mutations.
//!
//! Mutations never go through the cache. Their effects on it are explicit:
//! login and register invalidate the profile, logout writes an empty profile.

use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::client::{keys, Query};
use crate::gateway::{
    AuthEffect, AuthGateway, GatewayError, GatewayResult, LoginPayload, LoginResponse,
    RegisterPayload, UserProfile,
};
use crate::query::{Backoff, KeyPattern, Orchestrator, QueryCategory};

/// Retries after the first failed mutation attempt
pub const MUTATION_RETRY: u32 = 1;

const LOGIN_FAILED: &str = "Falha no login";
const REGISTER_FAILED: &str = "Falha no registo";
const AUTH_FAILED: &str = "Falha na autenticação";
const UNKNOWN_ERROR: &str = "Ocorreu um erro desconhecido.";
const CONNECTION_ERROR: &str = "Não foi possível conectar ao servidor. Tente novamente.";
const GOOGLE_ERROR: &str =
    "Não foi possível iniciar o login com Google. Verifique sua conexão e tente novamente.";
const LOGOUT_ERROR: &str =
    "Não foi possível realizar o logout. Verifique sua conexão e tente novamente.";

// ============================================================================
// Notices
// ============================================================================

/// User-facing message produced by a failed mutation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{title}: {description}")]
pub struct AuthFailure {
    pub title: String,
    pub description: String,
    #[source]
    pub cause: Option<GatewayError>,
}

impl AuthFailure {
    /// Account errors: backend `detail` when the server answered, a generic
    /// connectivity message otherwise.
    fn account(title: &str, err: GatewayError) -> Self {
        let description = if err.has_response() {
            err.detail().unwrap_or(UNKNOWN_ERROR).to_string()
        } else {
            CONNECTION_ERROR.to_string()
        };
        Self {
            title: title.to_string(),
            description,
            cause: Some(err),
        }
    }

    fn session(description: &str, err: GatewayError) -> Self {
        Self {
            title: AUTH_FAILED.to_string(),
            description: description.to_string(),
            cause: Some(err),
        }
    }
}

/// User-facing message produced by a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthNotice {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub response: LoginResponse,
    pub notice: AuthNotice,
}

#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    pub profile: UserProfile,
    pub notice: AuthNotice,
}

// ============================================================================
// Auth Session
// ============================================================================

/// Profile query and account mutations over one orchestrator.
#[derive(Clone)]
pub struct AuthSession {
    orchestrator: Orchestrator,
    gateway: Arc<dyn AuthGateway>,
}

impl AuthSession {
    pub fn new(orchestrator: Orchestrator, gateway: Arc<dyn AuthGateway>) -> Self {
        Self {
            orchestrator,
            gateway,
        }
    }

    /// Current user; `None` when signed out.
    ///
    /// A 401 from the profile endpoint means no session and reads as `None`.
    pub fn profile(&self) -> Query<Option<UserProfile>> {
        let gateway = Arc::clone(&self.gateway);
        let policy = self.orchestrator.policies().get(QueryCategory::UserProfile);
        Query::new(self.orchestrator.clone(), keys::user_profile(), policy, move || {
            let gateway = Arc::clone(&gateway);
            async move {
                match gateway.profile().await {
                    Ok(profile) => Ok(Some(profile)),
                    Err(GatewayError::Http { status: 401, .. }) => Ok(None),
                    Err(err) => Err(err),
                }
            }
        })
    }

    pub async fn login(&self, payload: &LoginPayload) -> Result<LoginOutcome, AuthFailure> {
        let gateway = Arc::clone(&self.gateway);
        let response = self
            .mutate("login", || gateway.login(payload))
            .await
            .map_err(|e| AuthFailure::account(LOGIN_FAILED, e))?;

        self.orchestrator
            .invalidate(&KeyPattern::from_key(&keys::user_profile()));
        info!(email = %payload.email, "Login succeeded");

        let description = match response.first_name() {
            Some(name) => format!("Bem-vindo de volta, {}!", name),
            None => "Bem-vindo de volta!".to_string(),
        };
        Ok(LoginOutcome {
            response,
            notice: AuthNotice {
                title: "Login realizado com sucesso!".into(),
                description,
            },
        })
    }

    pub async fn register(&self, payload: &RegisterPayload) -> Result<RegisterOutcome, AuthFailure> {
        let gateway = Arc::clone(&self.gateway);
        let profile = self
            .mutate("register", || gateway.register(payload))
            .await
            .map_err(|e| AuthFailure::account(REGISTER_FAILED, e))?;

        self.orchestrator
            .invalidate(&KeyPattern::from_key(&keys::user_profile()));
        info!(email = %payload.email, "Account registered");

        let name = profile
            .nome_completo
            .clone()
            .unwrap_or_else(|| payload.nome_completo.clone());
        Ok(RegisterOutcome {
            profile,
            notice: AuthNotice {
                title: "Conta criada com sucesso!".into(),
                description: format!("Bem-vindo, {}!", name),
            },
        })
    }

    /// End the session and mark the cached profile as signed out.
    pub async fn logout(&self) -> Result<(), AuthFailure> {
        let gateway = Arc::clone(&self.gateway);
        self.mutate("logout", || gateway.logout())
            .await
            .map_err(|e| AuthFailure::session(LOGOUT_ERROR, e))?;

        self.orchestrator
            .set_data::<Option<UserProfile>>(keys::user_profile(), None);
        info!("Logged out");
        Ok(())
    }

    /// Ask for the Google consent URL. The caller performs the redirect.
    pub async fn google_auth(&self) -> Result<AuthEffect, AuthFailure> {
        let gateway = Arc::clone(&self.gateway);
        self.mutate("google_auth", || gateway.google_auth_url())
            .await
            .map_err(|e| AuthFailure::session(GOOGLE_ERROR, e))
    }

    /// Run a mutation with the shared backoff and one retry.
    async fn mutate<T, F, Fut>(&self, name: &str, op: F) -> GatewayResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        run_with_retry(name, MUTATION_RETRY, self.orchestrator.policies().backoff(), op).await
    }
}

async fn run_with_retry<T, F, Fut>(
    name: &str,
    max_retries: u32,
    backoff: Backoff,
    op: F,
) -> GatewayResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = GatewayResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_retries => {
                let delay = backoff.delay(attempt);
                warn!(
                    mutation = name,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Mutation failed, retrying..."
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                warn!(mutation = name, error = %err, "Mutation failed");
                return Err(err);
            }
        }
    }
}
