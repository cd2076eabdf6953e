use std::future::Future;
use std::sync::Arc;

use crate::{
    crypto::account_key::AccountKey,
    error::{AcmeError, AcmeResult},
    wire::{
        account::{AccountResource, AccountStatus},
        authorization::AuthorizationStatus,
        client::AcmeClient,
        common::LocationResource,
        identifier::AcmeIdentifier,
        order::{NewOrderResource, OrderStatus},
    },
};

use super::{
    account_context::AccountContext,
    authorization::Authorization,
    challenge::ChallengeState,
    order::{Order, OrderState},
    solver::Solver,
};

/// A polling loop (authorization validation, order finalization) gives up
/// after this many attempts without reaching a terminal status, per the
/// "total cap" the state machine's polling schedule calls for.
const MAX_POLL_ATTEMPTS: usize = 10;

pub struct Account {
    context: Arc<AccountContext>,
    resource: AccountResource,
}

impl Account {
    pub(crate) fn from_resource(
        client: AcmeClient,
        account_key: impl AccountKey + 'static,
        mut resource: AccountResource,
    ) -> AcmeResult<Self> {
        let context = AccountContext {
            client,
            account_key: Box::new(account_key),
            account_url: resource.take_location()?,
        };
        Ok(Self {
            context: Arc::new(context),
            resource,
        })
    }

    pub fn client(&self) -> &AcmeClient {
        &self.context.client
    }

    pub fn key(&self) -> &impl AccountKey {
        &self.context.account_key
    }

    pub fn resource(&self) -> &AccountResource {
        &self.resource
    }

    pub fn url(&self) -> &str {
        &self.context.account_url
    }

    pub fn status(&self) -> AccountStatus {
        self.resource.status
    }

    pub async fn new_order(&self, new_order: &NewOrderResource) -> AcmeResult<Order> {
        let order = context_client_request!(self.context, new_order, new_order).await?;
        Order::from_resource(self.context.clone(), order)
    }

    pub async fn new_dns_order(&self, dns_name: impl Into<String>) -> AcmeResult<Order> {
        let new_order = &NewOrderResource {
            identifiers: vec![AcmeIdentifier::dns(dns_name)],
            ..Default::default()
        };
        self.new_order(new_order).await
    }

    pub async fn get_order(&self, order_url: impl AsRef<str>) -> AcmeResult<Order> {
        let order = context_client_request!(self.context, get_resource, order_url.as_ref()).await?;
        Order::from_resource(self.context.clone(), order)
    }

    /// Drives one certificate issuance to completion: submits an order for
    /// the DNS names the CSR asserts, solves every authorization with
    /// `solver`, finalizes, and returns the issued chain as PEM-encoded
    /// certificates, leaf first.
    pub async fn sign_certificate<AsyncSleep, SleepFuture>(
        &self,
        solver: &dyn Solver,
        mut sleep: AsyncSleep,
        csr_der: &[u8],
    ) -> AcmeResult<Vec<String>>
    where
        AsyncSleep: FnMut() -> SleepFuture + Send,
        SleepFuture: Future<Output = ()> + Send,
    {
        let identifiers = crate::x509::identifiers_from_csr(csr_der)?;
        tracing::info!(identifiers = ?identifiers, "submitting order");
        let new_order = NewOrderResource {
            identifiers: identifiers.into_iter().map(AcmeIdentifier::dns).collect(),
            ..Default::default()
        };
        let mut order = self.new_order(&new_order).await?;

        for authorization_url in order.resource().authorizations.clone() {
            self.solve_authorization(&authorization_url, solver, &mut sleep)
                .await?;
        }

        let mut attempts = 0;
        while order.status() != OrderStatus::Ready {
            order.status_result()?;
            attempts += 1;
            if attempts > MAX_POLL_ATTEMPTS {
                return Err(AcmeError::PollingExhausted);
            }
            sleep().await;
            order.refresh().await?;
        }

        tracing::info!("finalizing order");
        match order.state_result()? {
            OrderState::Ready(mut ready) => {
                ready.finalize(csr_der).await?;
            }
            _ => unreachable!("loop above only exits once status is Ready"),
        }

        let mut attempts = 0;
        while order.status() != OrderStatus::Valid {
            order.status_result()?;
            attempts += 1;
            if attempts > MAX_POLL_ATTEMPTS {
                return Err(AcmeError::PollingExhausted);
            }
            sleep().await;
            order.refresh().await?;
        }

        let chain_pem = match order.state_result()? {
            OrderState::Valid(valid) => valid.get_certificate_chain().await?,
            _ => unreachable!("loop above only exits once status is Valid"),
        };

        Ok(split_pem_chain(&chain_pem))
    }

    async fn solve_authorization<AsyncSleep, SleepFuture>(
        &self,
        authorization_url: &str,
        solver: &dyn Solver,
        sleep: &mut AsyncSleep,
    ) -> AcmeResult<()>
    where
        AsyncSleep: FnMut() -> SleepFuture + Send,
        SleepFuture: Future<Output = ()> + Send,
    {
        let mut authorization = Authorization::get(self.context.clone(), authorization_url).await?;
        if authorization.status() == AuthorizationStatus::Valid {
            return Ok(());
        }

        let mut challenge = authorization
            .find_challenge_type(solver.challenge_type())
            .ok_or(AcmeError::NoSupportedChallenge)?;

        let domain = authorization
            .dns_identifier()
            .ok_or_else(|| AcmeError::InvalidState("authorization is not a DNS identifier".to_string()))?
            .without_wildcard()
            .to_string();
        let token = challenge
            .token()
            .ok_or(AcmeError::MissingExpectedField("token"))?
            .to_string();
        let thumbprint = self.key().thumbprint().map_err(AcmeError::CryptoError)?;
        let key_authorization = format!("{token}.{thumbprint}");

        tracing::info!(domain = %domain, challenge_type = solver.challenge_type(), "provisioning challenge");
        solver
            .provision(&domain, &token, &key_authorization)
            .await?;

        if let ChallengeState::Pending(mut pending) = challenge.state_result()? {
            pending.respond().await?;
        }

        let mut attempts = 0;
        loop {
            match authorization.status() {
                AuthorizationStatus::Valid => break,
                AuthorizationStatus::Pending => {
                    attempts += 1;
                    if attempts > MAX_POLL_ATTEMPTS {
                        solver.cleanup(&domain, &token).await.ok();
                        return Err(AcmeError::PollingExhausted);
                    }
                    sleep().await;
                    authorization = Authorization::get(self.context.clone(), authorization_url).await?;
                }
                AuthorizationStatus::Invalid => {
                    let challenge_error = authorization
                        .find_challenge_type(solver.challenge_type())
                        .and_then(|c| c.resource().error.clone());
                    solver.cleanup(&domain, &token).await.ok();
                    return match challenge_error {
                        Some(problem) => Err(AcmeError::AcmeProblem(problem)),
                        None => Err(AcmeError::InvalidState("authorization failed".to_string())),
                    };
                }
                other => {
                    solver.cleanup(&domain, &token).await.ok();
                    return Err(AcmeError::InvalidState(format!(
                        "authorization reached unexpected status {other:?}"
                    )));
                }
            }
        }

        if let Err(err) = solver.cleanup(&domain, &token).await {
            tracing::warn!(%err, "challenge cleanup failed");
        }

        Ok(())
    }
}

/// Splits a concatenated `application/pem-certificate-chain` body into its
/// individual PEM blocks, preserving order (leaf first).
fn split_pem_chain(pem: &str) -> Vec<String> {
    let mut certs = Vec::new();
    let mut current = String::new();
    for line in pem.lines() {
        current.push_str(line);
        current.push('\n');
        if line.trim() == "-----END CERTIFICATE-----" {
            certs.push(std::mem::take(&mut current));
        }
    }
    certs
}

pub enum Contact {
    Email(String),
    Uri(String),
}

impl Contact {
    pub(crate) fn uri(self) -> String {
        match self {
            Self::Email(email) if !email.starts_with("mailto:") => format!("mailto:{}", email),
            Self::Email(email) => email,
            Self::Uri(uri) => uri,
        }
    }
}
