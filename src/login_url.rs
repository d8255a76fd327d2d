use url::Url;

use crate::CasError;

/// Builds the URL a browser is redirected to in order to log in at the CAS server.
#[derive(Debug, Default, Clone)]
pub struct LoginUrlBuilder {
    login_url: Option<String>,
    service: Option<String>,
    renew: bool,
    gateway: bool,
}

impl LoginUrlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login_url(self, login_url: &str) -> Self {
        LoginUrlBuilder {
            login_url: Some(login_url.into()),
            ..self
        }
    }

    pub fn service(self, service: &str) -> Self {
        LoginUrlBuilder {
            service: Some(service.into()),
            ..self
        }
    }

    /// Force the user to present credentials even with a live single sign-on session.
    pub fn renew(self, renew: bool) -> Self {
        LoginUrlBuilder { renew, ..self }
    }

    /// Never prompt; redirect back to the service with or without a ticket.
    pub fn gateway(self, gateway: bool) -> Self {
        LoginUrlBuilder { gateway, ..self }
    }

    pub fn build(self) -> Result<String, CasError> {
        let login_url = self
            .login_url
            .ok_or_else(|| CasError::Config("login_url is required".into()))?;
        let mut url = Url::parse(&login_url)?;

        let mut pairs = Vec::new();
        if let Some(service) = &self.service {
            pairs.push(("service", service.as_str()));
        }
        if self.renew {
            pairs.push(("renew", "true"));
        }
        if self.gateway {
            pairs.push(("gateway", "true"));
        }
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        Ok(url.into())
    }
}
