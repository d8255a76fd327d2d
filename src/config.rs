use std::{collections::BTreeMap, fs, path::Path};

use serde::Deserialize;
use tracing::{debug, error};

use crate::{AttributeEncoding, CasError};

fn default_logout_param_name() -> String {
    "destination".into()
}

/// Client configuration. Every endpoint defaults to a path below `cas_base_url`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CasConfig {
    #[serde(default)]
    pub cas_base_url: String,
    pub login_url: Option<String>,
    pub logout_url: Option<String>,
    /// Accepted so existing configuration files keep loading. The client
    /// validates every ticket at [`CasConfig::proxy_validate_endpoint`].
    pub validate_url: Option<String>,
    pub proxy_validate_url: Option<String>,
    pub proxy_url: Option<String>,
    pub login_ticket_url: Option<String>,
    /// Sent as `pgtUrl` so the server delivers proxy-granting tickets.
    pub proxy_callback_url: Option<String>,
    /// Default `service` for logout URLs.
    pub service_url: Option<String>,
    pub proxy_host: Option<String>,
    pub proxy_port: Option<u16>,
    #[serde(default)]
    pub force_ssl_verification: bool,
    #[serde(default)]
    pub encode_extra_attributes_as: AttributeEncoding,
    #[serde(default = "default_logout_param_name")]
    pub cas_destination_logout_param_name: String,
}

impl CasConfig {
    pub fn new(cas_base_url: &str) -> Self {
        CasConfig {
            cas_base_url: cas_base_url.into(),
            login_url: None,
            logout_url: None,
            validate_url: None,
            proxy_validate_url: None,
            proxy_url: None,
            login_ticket_url: None,
            proxy_callback_url: None,
            service_url: None,
            proxy_host: None,
            proxy_port: None,
            force_ssl_verification: false,
            encode_extra_attributes_as: AttributeEncoding::default(),
            cas_destination_logout_param_name: default_logout_param_name(),
        }
    }

    pub fn validate(&self) -> Result<(), CasError> {
        if self.cas_base_url.trim().is_empty() {
            return Err(CasError::Config("cas_base_url is required".into()));
        }
        Ok(())
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, CasError> {
        let config: CasConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the `[environment]` table of a file holding one table per environment.
    pub fn from_toml_str_for_environment(
        contents: &str,
        environment: &str,
    ) -> Result<Self, CasError> {
        let mut environments: BTreeMap<String, toml::Value> = toml::from_str(contents)?;
        let table = environments.remove(environment).ok_or_else(|| {
            CasError::Config(format!("no configuration for environment {environment:?}"))
        })?;
        let config: CasConfig = table.try_into()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CasError> {
        debug!(path = %path.as_ref().display(), "loading CAS configuration");
        let contents = fs::read_to_string(&path)?;
        Self::from_toml_str(&contents).inspect_err(|err| error!(?err))
    }

    pub fn from_file_for_environment<P: AsRef<Path>>(
        path: P,
        environment: &str,
    ) -> Result<Self, CasError> {
        debug!(path = %path.as_ref().display(), environment, "loading CAS configuration");
        let contents = fs::read_to_string(&path)?;
        Self::from_toml_str_for_environment(&contents, environment).inspect_err(|err| error!(?err))
    }

    fn base_url(&self, path: &str) -> String {
        format!("{}/{path}", self.cas_base_url.trim_end_matches('/'))
    }

    pub fn login_endpoint(&self) -> String {
        self.login_url
            .clone()
            .unwrap_or_else(|| self.base_url("login"))
    }

    pub fn logout_endpoint(&self) -> String {
        self.logout_url
            .clone()
            .unwrap_or_else(|| self.base_url("logout"))
    }

    /// The plain `/serviceValidate` endpoint. Never contacted by the client;
    /// it cannot issue proxy-granting tickets or accept proxy tickets.
    pub fn validate_endpoint(&self) -> String {
        self.validate_url
            .clone()
            .unwrap_or_else(|| self.base_url("serviceValidate"))
    }

    pub fn proxy_validate_endpoint(&self) -> String {
        self.proxy_validate_url
            .clone()
            .unwrap_or_else(|| self.base_url("proxyValidate"))
    }

    pub fn proxy_endpoint(&self) -> String {
        self.proxy_url
            .clone()
            .unwrap_or_else(|| self.base_url("proxy"))
    }

    pub fn login_ticket_endpoint(&self) -> String {
        self.login_ticket_url
            .clone()
            .unwrap_or_else(|| self.base_url("loginTicket"))
    }
}
