use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    login_url::LoginUrlBuilder,
    utils::{set_url_query, url_query},
    CasConfig, CasError, HttpRequest, HttpResponse, LoginResponse, LoginTicket, PgtStore,
    ProxyGrantingTicket, ProxyResponse, ProxyTicket, ServiceTicket, Transport, TransportError,
    ValidatedTicket, ValidationResponse,
};

/// RubyCAS-Server answers 422 to requests that are processable but carry
/// invalid CAS data, e.g. an unknown service ticket.
const UNPROCESSABLE_ENTITY: u16 = 422;

/// Brokers every HTTP exchange with the CAS server.
pub struct CasClient<T> {
    config: CasConfig,
    transport: T,
}

#[cfg(feature = "http")]
impl CasClient<crate::HttpTransport> {
    /// A client talking to the server over HTTP(S) as described by `config`.
    pub fn from_config(config: CasConfig) -> Result<Self, CasError> {
        config.validate()?;
        let transport = crate::HttpTransport::new(&config)?;
        Ok(CasClient::new(config, transport))
    }
}

impl<T: Transport> CasClient<T> {
    pub fn new(config: CasConfig, transport: T) -> Self {
        CasClient { config, transport }
    }

    pub fn config(&self) -> &CasConfig {
        &self.config
    }

    /// The CAS server's logout URL.
    ///
    /// With a `destination_url` (stripped of any `ticket` parameter) the server
    /// is asked to send the user there, in gateway mode. Otherwise a
    /// `follow_url` is passed as `url`, and `service` is set from
    /// `service_url` or the configured default.
    pub fn logout_url(
        &self,
        destination_url: Option<&str>,
        follow_url: Option<&str>,
        service_url: Option<&str>,
    ) -> Result<String, CasError> {
        let mut url = Url::parse(&self.config.logout_endpoint())?;
        let mut params = url_query(&url);
        let service_url = service_url.or(self.config.service_url.as_deref());

        if let Some(destination_url) = destination_url {
            let mut destination = Url::parse(destination_url)?;
            let mut destination_params = url_query(&destination);
            destination_params.remove("ticket");
            set_url_query(&mut destination, &destination_params);

            params.insert(
                self.config.cas_destination_logout_param_name.clone(),
                vec![destination.into()],
            );
            params.insert("gateway".into(), vec!["true".into()]);
        } else {
            if let Some(follow_url) = follow_url {
                params.insert("url".into(), vec![follow_url.into()]);
            }
            if let Some(service_url) = service_url {
                params.insert("service".into(), vec![service_url.into()]);
            }
        }

        set_url_query(&mut url, &params);
        Ok(url.into())
    }

    pub fn add_service_to_login_url(&self, service_url: &str) -> Result<String, CasError> {
        LoginUrlBuilder::new()
            .login_url(&self.config.login_endpoint())
            .service(service_url)
            .build()
    }

    /// The proxy-validate URI for `ticket`.
    pub fn validation_url(&self, ticket: &ServiceTicket) -> Result<String, CasError> {
        let mut url = Url::parse(&self.config.proxy_validate_endpoint())?;
        let mut params = url_query(&url);
        params.insert("service".into(), vec![ticket.service.clone()]);
        params.insert("ticket".into(), vec![ticket.ticket.clone()]);
        if ticket.renew {
            params.insert("renew".into(), vec!["1".into()]);
        }
        if let Some(callback) = &self.config.proxy_callback_url {
            params.insert("pgtUrl".into(), vec![callback.clone()]);
        }
        set_url_query(&mut url, &params);
        Ok(url.into())
    }

    pub fn proxy_ticket_url(
        &self,
        pgt: &ProxyGrantingTicket,
        target_service: &str,
    ) -> Result<String, CasError> {
        let mut url = Url::parse(&self.config.proxy_endpoint())?;
        let mut params = url_query(&url);
        params.insert("pgt".into(), vec![pgt.ticket.clone()]);
        params.insert("targetService".into(), vec![target_service.into()]);
        set_url_query(&mut url, &params);
        Ok(url.into())
    }

    pub fn validate_service_ticket(
        &self,
        ticket: ServiceTicket,
    ) -> Result<ValidatedTicket, CasError> {
        let url = self.validation_url(&ticket)?;
        let body = self.request_cas_response(&url)?;
        let response = ValidationResponse::parse(&body, self.config.encode_extra_attributes_as)?;
        Ok(ticket.validated(response))
    }

    /// Proxy tickets are validated exactly like service tickets, at the
    /// proxy-validate endpoint.
    pub fn validate_proxy_ticket(&self, ticket: ServiceTicket) -> Result<ValidatedTicket, CasError> {
        self.validate_service_ticket(ticket)
    }

    /// Requests a proxy ticket for `target_service` using `pgt`.
    pub fn request_proxy_ticket(
        &self,
        pgt: &ProxyGrantingTicket,
        target_service: &str,
    ) -> Result<ProxyTicket, CasError> {
        let url = self.proxy_ticket_url(pgt, target_service)?;
        let body = self.request_cas_response(&url)?;
        let response = ProxyResponse::parse(&body)?;
        Ok(ProxyTicket::from_response(target_service, response))
    }

    pub fn retrieve_proxy_granting_ticket(
        &self,
        store: &impl PgtStore,
        pgt_iou: &str,
    ) -> Result<ProxyGrantingTicket, CasError> {
        store
            .lookup(pgt_iou)
            .map(|pgt| ProxyGrantingTicket::new(&pgt, pgt_iou))
            .ok_or_else(|| CasError::TicketNotFound {
                pgt_iou: pgt_iou.into(),
            })
    }

    /// Whether the login page answers with a 2xx status. A refused connection
    /// means the server is down and is not an error.
    pub fn cas_server_is_up(&self) -> Result<bool, CasError> {
        let url = self.config.login_endpoint();
        debug!(%url, "checking if CAS server is up");

        match self.transport.send(HttpRequest::get(&url)) {
            Ok(response) => {
                debug!(status = response.status, body = %response.body, "CAS server responded");
                Ok(response.is_success())
            }
            Err(TransportError::ConnectionRefused(reason)) => {
                warn!(%url, %reason, "CAS server did not respond");
                Ok(false)
            }
            Err(TransportError::Other(reason)) => Err(CasError::Transport(reason)),
        }
    }

    /// Obtains a login ticket to accompany a credential submission.
    ///
    /// Only RubyCAS-Server hands out login tickets this way.
    pub fn request_login_ticket(&self) -> Result<LoginTicket, CasError> {
        let url = self.config.login_ticket_endpoint();
        let response = self.send(HttpRequest::post(&url, ";"))?;
        if !response.is_success() {
            return Err(CasError::LoginTicketRequest {
                status: response.status,
                body: response.body,
            });
        }
        Ok(LoginTicket::new(response.body.trim()))
    }

    /// Submits `credentials` for `service` and interprets the server's redirect.
    pub fn login_to_service(
        &self,
        credentials: &[(&str, &str)],
        service: &str,
    ) -> Result<LoginResponse, CasError> {
        let lt = self.request_login_ticket()?;
        let fields = credentials
            .iter()
            .copied()
            .chain([("lt", lt.as_str()), ("service", service)]);

        let request = HttpRequest::form(&self.config.login_endpoint(), fields);
        let response = LoginResponse::parse(&self.send(request)?);
        if response.is_success() {
            info!(ticket = ?response.ticket, "login was successful");
        }
        Ok(response)
    }

    /// GETs `url` and returns the body of a 2xx or 422 answer.
    fn request_cas_response(&self, url: &str) -> Result<String, CasError> {
        debug!(%url, "requesting CAS response");
        let response = self.send(HttpRequest::get(url))?;

        if response.is_success() || response.status == UNPROCESSABLE_ENTITY {
            debug!(status = response.status, body = %response.body, "CAS server responded");
            Ok(response.body)
        } else {
            error!(%url, status = response.status, "CAS server responded with an error");
            Err(CasError::UnexpectedStatus {
                url: url.into(),
                status: response.status,
                body: response.body,
            })
        }
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, CasError> {
        let url = request.url.clone();
        self.transport.send(request).map_err(|err| match err {
            TransportError::ConnectionRefused(reason) => {
                error!(%url, %reason, "CAS server did not respond");
                CasError::ServerUnreachable { url }
            }
            TransportError::Other(reason) => CasError::Transport(reason),
        })
    }
}
