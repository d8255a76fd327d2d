use std::fmt;

use time::OffsetDateTime;

use crate::{
    tickets::ServiceFailure,
    xml_response::{parse_service_response, service_failure},
    CasError,
};

const SUCCESS: &str = "proxySuccess";
const FAILURE: &str = "proxyFailure";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyOutcome {
    Success { proxy_ticket: Option<String> },
    Failure(ServiceFailure),
}

/// The CAS server's answer to a proxy ticket request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub outcome: ProxyOutcome,
    pub parsed_at: OffsetDateTime,
    rendered: String,
}

impl ProxyResponse {
    pub fn parse(raw: &str) -> Result<Self, CasError> {
        if raw.is_empty() {
            return Err(CasError::bad_response("CAS response is empty", raw));
        }
        let parsed_at = OffsetDateTime::now_utc();

        let response = parse_service_response(raw)?;
        let outcome = match response.name().as_str() {
            SUCCESS => ProxyOutcome::Success {
                proxy_ticket: response.select_text("cas:proxyTicket"),
            },
            FAILURE => ProxyOutcome::Failure(service_failure(response.element())),
            other => {
                return Err(CasError::bad_response(
                    &format!("unexpected {other} element in proxy response"),
                    raw,
                ))
            }
        };

        Ok(ProxyResponse {
            outcome,
            parsed_at,
            rendered: response.to_string(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ProxyOutcome::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    pub fn proxy_ticket(&self) -> Option<&str> {
        match &self.outcome {
            ProxyOutcome::Success { proxy_ticket } => proxy_ticket.as_deref(),
            ProxyOutcome::Failure(_) => None,
        }
    }

    pub fn failure_code(&self) -> Option<&str> {
        match &self.outcome {
            ProxyOutcome::Failure(failure) => failure.code.as_deref(),
            ProxyOutcome::Success { .. } => None,
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        match &self.outcome {
            ProxyOutcome::Failure(failure) => Some(&failure.message),
            ProxyOutcome::Success { .. } => None,
        }
    }
}

impl fmt::Display for ProxyResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.rendered)
    }
}
