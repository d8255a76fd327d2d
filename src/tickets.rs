use std::fmt::Display;

use crate::{
    proxy_response::{ProxyOutcome, ProxyResponse},
    validation_response::{ValidationOutcome, ValidationResponse},
    ExtraAttributes,
};

/// Common view over the four ticket kinds.
pub trait Ticket {
    fn ticket(&self) -> &str;

    fn service(&self) -> Option<&str> {
        None
    }

    fn renew(&self) -> bool {
        false
    }

    /// `None` for tickets that are never validated themselves.
    fn outcome(&self) -> Option<&TicketOutcome> {
        None
    }
}

/// Failure details reported by the CAS server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFailure {
    pub code: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketOutcome {
    Success,
    Failure(ServiceFailure),
}

impl TicketOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TicketOutcome::Success)
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    pub fn failure_code(&self) -> Option<&str> {
        match self {
            TicketOutcome::Failure(failure) => failure.code.as_deref(),
            TicketOutcome::Success => None,
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        match self {
            TicketOutcome::Failure(failure) => Some(&failure.message),
            TicketOutcome::Success => None,
        }
    }
}

/// Single-use token handed out before credentials are submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginTicket(String);

impl LoginTicket {
    pub fn new(ticket: &str) -> Self {
        LoginTicket(ticket.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LoginTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Ticket for LoginTicket {
    fn ticket(&self) -> &str {
        &self.0
    }
}

/// A service (or proxy) ticket waiting to be validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTicket {
    pub ticket: String,
    pub service: String,
    pub renew: bool,
}

impl ServiceTicket {
    pub fn new(ticket: &str, service: &str) -> Self {
        ServiceTicket {
            ticket: ticket.into(),
            service: service.into(),
            renew: false,
        }
    }

    pub fn with_renew(self, renew: bool) -> Self {
        ServiceTicket { renew, ..self }
    }

    /// Combines this ticket with the server's answer to its validation request.
    pub fn validated(self, response: ValidationResponse) -> ValidatedTicket {
        match response.outcome {
            ValidationOutcome::Success {
                user,
                pgt_iou,
                proxies,
                extra_attributes,
            } => ValidatedTicket {
                ticket: self,
                user: Some(user),
                pgt_iou,
                proxies,
                extra_attributes,
                outcome: TicketOutcome::Success,
            },
            ValidationOutcome::Failure(failure) => ValidatedTicket {
                ticket: self,
                user: None,
                pgt_iou: None,
                proxies: Vec::new(),
                extra_attributes: ExtraAttributes::new(),
                outcome: TicketOutcome::Failure(failure),
            },
        }
    }
}

impl Ticket for ServiceTicket {
    fn ticket(&self) -> &str {
        &self.ticket
    }

    fn service(&self) -> Option<&str> {
        Some(&self.service)
    }

    fn renew(&self) -> bool {
        self.renew
    }
}

/// A service or proxy ticket after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTicket {
    pub ticket: ServiceTicket,
    pub user: Option<String>,
    pub pgt_iou: Option<String>,
    pub proxies: Vec<String>,
    pub extra_attributes: ExtraAttributes,
    pub outcome: TicketOutcome,
}

impl ValidatedTicket {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn is_failure(&self) -> bool {
        self.outcome.is_failure()
    }
}

impl Ticket for ValidatedTicket {
    fn ticket(&self) -> &str {
        &self.ticket.ticket
    }

    fn service(&self) -> Option<&str> {
        Some(&self.ticket.service)
    }

    fn renew(&self) -> bool {
        self.ticket.renew
    }

    fn outcome(&self) -> Option<&TicketOutcome> {
        Some(&self.outcome)
    }
}

/// A proxy-granting ticket and the IOU it was stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyGrantingTicket {
    pub ticket: String,
    pub iou: String,
}

impl ProxyGrantingTicket {
    pub fn new(ticket: &str, iou: &str) -> Self {
        ProxyGrantingTicket {
            ticket: ticket.into(),
            iou: iou.into(),
        }
    }
}

impl Ticket for ProxyGrantingTicket {
    fn ticket(&self) -> &str {
        &self.ticket
    }
}

/// A proxy ticket issued (or refused) for `target_service`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTicket {
    pub ticket: Option<String>,
    pub target_service: String,
    pub outcome: TicketOutcome,
}

impl ProxyTicket {
    pub fn from_response(target_service: &str, response: ProxyResponse) -> Self {
        let (ticket, outcome) = match response.outcome {
            ProxyOutcome::Success { proxy_ticket } => (proxy_ticket, TicketOutcome::Success),
            ProxyOutcome::Failure(failure) => (None, TicketOutcome::Failure(failure)),
        };
        ProxyTicket {
            ticket,
            target_service: target_service.into(),
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn is_failure(&self) -> bool {
        self.outcome.is_failure()
    }

    /// The ticket as presented to the target service for validation.
    pub fn to_service_ticket(&self) -> Option<ServiceTicket> {
        self.ticket
            .as_deref()
            .map(|ticket| ServiceTicket::new(ticket, &self.target_service))
    }
}

impl Ticket for ProxyTicket {
    fn ticket(&self) -> &str {
        self.ticket.as_deref().unwrap_or_default()
    }

    fn service(&self) -> Option<&str> {
        Some(&self.target_service)
    }

    fn outcome(&self) -> Option<&TicketOutcome> {
        Some(&self.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCESS: &str = r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
  <cas:authenticationSuccess>
    <cas:user>jsmith</cas:user>
    <cas:proxyGrantingTicket>PGTIOU-84678-8a9d</cas:proxyGrantingTicket>
  </cas:authenticationSuccess>
</cas:serviceResponse>"#;

    const FAILURE: &str = r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
  <cas:authenticationFailure code="INVALID_TICKET">
    Ticket ST-1856339-aA5Yuvrxzpv8Tau1cYQ7 not recognized
  </cas:authenticationFailure>
</cas:serviceResponse>"#;

    #[test]
    fn validated_success_carries_principal() {
        let response =
            ValidationResponse::parse(SUCCESS, crate::AttributeEncoding::default()).unwrap();
        let ticket = ServiceTicket::new("ST-1", "https://app.local")
            .with_renew(true)
            .validated(response);

        assert!(ticket.is_success());
        assert_eq!(ticket.user.as_deref(), Some("jsmith"));
        assert_eq!(ticket.pgt_iou.as_deref(), Some("PGTIOU-84678-8a9d"));
        assert!(ticket.renew());
        assert_eq!(ticket.outcome().and_then(|o| o.failure_code()), None);
    }

    #[test]
    fn validated_failure_carries_code_and_message() {
        let response =
            ValidationResponse::parse(FAILURE, crate::AttributeEncoding::default()).unwrap();
        let ticket = ServiceTicket::new("ST-1", "https://app.local").validated(response);

        assert!(ticket.is_failure());
        assert_eq!(ticket.user, None);
        assert_eq!(ticket.outcome.failure_code(), Some("INVALID_TICKET"));
        assert_eq!(
            ticket.outcome.failure_message(),
            Some("Ticket ST-1856339-aA5Yuvrxzpv8Tau1cYQ7 not recognized")
        );
    }

    #[test]
    fn proxy_ticket_converts_for_validation() {
        let ticket = ProxyTicket {
            ticket: Some("PT-957-ZuucXqTZ1YcJw81T3dxf".into()),
            target_service: "https://backend.local".into(),
            outcome: TicketOutcome::Success,
        };
        let st = ticket.to_service_ticket().unwrap();
        assert_eq!(st.ticket, "PT-957-ZuucXqTZ1YcJw81T3dxf");
        assert_eq!(st.service, "https://backend.local");
        assert!(!st.renew);
    }

    #[test]
    fn refused_proxy_ticket_has_nothing_to_validate() {
        let ticket = ProxyTicket {
            ticket: None,
            target_service: "https://backend.local".into(),
            outcome: TicketOutcome::Failure(ServiceFailure {
                code: Some("BAD_PGT".into()),
                message: "unknown pgt".into(),
            }),
        };
        assert!(ticket.to_service_ticket().is_none());
        assert_eq!(ticket.ticket(), "");
        assert!(ticket.is_failure());
    }
}
