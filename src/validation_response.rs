use std::fmt;

use time::OffsetDateTime;

use crate::{
    attributes::{decode_attribute_value, AttributeEncoding, ExtraAttributes},
    tickets::ServiceFailure,
    utils::{element_text, trimmed_text},
    xml_response::{parse_service_response, service_failure, ServiceResponse},
    CasError,
};

const SUCCESS: &str = "authenticationSuccess";
const FAILURE: &str = "authenticationFailure";

// Everything inside cas:attributes, plus the flat children of
// authenticationSuccess that carry no protocol meaning.
const EXTRA_ATTRIBUTES: &str = "cas:attributes/* \
    | *[local-name() != 'user' and local-name() != 'proxyGrantingTicket' \
    and local-name() != 'proxies' and local-name() != 'attributes']";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Protocol {
    /// Plaintext `yes`/`no` answers from `/validate`.
    Cas1,
    /// XML answers from `/serviceValidate` and `/proxyValidate`.
    Cas2,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Protocol::Cas1 => write!(f, "1.0"),
            Protocol::Cas2 => write!(f, "2.0"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Success {
        user: String,
        pgt_iou: Option<String>,
        proxies: Vec<String>,
        extra_attributes: ExtraAttributes,
    },
    Failure(ServiceFailure),
}

/// The CAS server's answer to a service or proxy ticket validation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResponse {
    pub protocol: Protocol,
    pub outcome: ValidationOutcome,
    pub parsed_at: OffsetDateTime,
    rendered: String,
}

impl ValidationResponse {
    pub fn parse(raw: &str, encoding: AttributeEncoding) -> Result<Self, CasError> {
        if raw.is_empty() {
            return Err(CasError::bad_response("CAS response is empty", raw));
        }
        let parsed_at = OffsetDateTime::now_utc();

        if let Some((valid, user)) = parse_legacy(raw) {
            let outcome = if valid {
                ValidationOutcome::Success {
                    user: user.into(),
                    pgt_iou: None,
                    proxies: Vec::new(),
                    extra_attributes: ExtraAttributes::new(),
                }
            } else {
                ValidationOutcome::Failure(ServiceFailure {
                    code: None,
                    message: String::new(),
                })
            };
            return Ok(ValidationResponse {
                protocol: Protocol::Cas1,
                outcome,
                parsed_at,
                rendered: raw.into(),
            });
        }

        let response = parse_service_response(raw)?;
        let outcome = match response.name().as_str() {
            SUCCESS => parse_success(&response, encoding, raw)?,
            FAILURE => ValidationOutcome::Failure(service_failure(response.element())),
            other => {
                return Err(CasError::bad_response(
                    &format!("unexpected {other} element in validation response"),
                    raw,
                ))
            }
        };

        Ok(ValidationResponse {
            protocol: Protocol::Cas2,
            outcome,
            parsed_at,
            rendered: response.to_string(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ValidationOutcome::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    pub fn user(&self) -> Option<&str> {
        match &self.outcome {
            ValidationOutcome::Success { user, .. } => Some(user),
            ValidationOutcome::Failure(_) => None,
        }
    }

    pub fn pgt_iou(&self) -> Option<&str> {
        match &self.outcome {
            ValidationOutcome::Success { pgt_iou, .. } => pgt_iou.as_deref(),
            ValidationOutcome::Failure(_) => None,
        }
    }

    pub fn proxies(&self) -> &[String] {
        match &self.outcome {
            ValidationOutcome::Success { proxies, .. } => proxies,
            ValidationOutcome::Failure(_) => &[],
        }
    }

    pub fn extra_attributes(&self) -> Option<&ExtraAttributes> {
        match &self.outcome {
            ValidationOutcome::Success {
                extra_attributes, ..
            } => Some(extra_attributes),
            ValidationOutcome::Failure(_) => None,
        }
    }

    pub fn failure_code(&self) -> Option<&str> {
        match &self.outcome {
            ValidationOutcome::Failure(failure) => failure.code.as_deref(),
            ValidationOutcome::Success { .. } => None,
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        match &self.outcome {
            ValidationOutcome::Failure(failure) => Some(&failure.message),
            ValidationOutcome::Success { .. } => None,
        }
    }
}

impl fmt::Display for ValidationResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.rendered)
    }
}

/// Recognizes the two-line CAS 1.0 answer, returning the verdict and the user line.
fn parse_legacy(raw: &str) -> Option<(bool, &str)> {
    let body = raw.strip_suffix('\n')?;
    let (verdict, user) = body.split_once('\n')?;
    if user.contains('\n') {
        return None;
    }
    let user = user.strip_suffix('\r').unwrap_or(user);
    match verdict.strip_suffix('\r').unwrap_or(verdict) {
        "yes" => Some((true, user)),
        "no" => Some((false, user)),
        _ => None,
    }
}

/// Raw name and value of every extra attribute, in document order.
///
/// Two shapes are accepted: `<cas:name>value</cas:name>` and
/// `<cas:attribute name="name" value="value"/>`, either directly below
/// `authenticationSuccess` or inside its `attributes` element.
fn raw_attributes(success: &ServiceResponse) -> Vec<(String, String)> {
    success
        .select(EXTRA_ATTRIBUTES)
        .into_iter()
        .map(|element| match element.get_attribute("name") {
            Some(name) => (name, element.get_attribute("value").unwrap_or_default()),
            None => (element.get_name(), element_text(&element)),
        })
        .collect()
}

fn parse_success(
    success: &ServiceResponse,
    encoding: AttributeEncoding,
    raw: &str,
) -> Result<ValidationOutcome, CasError> {
    let user = success
        .select_text("cas:user")
        .ok_or_else(|| CasError::invalid_shape("authenticationSuccess without cas:user", raw))?;

    let pgt_iou = success.select_text("cas:proxyGrantingTicket");

    let proxies = success
        .select("cas:proxies/cas:proxy")
        .iter()
        .map(trimmed_text)
        .collect();

    let mut extra_attributes = ExtraAttributes::new();
    for (name, value) in raw_attributes(success) {
        let decoded = decode_attribute_value(&name, &value, encoding)?;
        extra_attributes.insert(name, decoded);
    }

    Ok(ValidationOutcome::Success {
        user,
        pgt_iou,
        proxies,
        extra_attributes,
    })
}
