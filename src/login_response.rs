use crate::HttpResponse;

const TGT_COOKIE: &str = "tgt=";
const TICKET_PARAM: &str = "ticket=";
const MISTAKE_OPEN: &str = r#"<div class="messagebox mistake">"#;
const MISTAKE_CLOSE: &str = "</div>";

/// The CAS server's answer to a credential submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginResponse {
    pub tgt: Option<String>,
    pub ticket: Option<String>,
    pub service_redirect_url: Option<String>,
    pub failure_message: Option<String>,
    failure: bool,
}

impl LoginResponse {
    pub fn parse(response: &HttpResponse) -> Self {
        let tgt = response
            .header_values("set-cookie")
            .iter()
            .find_map(|cookie| extract_tgt(cookie));

        let location = response.header_values("location").first().cloned();
        let ticket = location.as_deref().and_then(extract_ticket);

        // 303 See Other is what current servers send. 2xx and 302 Found are
        // what older RubyCAS-Server releases sent and are still accepted.
        let redirect_accepted = matches!(response.status, 200..=299 | 302 | 303);
        let failure = !(redirect_accepted && ticket.is_some());

        let failure_message = failure.then(|| {
            extract_mistake(&response.body).unwrap_or_else(|| response.body.clone())
        });

        LoginResponse {
            tgt,
            ticket,
            service_redirect_url: location,
            failure_message,
            failure,
        }
    }

    /// True only when no failure was recorded and a non-empty ticket was issued.
    pub fn is_success(&self) -> bool {
        !self.failure && self.ticket.as_deref().is_some_and(|ticket| !ticket.is_empty())
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }
}

/// Position of `key` in `haystack` where it begins a new cookie or parameter.
fn find_token(haystack: &str, key: &str, separators: &[char]) -> Option<usize> {
    haystack.match_indices(key).map(|(at, _)| at).find(|&at| {
        haystack[..at]
            .chars()
            .next_back()
            .map_or(true, |prev| separators.contains(&prev) || prev == ' ')
    })
}

fn extract_tgt(cookie: &str) -> Option<String> {
    let start = find_token(cookie, TGT_COOKIE, &[';', '&'])? + TGT_COOKIE.len();
    let value = cookie[start..].split([';', '&']).next()?.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

fn extract_ticket(location: &str) -> Option<String> {
    let start = find_token(location, TICKET_PARAM, &['?', '&'])? + TICKET_PARAM.len();
    let value = location[start..].split(['&', '#']).next()?;
    (!value.is_empty()).then(|| value.to_owned())
}

fn extract_mistake(body: &str) -> Option<String> {
    let start = body.find(MISTAKE_OPEN)? + MISTAKE_OPEN.len();
    let len = body[start..].find(MISTAKE_CLOSE)?;
    Some(body[start..start + len].trim().to_owned())
}
