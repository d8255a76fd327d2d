use std::{collections::VecDeque, sync::Mutex};

use casclient::{
    AttributeValue, CasClient, CasConfig, CasError, HttpMethod, HttpRequest, HttpResponse,
    MemoryPgtStore, ServiceTicket, Transport, TransportError,
};

/// Answers requests from a queue and records what was sent.
#[derive(Default)]
struct ScriptedTransport {
    answers: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    fn new(answers: impl IntoIterator<Item = Result<HttpResponse, TransportError>>) -> Self {
        ScriptedTransport {
            answers: Mutex::new(answers.into_iter().collect()),
            requests: Mutex::default(),
        }
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn reply(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected request")
    }

    fn transport(&self) -> impl Transport + '_ {
        move |request: HttpRequest| self.reply(request)
    }
}

fn config() -> CasConfig {
    CasConfig {
        proxy_callback_url: Some("https://app.local/cas/proxy_callback".into()),
        ..CasConfig::new("https://cas.local/cas")
    }
}

const VALIDATION_SUCCESS: &str = r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
  <cas:authenticationSuccess>
    <cas:user>jsmith</cas:user>
    <cas:proxyGrantingTicket>PGTIOU-84678-8a9d</cas:proxyGrantingTicket>
    <cas:attributes>
      <cas:roles>[admin, staff]</cas:roles>
    </cas:attributes>
  </cas:authenticationSuccess>
</cas:serviceResponse>"#;

const VALIDATION_FAILURE: &str = r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
  <cas:authenticationFailure code="INVALID_TICKET">
    Ticket ST-1856339-aA5Yuvrxzpv8Tau1cYQ7 not recognized
  </cas:authenticationFailure>
</cas:serviceResponse>"#;

const PROXY_SUCCESS: &str = r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
  <cas:proxySuccess>
    <cas:proxyTicket>PT-957-ZuucXqTZ1YcJw81T3dxf</cas:proxyTicket>
  </cas:proxySuccess>
</cas:serviceResponse>"#;

#[test]
fn validates_service_ticket() {
    let transport = ScriptedTransport::new([Ok(HttpResponse::new(200).body(VALIDATION_SUCCESS))]);
    let client = CasClient::new(config(), transport.transport());

    let validated = client
        .validate_service_ticket(ServiceTicket::new("ST-1", "https://app.local/"))
        .unwrap();

    assert!(validated.is_success());
    assert_eq!(validated.user.as_deref(), Some("jsmith"));
    assert_eq!(validated.pgt_iou.as_deref(), Some("PGTIOU-84678-8a9d"));
    assert_eq!(
        validated.extra_attributes["roles"],
        AttributeValue::from(vec!["admin", "staff"])
    );

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::Get);
    assert_eq!(
        requests[0].url,
        "https://cas.local/cas/proxyValidate?pgtUrl=https%3A%2F%2Fapp.local%2Fcas%2Fproxy_callback&service=https%3A%2F%2Fapp.local%2F&ticket=ST-1"
    );
}

#[test]
fn unprocessable_entity_carries_a_failure() {
    let transport = ScriptedTransport::new([Ok(HttpResponse::new(422).body(VALIDATION_FAILURE))]);
    let client = CasClient::new(config(), transport.transport());

    let validated = client
        .validate_service_ticket(ServiceTicket::new("ST-1", "https://app.local/"))
        .unwrap();

    assert!(validated.is_failure());
    assert_eq!(validated.user, None);
    assert_eq!(validated.outcome.failure_code(), Some("INVALID_TICKET"));
    assert_eq!(
        validated.outcome.failure_message(),
        Some("Ticket ST-1856339-aA5Yuvrxzpv8Tau1cYQ7 not recognized")
    );
}

#[test]
fn server_error_is_unexpected_status() {
    let transport = ScriptedTransport::new([Ok(HttpResponse::new(500).body("oops"))]);
    let client = CasClient::new(config(), transport.transport());

    let err = client
        .validate_service_ticket(ServiceTicket::new("ST-1", "https://app.local/"))
        .unwrap_err();

    match err {
        CasError::UnexpectedStatus { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "oops");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn garbage_body_is_malformed() {
    let transport = ScriptedTransport::new([Ok(HttpResponse::new(200).body("<cas:serviceResponse"))]);
    let client = CasClient::new(config(), transport.transport());

    let err = client
        .validate_service_ticket(ServiceTicket::new("ST-1", "https://app.local/"))
        .unwrap_err();
    assert!(matches!(err, CasError::MalformedResponse { .. }));
}

#[test]
fn requests_and_validates_proxy_ticket() {
    let transport = ScriptedTransport::new([Ok(HttpResponse::new(200).body(PROXY_SUCCESS))]);
    let client = CasClient::new(config(), transport.transport());

    let store = MemoryPgtStore::new();
    store.insert("PGTIOU-84678-8a9d", "PGT-330-CSdUq");
    let pgt = client
        .retrieve_proxy_granting_ticket(&store, "PGTIOU-84678-8a9d")
        .unwrap();

    let pt = client
        .request_proxy_ticket(&pgt, "https://backend.local/")
        .unwrap();
    assert!(pt.is_success());
    assert_eq!(pt.ticket.as_deref(), Some("PT-957-ZuucXqTZ1YcJw81T3dxf"));
    assert_eq!(
        transport.requests()[0].url,
        "https://cas.local/cas/proxy?pgt=PGT-330-CSdUq&targetService=https%3A%2F%2Fbackend.local%2F"
    );

    let backend = ScriptedTransport::new([Ok(HttpResponse::new(200).body(VALIDATION_SUCCESS))]);
    let backend_client = CasClient::new(CasConfig::new("https://cas.local/cas"), backend.transport());
    let validated = backend_client
        .validate_proxy_ticket(pt.to_service_ticket().unwrap())
        .unwrap();
    assert!(validated.is_success());
    assert_eq!(
        backend.requests()[0].url,
        "https://cas.local/cas/proxyValidate?service=https%3A%2F%2Fbackend.local%2F&ticket=PT-957-ZuucXqTZ1YcJw81T3dxf"
    );
}

#[test]
fn logs_in_to_service() {
    let transport = ScriptedTransport::new([
        Ok(HttpResponse::new(201).body("LT-1350985088rA2B1C3D4\n")),
        Ok(HttpResponse::new(303)
            .header("Set-Cookie", "tgt=TGC-1350985088r; path=/cas")
            .header("Location", "https://app.local/?ticket=ST-77")),
    ]);
    let client = CasClient::new(config(), transport.transport());

    let login = client
        .login_to_service(&[("username", "jsmith"), ("password", "s3cret")], "https://app.local/")
        .unwrap();
    assert!(login.is_success());
    assert_eq!(login.tgt.as_deref(), Some("TGC-1350985088r"));
    assert_eq!(login.ticket.as_deref(), Some("ST-77"));

    let requests = transport.requests();
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(requests[0].url, "https://cas.local/cas/loginTicket");
    assert_eq!(requests[0].body.as_deref(), Some(";"));

    assert_eq!(requests[1].method, HttpMethod::Post);
    assert_eq!(requests[1].url, "https://cas.local/cas/login");
    assert_eq!(
        requests[1].body.as_deref(),
        Some("username=jsmith&password=s3cret&lt=LT-1350985088rA2B1C3D4&service=https%3A%2F%2Fapp.local%2F")
    );
}

#[test]
fn rejected_credentials() {
    let transport = ScriptedTransport::new([
        Ok(HttpResponse::new(200).body("LT-1")),
        Ok(HttpResponse::new(401)
            .body(r#"<div class="messagebox mistake">Incorrect username or password.</div>"#)),
    ]);
    let client = CasClient::new(config(), transport.transport());

    let login = client
        .login_to_service(&[("username", "jsmith"), ("password", "nope")], "https://app.local/")
        .unwrap();
    assert!(login.is_failure());
    assert_eq!(
        login.failure_message.as_deref(),
        Some("Incorrect username or password.")
    );
}

#[test]
fn login_ticket_refused() {
    let transport = ScriptedTransport::new([Ok(HttpResponse::new(404).body("Not Found"))]);
    let client = CasClient::new(config(), transport.transport());

    let err = client.request_login_ticket().unwrap_err();
    assert!(matches!(err, CasError::LoginTicketRequest { status: 404, .. }));
}

#[test]
fn liveness() {
    let transport = ScriptedTransport::new([
        Ok(HttpResponse::new(200)),
        Ok(HttpResponse::new(503)),
        Err(TransportError::ConnectionRefused("connection refused".into())),
        Err(TransportError::Other("tls handshake failed".into())),
    ]);
    let client = CasClient::new(config(), transport.transport());

    assert!(client.cas_server_is_up().unwrap());
    assert!(!client.cas_server_is_up().unwrap());
    assert!(!client.cas_server_is_up().unwrap());
    assert!(matches!(
        client.cas_server_is_up().unwrap_err(),
        CasError::Transport(_)
    ));
    assert!(transport
        .requests()
        .iter()
        .all(|request| request.url == "https://cas.local/cas/login"));
}

#[test]
fn unreachable_server() {
    let transport = ScriptedTransport::new([Err(TransportError::ConnectionRefused(
        "connection refused".into(),
    ))]);
    let client = CasClient::new(config(), transport.transport());

    let err = client.request_login_ticket().unwrap_err();
    match err {
        CasError::ServerUnreachable { url } => {
            assert_eq!(url, "https://cas.local/cas/loginTicket")
        }
        other => panic!("unexpected error {other:?}"),
    }
}
