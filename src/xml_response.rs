use std::{fmt, sync::Once};

use libxml::{
    parser::{Parser as XmlParser, ParserOptions},
    tree::{Document, Node},
    xpath::Context,
};

use crate::{tickets::ServiceFailure, utils::trimmed_text, CasError, CAS_NAMESPACE};

const ENVELOPE: &str = "serviceResponse";
const ENVELOPE_PREFIX: &str = "cas";

static XML_INIT: Once = Once::new();

/// The single result element of a `cas:serviceResponse` envelope, together with
/// the document that owns it.
pub struct ServiceResponse {
    // Declared before `document` so the node handle is dropped first.
    inner: Node,
    document: Document,
    namespace: String,
}

impl ServiceResponse {
    /// Local name of the inner element, e.g. `authenticationSuccess`.
    pub fn name(&self) -> String {
        self.inner.get_name()
    }

    pub fn element(&self) -> &Node {
        &self.inner
    }

    /// Evaluates `xpath` against the inner element, with the `cas` prefix bound
    /// to the envelope's namespace.
    pub fn select(&self, xpath: &str) -> Vec<Node> {
        let Ok(mut context) = Context::new(&self.document) else {
            return Vec::new();
        };
        if context
            .register_namespace(ENVELOPE_PREFIX, &self.namespace)
            .is_err()
        {
            return Vec::new();
        }
        context
            .findnodes(xpath, Some(&self.inner))
            .unwrap_or_default()
    }

    /// Trimmed text of the first node matching `xpath`.
    pub fn select_text(&self, xpath: &str) -> Option<String> {
        self.select(xpath).first().map(trimmed_text)
    }
}

impl fmt::Display for ServiceResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.document.node_to_string(&self.inner))
    }
}

impl fmt::Debug for ServiceResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("ServiceResponse")
            .field(&self.to_string())
            .finish()
    }
}

/// Namespace URI of a `cas:serviceResponse` root, or `None` for any other root.
fn envelope_namespace(root: &Node) -> Option<String> {
    if root.get_name() != ENVELOPE {
        return None;
    }
    let ns = root.get_namespace()?;
    let href = ns.get_href();
    (ns.get_prefix() == ENVELOPE_PREFIX || href == CAS_NAMESPACE).then_some(href)
}

/// Parses `raw` and unwraps the `cas:serviceResponse` envelope.
pub fn parse_service_response(raw: &str) -> Result<ServiceResponse, CasError> {
    XML_INIT.call_once(|| {
        // libxml2 2.9 sets up its global state lazily and without locking on
        // the first parse, so threads racing on that first parse can corrupt it.
        // SAFETY: xmlInitParser has no preconditions and is idempotent.
        unsafe { libxml::bindings::xmlInitParser() }
    });

    let options = ParserOptions {
        recover: false,
        no_net: true,
        ..ParserOptions::default()
    };
    let document = XmlParser::default()
        .parse_string_with_options(raw, options)
        .map_err(|source| CasError::MalformedResponse {
            raw: raw.into(),
            source,
        })?;

    let root = document
        .get_root_element()
        .ok_or_else(|| CasError::invalid_shape("document has no root element", raw))?;
    let namespace = envelope_namespace(&root).ok_or_else(|| {
        CasError::invalid_shape("missing cas:serviceResponse root element", raw)
    })?;

    let inner = root
        .get_first_element_child()
        .ok_or_else(|| CasError::invalid_shape("empty cas:serviceResponse", raw))?;

    Ok(ServiceResponse {
        inner,
        document,
        namespace,
    })
}

/// Code attribute and message text of a `*Failure` element.
pub(crate) fn service_failure(element: &Node) -> ServiceFailure {
    ServiceFailure {
        code: element.get_attribute("code"),
        message: trimmed_text(element),
    }
}
