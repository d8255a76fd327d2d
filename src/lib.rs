use libxml::parser::XmlParseError;
use thiserror::Error;

mod attributes;
mod client;
mod config;
mod login_response;
mod login_url;
mod proxy_response;
mod ticket_store;
mod tickets;
mod transport;
mod utils;
mod validation_response;
mod xml_response;

pub use attributes::{decode_attribute_value, AttributeEncoding, AttributeValue, ExtraAttributes};
pub use client::CasClient;
pub use config::CasConfig;
pub use login_response::LoginResponse;
pub use login_url::LoginUrlBuilder;
pub use proxy_response::{ProxyOutcome, ProxyResponse};
pub use ticket_store::{MemoryPgtStore, PgtStore};
pub use tickets::{
    LoginTicket, ProxyGrantingTicket, ProxyTicket, ServiceFailure, ServiceTicket, Ticket,
    TicketOutcome, ValidatedTicket,
};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
pub use utils::{map_to_query, query_to_map, QueryParams};
pub use validation_response::{Protocol, ValidationOutcome, ValidationResponse};
pub use xml_response::{parse_service_response, ServiceResponse};

pub const CAS_NAMESPACE: &str = "http://www.yale.edu/tp/cas";

pub type CasResult<T> = Result<T, CasError>;

#[derive(Debug, Error)]
pub enum CasError {
    /// The payload could not be parsed as XML at all.
    #[error("malformed CAS response: {source}\n{raw:?}")]
    MalformedResponse {
        raw: String,
        #[source]
        source: XmlParseError,
    },

    /// Well-formed XML that lacks the structure every CAS response carries.
    #[error("invalid CAS response ({reason})\n{raw:?}")]
    InvalidResponseShape { reason: String, raw: String },

    /// Empty input, or an inner element that is neither the success nor the
    /// failure variant. The latter indicates the server broke the protocol.
    #[error("bad CAS response: {reason}\n{raw:?}")]
    BadResponse { reason: String, raw: String },

    #[error("couldn't find pgt for pgt_iou {pgt_iou}")]
    TicketNotFound { pgt_iou: String },

    #[error("the CAS authentication server at {url} is not responding")]
    ServerUnreachable { url: String },

    #[error("the CAS authentication server at {url} responded with an error ({status})\n{body:?}")]
    UnexpectedStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("login ticket request failed ({status})\n{body:?}")]
    LoginTicketRequest { status: u16, body: String },

    #[error("error parsing extra attribute {name} with value {value:?}: {source}")]
    InvalidAttribute {
        name: String,
        value: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    InvalidUrl(#[from] url::ParseError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl CasError {
    pub(crate) fn bad_response(reason: &str, raw: &str) -> Self {
        CasError::BadResponse {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    pub(crate) fn invalid_shape(reason: &str, raw: &str) -> Self {
        CasError::InvalidResponseShape {
            reason: reason.into(),
            raw: raw.into(),
        }
    }
}
