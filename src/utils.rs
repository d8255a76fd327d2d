use std::collections::BTreeMap;

use libxml::tree::{Node, NodeType};
use url::{form_urlencoded, Url};

/// Decoded query string, one entry per key with every value in order of appearance.
pub type QueryParams = BTreeMap<String, Vec<String>>;

pub fn query_to_map(query: &str) -> QueryParams {
    let mut params = QueryParams::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        params
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    params
}

pub fn map_to_query(params: &QueryParams) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, values) in params {
        for value in values {
            serializer.append_pair(key, value);
        }
    }
    serializer.finish()
}

pub(crate) fn url_query(url: &Url) -> QueryParams {
    url.query().map(query_to_map).unwrap_or_default()
}

pub(crate) fn set_url_query(url: &mut Url, params: &QueryParams) {
    if params.values().all(Vec::is_empty) {
        url.set_query(None);
    } else {
        url.set_query(Some(&map_to_query(params)));
    }
}

/// Text of `node`. When it holds CDATA sections only those are joined, so the
/// whitespace a pretty-printer puts around them is dropped.
pub(crate) fn element_text(node: &Node) -> String {
    let cdata: Vec<String> = node
        .get_child_nodes()
        .iter()
        .filter(|child| child.get_type() == Some(NodeType::CDataSectionNode))
        .map(Node::get_content)
        .collect();
    if cdata.is_empty() {
        node.get_content()
    } else {
        cdata.concat()
    }
}

pub(crate) fn trimmed_text(node: &Node) -> String {
    node.get_content().trim().to_owned()
}
