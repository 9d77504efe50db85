//! PROPFIND multistatus parsing.
//!
//! Pull-parses a 207 response body into per-resource property sets. Only
//! properties under a `propstat` whose status is 200 are kept; unknown and
//! malformed properties are skipped so servers may emit extension properties
//! the client does not understand.

use log::debug;
use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use super::client::WebDavError;
use super::props::{DavProperty, PropertyRegistry, RawProperty, NS_DAV};

/// One resource in a multistatus response, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DavResponse {
    /// The resource's href exactly as reported (still percent-encoded).
    pub href: String,
    /// Typed properties collected from successful propstats.
    pub props: Vec<DavProperty>,
}

/// Parser state for one multistatus document.
#[derive(Default)]
struct ParseState {
    responses: Vec<DavResponse>,
    // per-response
    href: String,
    committed: Vec<DavProperty>,
    // per-propstat
    pending: Vec<DavProperty>,
    propstat_ok: bool,
    in_propstat: bool,
    // per-property
    raw: Option<RawProperty>,
    child_depth: usize,
    in_prop: bool,
    in_href: bool,
    in_status: bool,
    status_text: String,
}

impl ParseState {
    fn open_element(&mut self, namespace: String, local: String) {
        if let Some(current) = self.raw.as_mut() {
            // Nested element inside a property value, e.g. <d:collection>
            // under <d:resourcetype>.
            current.children.push(local);
            self.child_depth += 1;
            return;
        }
        match (namespace.as_str(), local.as_str()) {
            (NS_DAV, "response") => {
                self.href.clear();
                self.committed.clear();
            }
            (NS_DAV, "href") => self.in_href = true,
            (NS_DAV, "propstat") => {
                self.pending.clear();
                self.propstat_ok = false;
                self.in_propstat = true;
            }
            (NS_DAV, "status") => {
                self.status_text.clear();
                self.in_status = true;
            }
            (NS_DAV, "prop") => self.in_prop = true,
            _ if self.in_prop => {
                self.raw = Some(RawProperty {
                    namespace,
                    name: local,
                    text: String::new(),
                    children: Vec::new(),
                });
                self.child_depth = 0;
            }
            _ => {}
        }
    }

    fn empty_element(&mut self, namespace: String, local: String, registry: &PropertyRegistry) {
        if let Some(current) = self.raw.as_mut() {
            // Self-closing child such as <d:collection/>; no matching end
            // event will follow.
            current.children.push(local);
            return;
        }
        if self.in_prop && !(namespace == NS_DAV && is_structural(&local)) {
            // A property with neither text nor children, e.g. an empty
            // <d:resourcetype/> on plain files.
            let finished = RawProperty {
                namespace,
                name: local,
                text: String::new(),
                children: Vec::new(),
            };
            self.finish_property(finished, registry);
        }
    }

    fn text(&mut self, value: &str) {
        if let Some(current) = self.raw.as_mut() {
            current.text.push_str(value);
        } else if self.in_href {
            self.href.push_str(value);
        } else if self.in_status {
            self.status_text.push_str(value);
        }
    }

    fn close_element(&mut self, local: String, registry: &PropertyRegistry) {
        if self.raw.is_some() {
            if self.child_depth > 0 {
                self.child_depth -= 1;
                return;
            }
            if let Some(finished) = self.raw.take() {
                self.finish_property(finished, registry);
            }
            return;
        }
        match local.as_str() {
            "href" => self.in_href = false,
            "status" => {
                self.in_status = false;
                if self.in_propstat {
                    self.propstat_ok = self.status_text.contains(" 200 ");
                }
            }
            "prop" => self.in_prop = false,
            "propstat" => {
                self.in_propstat = false;
                if self.propstat_ok {
                    self.committed.append(&mut self.pending);
                } else {
                    self.pending.clear();
                }
            }
            "response" => {
                self.responses.push(DavResponse {
                    href: std::mem::take(&mut self.href),
                    props: std::mem::take(&mut self.committed),
                });
            }
            _ => {}
        }
    }

    fn finish_property(&mut self, finished: RawProperty, registry: &PropertyRegistry) {
        if let Some(property) = registry.parse(&finished) {
            self.pending.push(property);
        } else {
            debug!(
                "ignoring property {}:{} in listing",
                finished.namespace, finished.name
            );
        }
    }
}

fn is_structural(local: &str) -> bool {
    matches!(local, "response" | "href" | "propstat" | "status" | "prop")
}

/// Parses a PROPFIND 207 body into one `DavResponse` per `d:response`,
/// order-preserving.
pub fn parse_multistatus(
    xml: &str,
    registry: &PropertyRegistry,
) -> Result<Vec<DavResponse>, WebDavError> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut state = ParseState::default();

    loop {
        match reader.read_resolved_event() {
            Ok((resolved, Event::Start(element))) => {
                let (namespace, local) = resolve(&resolved, element.local_name().as_ref());
                state.open_element(namespace, local);
            }
            Ok((resolved, Event::Empty(element))) => {
                let (namespace, local) = resolve(&resolved, element.local_name().as_ref());
                state.empty_element(namespace, local, registry);
            }
            Ok((_, Event::Text(text))) => {
                let value = text.unescape().map(|c| c.into_owned()).unwrap_or_default();
                state.text(&value);
            }
            Ok((_, Event::End(element))) => {
                let local = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
                state.close_element(local, registry);
            }
            Ok((_, Event::Eof)) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(WebDavError::Protocol(format!(
                    "invalid multistatus XML: {}",
                    e
                )))
            }
        }
    }

    Ok(state.responses)
}

fn resolve(resolved: &ResolveResult, local_name: &[u8]) -> (String, String) {
    let namespace = match resolved {
        ResolveResult::Bound(ns) => String::from_utf8_lossy(ns.as_ref()).into_owned(),
        _ => String::new(),
    };
    (namespace, String::from_utf8_lossy(local_name).into_owned())
}
