//! The identifiable body every mock origin returns

use crate::model::OriginIdentity;

const BODY_PREFIX: &str = "Response from endpoint: ";
const PORT_MARKER: &str = " (port ";
const PATH_PREFIX: &str = "Path: ";

/// Origin identity as recovered from a response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginBody {
    pub name: String,
    pub port: u16,
    pub path: Option<String>,
}

/// `Response from endpoint: <name> (port <port>)\nPath: <path>`
pub fn render_origin_body(origin: &OriginIdentity, path: &str) -> String {
    format!(
        "{}{}{}{})\n{}{}",
        BODY_PREFIX,
        origin.name(),
        PORT_MARKER,
        origin.port(),
        PATH_PREFIX,
        path
    )
}

/// Parse a body produced by [`render_origin_body`]. Returns `None` for anything else.
pub fn parse_origin_body(text: &str) -> Option<OriginBody> {
    let mut lines = text.lines();
    let header = lines.next()?.trim_end();
    let rest = header.strip_prefix(BODY_PREFIX)?;
    let (name, port) = rest.rsplit_once(PORT_MARKER)?;
    let port = port.strip_suffix(')')?.parse().ok()?;
    if name.is_empty() {
        return None;
    }

    let path = lines
        .next()
        .and_then(|line| line.strip_prefix(PATH_PREFIX))
        .map(str::to_string);

    Some(OriginBody {
        name: name.to_string(),
        port,
        path,
    })
}
