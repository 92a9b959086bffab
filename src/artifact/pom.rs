// ABOUTME: Reads source control coordinates from a Maven project descriptor.
// ABOUTME: Parses the POM as XML and reads the connection and tag of the top-level <scm>.

use roxmltree::Node;

/// Source control coordinates declared by a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScmInfo {
    pub connection: String,
    pub tag: Option<String>,
}

/// Extract `<scm><connection>` and `<scm><tag>` of the project.
/// `None` when the descriptor does not parse or has no usable connection.
pub fn scm_info(pom: &str) -> Option<ScmInfo> {
    let doc = match roxmltree::Document::parse(pom) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!(error = %e, "unreadable project descriptor");
            return None;
        }
    };
    let scm = child(doc.root_element(), "scm")?;
    let connection = text(scm, "connection").or_else(|| text(scm, "developerConnection"))?;
    Some(ScmInfo {
        connection,
        tag: text(scm, "tag"),
    })
}

/// First child element with local name `name`, whatever its namespace.
fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

/// Trimmed text of child element `name`; `None` when missing or blank.
fn text(node: Node<'_, '_>, name: &str) -> Option<String> {
    let element = child(node, name)?;
    let value: String = element
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
