use std::fmt;

/// Stable identity of a tree entity, by path.
///
/// Kept structured rather than as a joined string so names containing `/`
/// can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKey {
    Root,
    Application(String),
    Service(String, String),
    Instance(String, String, String),
}

impl NodeKey {
    pub fn application(app: &str) -> Self {
        NodeKey::Application(app.to_string())
    }

    pub fn service(app: &str, service: &str) -> Self {
        NodeKey::Service(app.to_string(), service.to_string())
    }

    pub fn instance(app: &str, service: &str, id: &str) -> Self {
        NodeKey::Instance(app.to_string(), service.to_string(), id.to_string())
    }

    /// Key of the enclosing entity; `None` for the root.
    pub fn parent(&self) -> Option<NodeKey> {
        match self {
            NodeKey::Root => None,
            NodeKey::Application(_) => Some(NodeKey::Root),
            NodeKey::Service(a, _) => Some(NodeKey::Application(a.clone())),
            NodeKey::Instance(a, s, _) => Some(NodeKey::Service(a.clone(), s.clone())),
        }
    }

    /// Name of the application this key belongs to.
    pub fn application_name(&self) -> Option<&str> {
        match self {
            NodeKey::Root => None,
            NodeKey::Application(a) | NodeKey::Service(a, _) | NodeKey::Instance(a, _, _) => {
                Some(a)
            }
        }
    }

    /// Last path segment, used as the node's label.
    pub fn label(&self) -> &str {
        match self {
            NodeKey::Root => "",
            NodeKey::Application(a) => a,
            NodeKey::Service(_, s) => s,
            NodeKey::Instance(_, _, i) => i,
        }
    }

    /// Nesting depth: root 0, application 1, service 2, instance 3.
    pub fn depth(&self) -> usize {
        match self {
            NodeKey::Root => 0,
            NodeKey::Application(_) => 1,
            NodeKey::Service(..) => 2,
            NodeKey::Instance(..) => 3,
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Root => f.write_str("/"),
            NodeKey::Application(a) => write!(f, "{}", a),
            NodeKey::Service(a, s) => write!(f, "{}/{}", a, s),
            NodeKey::Instance(a, s, i) => write!(f, "{}/{}/{}", a, s, i),
        }
    }
}
