use super::key::NodeKey;
use super::node::Field;
use crate::data::Status;

/// One change for the presentation layer to apply.
///
/// The core never touches a screen; it only emits these.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// A node was observed for the first time; append it under `parent`.
    Create {
        key: NodeKey,
        parent: Option<NodeKey>,
    },
    /// A displayed field changed.
    Update {
        key: NodeKey,
        field: Field,
        value: String,
    },
    /// A node moved into a worse status from a different one.
    ///
    /// `reveal` names the application to bring into view, and is only set
    /// when the user has been idle long enough not to be interrupted.
    Attention {
        key: NodeKey,
        status: Status,
        reveal: Option<NodeKey>,
    },
    /// A service's instance table was opened or closed.
    Expand { key: NodeKey, expanded: bool },
    /// A node (and its subtree) is gone from the view.
    Remove { key: NodeKey },
    /// The detail surface for an application was opened.
    DetailOpened { app: String },
    /// The detail surface was hidden again.
    DetailClosed { app: String },
}

impl RenderCommand {
    /// Key of the node this command targets, for node-level commands.
    pub fn key(&self) -> Option<&NodeKey> {
        match self {
            RenderCommand::Create { key, .. }
            | RenderCommand::Update { key, .. }
            | RenderCommand::Attention { key, .. }
            | RenderCommand::Expand { key, .. }
            | RenderCommand::Remove { key } => Some(key),
            RenderCommand::DetailOpened { .. } | RenderCommand::DetailClosed { .. } => None,
        }
    }

    pub fn is_attention(&self) -> bool {
        matches!(self, RenderCommand::Attention { .. })
    }
}
