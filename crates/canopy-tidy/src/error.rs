use crate::tree::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("node {id} is already part of the tree")]
    DuplicateNode { id: NodeId },
    #[error("node {id} is not part of the tree")]
    UnknownNode { id: NodeId },
}

pub type Result<T> = std::result::Result<T, Error>;
