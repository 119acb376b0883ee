use thiserror::Error;

use crate::meta::NodeId;
use crate::runtime::link::RuntimeLink;

/// 编译与链接阶段的错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlueprintError {
    /// Insertion point does not belong to the selected port list.
    #[error("link {index} is not part of the selected port {port}")]
    LinkNotInPort { index: usize, port: RuntimeLink },

    #[error("link index {0} is out of range or was removed")]
    InvalidLink(usize),

    #[error("subgraph asset '{0}' includes itself")]
    RecursiveSubgraph(String),

    #[error("node {0} has no source in the graph description")]
    MissingSource(NodeId),

    #[error("node source {0} is not registered in the factory")]
    MissingFactorySource(usize),
}
