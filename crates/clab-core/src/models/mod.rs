pub mod container;
pub mod launch_spec;
pub mod node;
pub mod publish;
pub mod settings;
pub mod topology;

pub use container::{ContainerSummary, ExecOutput, FilterOperator, LabelFilter};
pub use launch_spec::{Bind, LaunchSpec};
pub use node::{MgmtNet, NodeDeclaration};
pub use publish::{PublishSocket, SocketType};
pub use settings::Settings;
pub use topology::{NodeDefinition, Topology, TopologyFile};
