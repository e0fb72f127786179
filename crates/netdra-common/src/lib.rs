//! Shared kernel plumbing for netdra
//!
//! Errors, link-layer types, and the operations used to program a network
//! namespace. On Linux the operations are backed by rtnetlink sockets and
//! `/proc/sys`; elsewhere only the platform-independent pieces are built.

pub mod error;
pub mod ops;
pub mod sysctl;
pub mod types;

#[cfg(target_os = "linux")]
pub mod handle;
#[cfg(target_os = "linux")]
pub mod netlink;
#[cfg(target_os = "linux")]
pub mod netns;

pub use error::{ErrorList, NetdraError, Result};
pub use ops::{NeighborSpec, NetnsOps, RouteSpec, RuleSpec};
pub use types::HardwareAddr;

#[cfg(target_os = "linux")]
pub use handle::NetlinkHandle;
#[cfg(target_os = "linux")]
pub use netns::{NetNs, NetnsSwitch};
