//! Version adapters.
//!
//! One adapter per supported host release, each implementing the full
//! [`Capabilities`](crate::capability::Capabilities) interface against that
//! release's internals. When a release breaks its internals, only its
//! adapter changes.
//!
//! The set is closed: [`AdapterKind::ALL`] lists every adapter the resolver
//! may select.

pub mod shared;
pub mod v1_21;
pub mod v1_21_1;

use std::sync::Arc;

pub use shared::{safe_invoke, AdapterCore, SymbolCache, SymbolSpec, WarnOnce};
pub use v1_21::V1_21Adapter;
pub use v1_21_1::V1_21_1Adapter;

use crate::capability::CapabilityHandle;
use crate::host::HostBridge;
use crate::resolver::VersionCoordinate;

/// The supported host releases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    V1_21,
    V1_21_1,
}

impl AdapterKind {
    /// Every adapter, oldest release first.
    pub const ALL: [AdapterKind; 2] = [AdapterKind::V1_21, AdapterKind::V1_21_1];

    /// The exact host release this adapter is bound to.
    #[must_use]
    pub const fn coordinate(self) -> VersionCoordinate {
        match self {
            AdapterKind::V1_21 => v1_21::VERSION,
            AdapterKind::V1_21_1 => v1_21_1::VERSION,
        }
    }

    /// Exact-match lookup.
    #[must_use]
    pub fn for_coordinate(coordinate: VersionCoordinate) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.coordinate() == coordinate)
    }

    /// Coordinates of every supported release.
    #[must_use]
    pub fn supported() -> Vec<VersionCoordinate> {
        Self::ALL.iter().map(|kind| kind.coordinate()).collect()
    }

    /// Build the adapter over a host bridge.
    pub fn instantiate(self, host: Arc<dyn HostBridge>) -> CapabilityHandle {
        match self {
            AdapterKind::V1_21 => CapabilityHandle::from_impl(V1_21Adapter::new(host)),
            AdapterKind::V1_21_1 => CapabilityHandle::from_impl(V1_21_1Adapter::new(host)),
        }
    }
}
