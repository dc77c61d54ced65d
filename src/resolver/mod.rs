//! Host version resolution.
//!
//! At load time the resolver reads the host's version string, normalizes it
//! to a [`VersionCoordinate`], and selects the adapter registered for
//! exactly that coordinate. There is no range matching: internal layouts
//! are not guaranteed compatible even across patch releases, so an
//! unregistered version stops initialization with
//! [`ResolveError::UnsupportedHostVersion`].
//!
//! The selected adapter is published once. A [`CapabilitySlot`] holds it;
//! the process-wide slot is reached through [`initialize`] and
//! [`capabilities`].

mod version;

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{error, info};

pub use version::VersionCoordinate;

use crate::adapter::AdapterKind;
use crate::capability::CapabilityHandle;
use crate::error::ResolveError;
use crate::host::HostBridge;

/// Selects and builds the adapter for a host.
pub struct Resolver;

impl Resolver {
    /// Pick the adapter for a reported version string.
    pub fn select(reported: &str) -> Result<AdapterKind, ResolveError> {
        VersionCoordinate::parse(reported)
            .and_then(AdapterKind::for_coordinate)
            .ok_or_else(|| ResolveError::UnsupportedHostVersion {
                reported: reported.to_string(),
                supported: AdapterKind::supported(),
            })
    }

    /// Detect the host's version and build its capability handle.
    pub fn resolve(host: Arc<dyn HostBridge>) -> Result<CapabilityHandle, ResolveError> {
        let reported = host.version_string();
        match Self::select(&reported) {
            Ok(kind) => {
                info!(host = %reported, adapter = %kind.coordinate(), "selected version adapter");
                Ok(kind.instantiate(host))
            }
            Err(err) => {
                error!(host = %reported, "{err}");
                Err(err)
            }
        }
    }
}

/// Write-once holder for the published capability handle.
#[derive(Debug, Default)]
pub struct CapabilitySlot {
    cell: OnceCell<CapabilityHandle>,
}

impl CapabilitySlot {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Resolve against `host` and publish the result.
    ///
    /// Fails with `AlreadyResolved` if this slot was already filled; the
    /// handle published first stays in place. On `UnsupportedHostVersion`
    /// nothing is published.
    pub fn initialize(&self, host: Arc<dyn HostBridge>) -> Result<&CapabilityHandle, ResolveError> {
        if let Some(existing) = self.cell.get() {
            return Err(ResolveError::AlreadyResolved(existing.version()));
        }
        let handle = Resolver::resolve(host)?;
        let version = handle.version();
        self.cell
            .set(handle)
            .map_err(|_| ResolveError::AlreadyResolved(version))?;
        self.cell
            .get()
            .ok_or(ResolveError::AlreadyResolved(version))
    }

    /// The published handle, if resolution succeeded.
    #[must_use]
    pub fn get(&self) -> Option<&CapabilityHandle> {
        self.cell.get()
    }
}

static PUBLISHED: CapabilitySlot = CapabilitySlot::new();

/// Resolve the process-wide capability handle. Call once at plugin load.
pub fn initialize(host: Arc<dyn HostBridge>) -> Result<&'static CapabilityHandle, ResolveError> {
    PUBLISHED.initialize(host)
}

/// The process-wide capability handle, once [`initialize`] has succeeded.
#[must_use]
pub fn capabilities() -> Option<&'static CapabilityHandle> {
    PUBLISHED.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostFault;
    use crate::host::{HostValue, SymbolRef};

    struct VersionOnly(&'static str);

    impl HostBridge for VersionOnly {
        fn version_string(&self) -> String {
            self.0.to_string()
        }

        fn lookup_symbol(&self, _owner: &str, _name: &str) -> Option<SymbolRef> {
            None
        }

        fn invoke(&self, _symbol: &SymbolRef, _args: &[HostValue]) -> Result<HostValue, HostFault> {
            Err(HostFault::Rejected("unused".to_string()))
        }
    }

    #[test]
    fn test_select_exact() {
        assert_eq!(Resolver::select("1.21-R0.1-SNAPSHOT"), Ok(AdapterKind::V1_21));
        assert_eq!(Resolver::select("1.21.1-R0.1-SNAPSHOT"), Ok(AdapterKind::V1_21_1));
    }

    #[test]
    fn test_select_rejects_neighbours() {
        for reported in ["1.21.2", "1.20.6", "2.0", "not a version"] {
            match Resolver::select(reported) {
                Err(ResolveError::UnsupportedHostVersion { reported: r, supported }) => {
                    assert_eq!(r, reported);
                    assert_eq!(supported, AdapterKind::supported());
                }
                other => panic!("expected rejection for {reported}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_slot_publishes_once() {
        let slot = CapabilitySlot::new();
        let handle = slot.initialize(Arc::new(VersionOnly("1.21.1"))).unwrap().clone();
        assert_eq!(handle.version(), VersionCoordinate::new(1, 21, 1));

        let again = slot.initialize(Arc::new(VersionOnly("1.21")));
        assert_eq!(
            again.unwrap_err(),
            ResolveError::AlreadyResolved(VersionCoordinate::new(1, 21, 1))
        );
        assert!(slot.get().unwrap().same_as(&handle));
    }

    #[test]
    fn test_slot_stays_empty_on_unsupported() {
        let slot = CapabilitySlot::new();
        let err = slot.initialize(Arc::new(VersionOnly("1.19.4"))).unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedHostVersion { .. }));
        assert!(slot.get().is_none());
    }
}
