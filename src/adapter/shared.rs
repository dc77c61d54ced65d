//! Host-version-agnostic helpers shared by every adapter.
//!
//! - [`SymbolCache`]: memoized symbol lookups, including misses
//! - [`safe_invoke`]: turns any host failure into `CapabilityUnavailable`
//! - [`WarnOnce`]: one diagnostic per key instead of one per call
//! - [`AdapterCore`]: the three above bundled with a bridge and a version
//!
//! Lookups go through the host's class metadata and are far too slow to
//! repeat per particle. The cache is keyed by `(owner, name)` and is safe
//! to share across threads, though in practice it is only hit from the
//! tick loop.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tracing::{debug, trace, warn};

use crate::capability::{FieldValue, Operation};
use crate::core::{Location, Vec3};
use crate::error::{CapabilityError, CapabilityResult, HostFault};
use crate::host::{HostBridge, HostValue, SymbolRef};
use crate::resolver::VersionCoordinate;

/// Where an adapter expects to find a symbol, and what shape it expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SymbolSpec {
    pub owner: &'static str,
    pub name: &'static str,
    pub shape: &'static str,
}

impl SymbolSpec {
    #[must_use]
    pub const fn new(owner: &'static str, name: &'static str, shape: &'static str) -> Self {
        Self { owner, name, shape }
    }
}

impl std::fmt::Display for SymbolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}{}", self.owner, self.name, self.shape)
    }
}

/// Memoized symbol resolution.
#[derive(Debug, Default)]
pub struct SymbolCache {
    entries: DashMap<(&'static str, &'static str), Option<SymbolRef>>,
}

impl SymbolCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a symbol, asking the host at most once per `(owner, name)`.
    ///
    /// A symbol whose shape differs from the declared one is reported as an
    /// incompatible layout; it is still cached so the next call fails fast.
    pub fn resolve(&self, host: &dyn HostBridge, spec: &SymbolSpec) -> Result<SymbolRef, HostFault> {
        let found = self
            .entries
            .entry((spec.owner, spec.name))
            .or_insert_with(|| {
                trace!(symbol = %spec, "resolving host symbol");
                host.lookup_symbol(spec.owner, spec.name)
            })
            .clone();

        match found {
            None => Err(HostFault::MissingSymbol {
                owner: spec.owner.to_string(),
                name: spec.name.to_string(),
            }),
            Some(symbol) if symbol.shape != spec.shape => Err(HostFault::IncompatibleLayout {
                symbol: format!("{}#{}", spec.owner, spec.name),
                expected: spec.shape.to_string(),
                found: symbol.shape,
            }),
            Some(symbol) => Ok(symbol),
        }
    }

    /// Number of distinct symbols looked up so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Run a host call, normalizing every failure to `CapabilityUnavailable`.
///
/// A panic inside the bridge is caught and reported the same way; it must
/// not take the tick loop down with it.
pub fn safe_invoke<T>(
    operation: Operation,
    call: impl FnOnce() -> Result<T, HostFault>,
) -> CapabilityResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(fault)) => {
            debug!(op = %operation, %fault, "host call failed");
            Err(CapabilityError::unavailable(operation, fault.to_string()))
        }
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            debug!(op = %operation, %reason, "host call panicked");
            Err(CapabilityError::unavailable(
                operation,
                format!("host panicked: {reason}"),
            ))
        }
    }
}

/// De-duplicates diagnostics by key.
#[derive(Debug, Default)]
pub struct WarnOnce {
    seen: DashSet<String>,
}

impl WarnOnce {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `message` at warn level the first time `key` is seen, and at
    /// trace level afterwards. Returns whether this was the first time.
    pub fn warn(&self, key: impl Into<String>, message: impl std::fmt::Display) -> bool {
        let key = key.into();
        if self.seen.insert(key.clone()) {
            warn!(%key, "{message}");
            true
        } else {
            trace!(%key, "{message}");
            false
        }
    }

    /// Has `key` already been reported?
    #[must_use]
    pub fn has_warned(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    /// Number of distinct keys reported.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// State every adapter carries: the bridge, its version, the symbol cache
/// and the warn-once set.
pub struct AdapterCore {
    host: Arc<dyn HostBridge>,
    version: VersionCoordinate,
    symbols: SymbolCache,
    warnings: WarnOnce,
}

impl AdapterCore {
    pub fn new(host: Arc<dyn HostBridge>, version: VersionCoordinate) -> Self {
        Self {
            host,
            version,
            symbols: SymbolCache::new(),
            warnings: WarnOnce::new(),
        }
    }

    #[must_use]
    pub fn version(&self) -> VersionCoordinate {
        self.version
    }

    #[must_use]
    pub fn symbols(&self) -> &SymbolCache {
        &self.symbols
    }

    #[must_use]
    pub fn warnings(&self) -> &WarnOnce {
        &self.warnings
    }

    /// Resolve `spec` and call it, all behind [`safe_invoke`].
    pub fn call(
        &self,
        operation: Operation,
        spec: &SymbolSpec,
        args: &[HostValue],
    ) -> CapabilityResult<HostValue> {
        let host = &*self.host;
        let result = safe_invoke(operation, || {
            let symbol = self.symbols.resolve(host, spec)?;
            host.invoke(&symbol, args)
        });
        if let Err(err) = &result {
            self.warnings.warn(
                format!("{}:{}", self.version, spec),
                format_args!("{err} (host {})", self.version),
            );
        }
        result
    }

    /// Resolve every spec first, then call them in order.
    ///
    /// Used by operations that need more than one host call. A missing or
    /// reshaped symbol is caught before anything is invoked. A call that
    /// fails partway stops the sequence: calls already made stay applied
    /// and the operation reports `CapabilityUnavailable`, never success.
    pub fn call_all(
        &self,
        operation: Operation,
        calls: &[(&SymbolSpec, Vec<HostValue>)],
    ) -> CapabilityResult<Vec<HostValue>> {
        let host = &*self.host;
        let resolved = safe_invoke(operation, || {
            calls
                .iter()
                .map(|(spec, _)| self.symbols.resolve(host, spec))
                .collect::<Result<Vec<_>, _>>()
        })
        .inspect_err(|err| {
            self.warnings.warn(
                format!("{}:{operation}:resolve", self.version),
                format_args!("{err} (host {})", self.version),
            );
        })?;

        let mut results = Vec::with_capacity(calls.len());
        for (index, (symbol, (spec, args))) in resolved.iter().zip(calls).enumerate() {
            match safe_invoke(operation, || host.invoke(symbol, args)) {
                Ok(value) => results.push(value),
                Err(err) => {
                    self.warnings.warn(
                        format!("{}:{spec}", self.version),
                        format_args!(
                            "{err} (host {}, {index} of {} calls already applied)",
                            self.version,
                            calls.len()
                        ),
                    );
                    return Err(err);
                }
            }
        }
        Ok(results)
    }

    /// Report an operation this release cannot perform.
    pub fn unsupported(&self, operation: Operation, what: &str) -> CapabilityError {
        let err = CapabilityError::unavailable(
            operation,
            format!("{what} is not supported on host {}", self.version),
        );
        self.warnings
            .warn(format!("{}:{operation}:{what}", self.version), &err);
        err
    }

    /// Note a return value of an unexpected type.
    ///
    /// The call has already happened by then, so the effect counts as
    /// applied; the mismatch is only reported once through the warn-once set.
    pub fn note_return_kind(
        &self,
        operation: Operation,
        spec: &SymbolSpec,
        value: &HostValue,
        expected: &'static str,
    ) {
        if value.type_name() != expected {
            let fault = HostFault::IncompatibleLayout {
                symbol: spec.to_string(),
                expected: expected.to_string(),
                found: value.type_name().to_string(),
            };
            self.warnings.warn(
                format!("{}:{spec}:return", self.version),
                format_args!("{operation}: {fault} (host {})", self.version),
            );
        }
    }
}

/// Flatten a location into `world, x, y, z`.
#[must_use]
pub fn location_args(at: &Location) -> Vec<HostValue> {
    vec![
        HostValue::Text(at.world.clone()),
        HostValue::Float(at.position.x),
        HostValue::Float(at.position.y),
        HostValue::Float(at.position.z),
    ]
}

/// Decode the host's `[world, x, y, z, yaw, pitch]` position tuple.
#[must_use]
pub fn decode_location(value: &HostValue) -> Option<Location> {
    let HostValue::List(parts) = value else {
        return None;
    };
    let [world, x, y, z, yaw, pitch] = parts.as_slice() else {
        return None;
    };
    Some(Location {
        world: world.as_text()?.to_string(),
        position: Vec3::new(x.as_f64()?, y.as_f64()?, z.as_f64()?),
        yaw: yaw.as_f64()? as f32,
        pitch: pitch.as_f64()? as f32,
    })
}

/// Decode a numeric or boolean field read.
#[must_use]
pub fn decode_field(value: &HostValue) -> Option<FieldValue> {
    match value {
        HostValue::Int(v) => Some(FieldValue::Int(*v)),
        HostValue::Float(v) => Some(FieldValue::Float(*v)),
        HostValue::Bool(v) => Some(FieldValue::Bool(*v)),
        HostValue::Text(v) => Some(FieldValue::Text(v.clone())),
        _ => None,
    }
}

impl std::fmt::Debug for AdapterCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterCore")
            .field("version", &self.version)
            .field("cached_symbols", &self.symbols.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHost {
        lookups: AtomicUsize,
        invokes: AtomicUsize,
    }

    impl CountingHost {
        fn new() -> Self {
            Self {
                lookups: AtomicUsize::new(0),
                invokes: AtomicUsize::new(0),
            }
        }
    }

    impl HostBridge for CountingHost {
        fn version_string(&self) -> String {
            "1.21.1-R0.1-SNAPSHOT".to_string()
        }

        fn lookup_symbol(&self, owner: &str, name: &str) -> Option<SymbolRef> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if name == "missing" {
                return None;
            }
            Some(SymbolRef {
                id: 1,
                owner: owner.to_string(),
                name: name.to_string(),
                shape: "()V".to_string(),
            })
        }

        fn invoke(&self, symbol: &SymbolRef, _args: &[HostValue]) -> Result<HostValue, HostFault> {
            self.invokes.fetch_add(1, Ordering::SeqCst);
            if symbol.name == "explode" {
                panic!("boom");
            }
            if symbol.name == "refuse" {
                return Err(HostFault::Rejected("no".to_string()));
            }
            Ok(HostValue::Unit)
        }
    }

    const PRESENT: SymbolSpec = SymbolSpec::new("Owner", "present", "()V");
    const MISSING: SymbolSpec = SymbolSpec::new("Owner", "missing", "()V");
    const WRONG_SHAPE: SymbolSpec = SymbolSpec::new("Owner", "present", "(I)V");

    #[test]
    fn test_cache_memoizes_hits_and_misses() {
        let host = CountingHost::new();
        let cache = SymbolCache::new();

        for _ in 0..3 {
            assert!(cache.resolve(&host, &PRESENT).is_ok());
            assert!(matches!(
                cache.resolve(&host, &MISSING),
                Err(HostFault::MissingSymbol { .. })
            ));
        }

        assert_eq!(host.lookups.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_reports_layout_mismatch() {
        let host = CountingHost::new();
        let cache = SymbolCache::new();

        let err = cache.resolve(&host, &WRONG_SHAPE).unwrap_err();
        assert_eq!(
            err,
            HostFault::IncompatibleLayout {
                symbol: "Owner#present".to_string(),
                expected: "(I)V".to_string(),
                found: "()V".to_string(),
            }
        );
    }

    #[test]
    fn test_safe_invoke_maps_faults() {
        let err = safe_invoke::<()>(Operation::PlaySound, || {
            Err(HostFault::Rejected("nope".to_string()))
        })
        .unwrap_err();
        assert_eq!(err.operation(), Operation::PlaySound);
    }

    #[test]
    fn test_safe_invoke_catches_panics() {
        let err = safe_invoke::<()>(Operation::RenderEffect, || panic!("bad layout")).unwrap_err();
        match err {
            CapabilityError::Unavailable { reason, .. } => assert!(reason.contains("bad layout")),
        }
    }

    #[test]
    fn test_decode_location() {
        let value = HostValue::List(vec![
            HostValue::Text("world".into()),
            HostValue::Float(1.5),
            HostValue::Int(64),
            HostValue::Float(-3.0),
            HostValue::Float(90.0),
            HostValue::Float(10.0),
        ]);
        let loc = decode_location(&value).unwrap();
        assert_eq!(loc.world, "world");
        assert_eq!(loc.position, Vec3::new(1.5, 64.0, -3.0));
        assert_eq!(loc.yaw, 90.0);

        assert!(decode_location(&HostValue::List(vec![])).is_none());
        assert!(decode_location(&HostValue::Unit).is_none());
    }

    #[test]
    fn test_warn_once() {
        let warnings = WarnOnce::new();
        assert!(warnings.warn("chain:render_effect", "unsupported"));
        assert!(!warnings.warn("chain:render_effect", "unsupported"));
        assert!(warnings.warn("chain:play_sound", "unsupported"));
        assert!(warnings.has_warned("chain:render_effect"));
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_call_all_invokes_nothing_when_one_symbol_is_missing() {
        let host = Arc::new(CountingHost::new());
        let core = AdapterCore::new(host.clone(), VersionCoordinate::new(1, 21, 1));

        let result = core.call_all(
            Operation::SendTargetedPacketEffect,
            &[(&PRESENT, vec![]), (&MISSING, vec![])],
        );

        assert!(result.is_err());
        assert_eq!(host.invokes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_core_call_surfaces_rejection() {
        let host = Arc::new(CountingHost::new());
        let core = AdapterCore::new(host, VersionCoordinate::new(1, 21, 1));
        let refuse = SymbolSpec::new("Owner", "refuse", "()V");

        assert!(core.call(Operation::PlaySound, &refuse, &[]).is_err());
        assert!(core.call(Operation::PlaySound, &PRESENT, &[]).is_ok());
    }
}
