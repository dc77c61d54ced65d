//! The raw host bridge.
//!
//! [`HostBridge`] is the narrow door into the host runtime's private
//! internals: look up a symbol by owner and name, call it with a flat
//! argument list. Symbol names, argument order and value encodings all
//! differ between host releases, which is why nothing outside
//! [`adapter`](crate::adapter) ever calls it directly.

use serde::{Deserialize, Serialize};

use crate::core::EntityId;
use crate::error::HostFault;

/// A resolved host symbol.
///
/// `shape` is the host's descriptor for the symbol, e.g. `(Ljava/lang/String;DDD)V`.
/// Adapters compare it with the shape they were written against before
/// calling anything.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolRef {
    pub id: u64,
    pub owner: String,
    pub name: String,
    pub shape: String,
}

impl std::fmt::Display for SymbolRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}{}", self.owner, self.name, self.shape)
    }
}

/// Values crossing the bridge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum HostValue {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Entity(EntityId),
    List(Vec<HostValue>),
}

impl HostValue {
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HostValue::Int(v) => Some(*v as f64),
            HostValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            HostValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Short type name for layout diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            HostValue::Unit => "unit",
            HostValue::Bool(_) => "bool",
            HostValue::Int(_) => "int",
            HostValue::Float(_) => "float",
            HostValue::Text(_) => "text",
            HostValue::Entity(_) => "entity",
            HostValue::List(_) => "list",
        }
    }
}

/// Access to host internals.
///
/// Lookups are expensive (the host walks its class metadata); callers are
/// expected to memoize them through
/// [`SymbolCache`](crate::adapter::SymbolCache).
pub trait HostBridge: Send + Sync {
    /// The version string the host reports about itself, e.g.
    /// `1.21.1-R0.1-SNAPSHOT`.
    fn version_string(&self) -> String;

    /// Find a symbol. `None` when this host build has no such symbol.
    fn lookup_symbol(&self, owner: &str, name: &str) -> Option<SymbolRef>;

    /// Call a symbol.
    fn invoke(&self, symbol: &SymbolRef, args: &[HostValue]) -> Result<HostValue, HostFault>;
}
