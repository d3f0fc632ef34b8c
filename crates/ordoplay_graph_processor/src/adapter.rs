// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cross-type port value adapters.
//!
//! The registry maps an exact `(from, to)` type pair to a conversion
//! function. Pairs on the incompatible list are never assignable, even when
//! a conversion exists for them. Conversions are not chained.
//!
//! The registry is built once at startup and shared by reference
//! (usually behind an `Arc`) with every processor.

use crate::error::AdapterError;
use crate::port::{PortType, PortValue};
use indexmap::{IndexMap, IndexSet};
use std::fmt;
use std::sync::Arc;

/// Pure single-argument conversion; `None` rejects the value
pub type Conversion = Arc<dyn Fn(&PortValue) -> Option<PortValue> + Send + Sync>;

/// Registry of conversions between port value types
#[derive(Clone, Default)]
pub struct TypeAdapterRegistry {
    conversions: IndexMap<(PortType, PortType), Conversion>,
    incompatible: IndexSet<(PortType, PortType)>,
}

impl TypeAdapterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in numeric, vector and string conversions
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(PortType::Int, PortType::Float, |v| v.as_int().map(|i| PortValue::Float(i as f64)));
        registry.register(PortType::Float, PortType::Int, |v| {
            v.as_float().map(|f| PortValue::Int(f.round() as i64))
        });

        registry.register(PortType::Bool, PortType::Int, |v| v.as_bool().map(|b| PortValue::Int(i64::from(b))));
        registry.register(PortType::Int, PortType::Bool, |v| v.as_int().map(|i| PortValue::Bool(i != 0)));

        // Scalars splat into vectors, vectors truncate to their first component
        registry.register(PortType::Float, PortType::Vector2, |v| {
            v.as_float().map(|f| PortValue::Vector2([f as f32; 2]))
        });
        registry.register(PortType::Vector2, PortType::Float, |v| match v {
            PortValue::Vector2(xy) => Some(PortValue::Float(f64::from(xy[0]))),
            _ => None,
        });
        registry.register(PortType::Float, PortType::Vector3, |v| {
            v.as_float().map(|f| PortValue::Vector3([f as f32; 3]))
        });
        registry.register(PortType::Vector3, PortType::Float, |v| match v {
            PortValue::Vector3(xyz) => Some(PortValue::Float(f64::from(xyz[0]))),
            _ => None,
        });
        registry.register(PortType::Float, PortType::Vector4, |v| {
            v.as_float().map(|f| PortValue::Vector4([f as f32; 4]))
        });
        registry.register(PortType::Vector4, PortType::Float, |v| match v {
            PortValue::Vector4(xyzw) => Some(PortValue::Float(f64::from(xyzw[0]))),
            _ => None,
        });

        registry.register(PortType::Vector2, PortType::Vector3, |v| match v {
            PortValue::Vector2([x, y]) => Some(PortValue::Vector3([*x, *y, 0.0])),
            _ => None,
        });
        registry.register(PortType::Vector3, PortType::Vector2, |v| match v {
            PortValue::Vector3([x, y, _]) => Some(PortValue::Vector2([*x, *y])),
            _ => None,
        });
        registry.register(PortType::Vector3, PortType::Vector4, |v| match v {
            PortValue::Vector3([x, y, z]) => Some(PortValue::Vector4([*x, *y, *z, 0.0])),
            _ => None,
        });
        registry.register(PortType::Vector4, PortType::Vector3, |v| match v {
            PortValue::Vector4([x, y, z, _]) => Some(PortValue::Vector3([*x, *y, *z])),
            _ => None,
        });

        registry.register(PortType::Color, PortType::Vector4, |v| match v {
            PortValue::Color(rgba) => Some(PortValue::Vector4(*rgba)),
            _ => None,
        });
        registry.register(PortType::Vector4, PortType::Color, |v| match v {
            PortValue::Vector4(xyzw) => Some(PortValue::Color(*xyzw)),
            _ => None,
        });

        registry.register(PortType::Int, PortType::String, |v| Some(PortValue::String(v.to_string())));
        registry.register(PortType::String, PortType::Int, |v| {
            v.as_str().and_then(|s| s.trim().parse().ok()).map(PortValue::Int)
        });
        registry.register(PortType::Float, PortType::String, |v| Some(PortValue::String(v.to_string())));
        registry.register(PortType::String, PortType::Float, |v| {
            v.as_str().and_then(|s| s.trim().parse().ok()).map(PortValue::Float)
        });
        registry.register(PortType::Bool, PortType::String, |v| Some(PortValue::String(v.to_string())));
        registry.register(PortType::String, PortType::Bool, |v| {
            v.as_str().and_then(|s| s.trim().parse().ok()).map(PortValue::Bool)
        });

        registry
    }

    /// Register a conversion for the exact pair `(from, to)`
    pub fn register<F>(&mut self, from: PortType, to: PortType, convert: F)
    where
        F: Fn(&PortValue) -> Option<PortValue> + Send + Sync + 'static,
    {
        if self.conversions.insert((from.clone(), to.clone()), Arc::new(convert)).is_some() {
            tracing::debug!("Replaced conversion {from} -> {to}");
        }
    }

    /// Mark a pair as incompatible; overrides present and future conversions.
    ///
    /// Incompatibility is checked in both directions.
    pub fn mark_incompatible(&mut self, a: PortType, b: PortType) {
        self.incompatible.insert((a, b));
    }

    /// Whether the pair is on the incompatible list, in either order
    pub fn are_incompatible(&self, a: &PortType, b: &PortType) -> bool {
        self.incompatible.contains(&(a.clone(), b.clone())) || self.incompatible.contains(&(b.clone(), a.clone()))
    }

    /// Whether a conversion is registered for the exact pair
    pub fn has_conversion(&self, from: &PortType, to: &PortType) -> bool {
        self.conversions.contains_key(&(from.clone(), to.clone()))
    }

    /// Whether a value of type `from` can feed a port of type `to`
    pub fn are_assignable(&self, from: &PortType, to: &PortType) -> bool {
        if self.are_incompatible(from, to) {
            return false;
        }
        if from == to {
            return true;
        }
        // Flow never mixes with data
        if from.is_flow() || to.is_flow() {
            return false;
        }
        if matches!(from, PortType::Any) || matches!(to, PortType::Any) {
            return true;
        }
        self.has_conversion(from, to)
    }

    /// Convert a value to `target`
    pub fn convert(&self, value: &PortValue, target: &PortType) -> Result<PortValue, AdapterError> {
        let from = value.port_type();
        if self.are_incompatible(&from, target) {
            return Err(AdapterError::Incompatible { from, to: target.clone() });
        }
        if &from == target || matches!(target, PortType::Any) {
            return Ok(value.clone());
        }

        let Some(convert) = self.conversions.get(&(from.clone(), target.clone())) else {
            return Err(AdapterError::MissingConversion { from, to: target.clone() });
        };
        convert(value).ok_or_else(|| AdapterError::Rejected { from, to: target.clone() })
    }

    /// Registered pairs whose reverse direction is missing
    pub fn asymmetric_pairs(&self) -> Vec<(PortType, PortType)> {
        self.conversions
            .keys()
            .filter(|(from, to)| !self.conversions.contains_key(&(to.clone(), from.clone())))
            .cloned()
            .collect()
    }

    /// Report asymmetric conversions; returns how many were found
    pub fn validate(&self) -> usize {
        let asymmetric = self.asymmetric_pairs();
        for (from, to) in &asymmetric {
            tracing::warn!("Conversion {from} -> {to} has no matching {to} -> {from}");
        }
        asymmetric.len()
    }

    /// Number of registered conversions
    pub fn len(&self) -> usize {
        self.conversions.len()
    }

    /// Whether no conversion is registered
    pub fn is_empty(&self) -> bool {
        self.conversions.is_empty()
    }
}

impl fmt::Debug for TypeAdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeAdapterRegistry")
            .field("conversions", &self.conversions.keys().collect::<Vec<_>>())
            .field("incompatible", &self.incompatible)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_type_is_assignable() {
        let registry = TypeAdapterRegistry::with_defaults();
        for port_type in [PortType::Bool, PortType::Int, PortType::Float, PortType::Color, PortType::String] {
            assert!(registry.are_assignable(&port_type, &port_type));
        }
        assert!(registry.are_assignable(&PortType::Exec, &PortType::Exec));
        assert!(!registry.are_assignable(&PortType::Exec, &PortType::Any));
    }

    #[test]
    fn test_incompatible_overrides_conversion() {
        let mut registry = TypeAdapterRegistry::with_defaults();
        assert!(registry.are_assignable(&PortType::Int, &PortType::Float));

        registry.mark_incompatible(PortType::Int, PortType::Float);
        assert!(!registry.are_assignable(&PortType::Int, &PortType::Float));
        assert_eq!(
            registry.convert(&PortValue::Int(1), &PortType::Float),
            Err(AdapterError::Incompatible { from: PortType::Int, to: PortType::Float })
        );

        // Registering again afterwards does not lift the ban
        registry.register(PortType::Int, PortType::Float, |v| v.as_float().map(PortValue::Float));
        assert!(!registry.are_assignable(&PortType::Int, &PortType::Float));
    }

    #[test]
    fn test_convert() {
        let registry = TypeAdapterRegistry::with_defaults();
        assert_eq!(registry.convert(&PortValue::Int(2), &PortType::Float), Ok(PortValue::Float(2.0)));
        assert_eq!(
            registry.convert(&PortValue::String("42".into()), &PortType::Int),
            Ok(PortValue::Int(42))
        );
        assert_eq!(
            registry.convert(&PortValue::String("nope".into()), &PortType::Int),
            Err(AdapterError::Rejected { from: PortType::String, to: PortType::Int })
        );
    }

    #[test]
    fn test_no_transitive_conversion() {
        let registry = TypeAdapterRegistry::with_defaults();
        // Bool -> Int -> Float exists as two hops, but not as one
        assert!(!registry.are_assignable(&PortType::Bool, &PortType::Float));
        assert_eq!(
            registry.convert(&PortValue::Bool(true), &PortType::Float),
            Err(AdapterError::MissingConversion { from: PortType::Bool, to: PortType::Float })
        );
    }

    #[test]
    fn test_asymmetry_is_reported() {
        let mut registry = TypeAdapterRegistry::with_defaults();
        assert_eq!(registry.validate(), 0);

        let meters = PortType::Custom("Meters".to_string());
        registry.register(meters.clone(), PortType::Float, |v| match v {
            PortValue::Custom { data, .. } => data.parse().ok().map(PortValue::Float),
            _ => None,
        });
        assert_eq!(registry.asymmetric_pairs(), vec![(meters, PortType::Float)]);
        assert_eq!(registry.validate(), 1);
    }
}
