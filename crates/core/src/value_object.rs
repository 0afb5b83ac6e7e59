//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value** — two value
/// objects with the same attribute values are equal. To "modify" one, build a
/// new one with the new values.
///
/// Contrast with [`crate::Entity`]: an entity has identity (two entities with
/// the same id are the same entity); a value object has none.
///
/// ```ignore
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// struct Rate(u64);
///
/// impl ValueObject for Rate {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
