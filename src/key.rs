//! Dependency keys and scope tags

use std::{
    any::{type_name, TypeId},
    borrow::Cow,
    fmt,
};

/// An opaque identifier a registration is looked up by.
///
/// A key is either a name (`"logger"`, `"ILogger"`) or a type reference.
/// Keys compare by identity: two `Name` keys are equal iff their strings are
/// equal, two `Type` keys are equal iff they refer to the same Rust type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DependencyKey {
    /// A named key.
    Name(Cow<'static, str>),
    /// A key derived from a Rust type.
    Type {
        id: TypeId,
        name: &'static str,
    },
}

impl DependencyKey {
    /// Creates a key that refers to the type `T`.
    #[inline]
    pub fn of<T: 'static>() -> Self {
        Self::Type {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }
}

impl From<&'static str> for DependencyKey {
    #[inline]
    fn from(name: &'static str) -> Self {
        Self::Name(Cow::Borrowed(name))
    }
}

impl From<String> for DependencyKey {
    #[inline]
    fn from(name: String) -> Self {
        Self::Name(Cow::Owned(name))
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyKey::Name(name) => f.write_str(name),
            DependencyKey::Type { name, .. } => f.write_str(name),
        }
    }
}

/// A label that restricts which containers may resolve a registration.
///
/// A registration tagged `{"child"}` is only visible to containers whose own
/// tag set intersects `{"child"}`; untagged registrations are visible
/// everywhere along the ancestor chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(Cow<'static, str>);

impl Tag {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for Tag {
    #[inline]
    fn from(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }
}

impl From<String> for Tag {
    #[inline]
    fn from(tag: String) -> Self {
        Self(Cow::Owned(tag))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
