use std::any::{Any, TypeId};

/// One property of an entity's primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyProperty {
    name: String,
}

impl KeyProperty {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered, non-empty primary-key property set of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyShape {
    properties: Vec<KeyProperty>,
}

impl KeyShape {
    /// Returns `None` for an empty property list; a key with no
    /// components is the same as no key at all.
    pub fn new(properties: Vec<KeyProperty>) -> Option<Self> {
        if properties.is_empty() {
            None
        } else {
            Some(Self { properties })
        }
    }

    pub fn properties(&self) -> &[KeyProperty] {
        &self.properties
    }

}

/// Relationship edge from one entity type to another.
///
/// `prevent_cycle` marks a back-edge that eager-load path traversal must
/// never follow; it is the only protection against infinite descent in a
/// cyclic relationship graph.
#[derive(Debug, Clone)]
pub struct Navigation {
    name: String,
    target: TypeId,
    prevent_cycle: bool,
}

impl Navigation {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> TypeId {
        self.target
    }

    pub fn prevents_cycle(&self) -> bool {
        self.prevent_cycle
    }
}

/// Static metadata of one modeled persistent type: its diagnostic name,
/// declared primary key and outgoing relationship edges.
///
/// Navigation order is declaration order and is assumed stable for the
/// process lifetime; eager-load path ordering follows it.
#[derive(Debug, Clone)]
pub struct EntityType {
    type_id: TypeId,
    name: String,
    primary_key: Option<KeyShape>,
    navigations: Vec<Navigation>,
}

impl EntityType {
    pub fn new<T: Any>(name: impl Into<String>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: name.into(),
            primary_key: None,
            navigations: Vec::new(),
        }
    }

    /// Declare the primary key as an ordered list of property names.
    /// An empty list leaves the type without a key.
    pub fn with_key<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let properties = properties.into_iter().map(KeyProperty::new).collect();
        self.primary_key = KeyShape::new(properties);
        self
    }

    /// Declare a relationship edge to `T`.
    pub fn with_navigation<T: Any>(self, name: impl Into<String>) -> Self {
        self.push_navigation(name.into(), TypeId::of::<T>(), false)
    }

    /// Declare a relationship edge to `T` that path traversal must not
    /// follow (a cycle-breaking back-edge).
    pub fn with_cycle_prevented_navigation<T: Any>(self, name: impl Into<String>) -> Self {
        self.push_navigation(name.into(), TypeId::of::<T>(), true)
    }

    fn push_navigation(mut self, name: String, target: TypeId, prevent_cycle: bool) -> Self {
        self.navigations.push(Navigation {
            name,
            target,
            prevent_cycle,
        });
        self
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> Option<&KeyShape> {
        self.primary_key.as_ref()
    }

    pub fn navigations(&self) -> &[Navigation] {
        &self.navigations
    }
}
