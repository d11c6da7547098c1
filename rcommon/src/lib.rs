//! Shared utilities and strongly-typed common values for the relay crates.
//!
//! ```rust
//! use rcommon::{GenerationOptions, OrderedRegistry, SessionId};
//!
//! let session = SessionId::from("session-1");
//! let options = GenerationOptions::default().with_max_tokens(2024);
//!
//! let mut registry = OrderedRegistry::new();
//! registry.insert("search_papers".to_string(), "research");
//!
//! assert_eq!(session.as_str(), "session-1");
//! assert_eq!(options.max_tokens, Some(2024));
//! assert_eq!(registry.get("search_papers"), Some(&"research"));
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use rcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Session and trace identifier newtypes shared across crates.
    //!
    //! ```rust
    //! use rcommon::{SessionId, TraceId};
    //!
    //! let session = SessionId::new("session-42");
    //! let trace = TraceId::from("trace-42");
    //!
    //! assert_eq!(session.to_string(), "session-42");
    //! assert_eq!(trace.as_str(), "trace-42");
    //! ```

    use std::fmt::{Display, Formatter};

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct SessionId(String);

    impl SessionId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for SessionId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for SessionId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for SessionId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct TraceId(String);

    impl TraceId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for TraceId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<&str> for TraceId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }
}

pub mod model {
    //! Generation settings carried on model requests.

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct GenerationOptions {
        pub temperature: Option<f32>,
        pub max_tokens: Option<u32>,
    }

    impl GenerationOptions {
        pub fn with_temperature(mut self, temperature: f32) -> Self {
            self.temperature = Some(temperature);
            self
        }

        pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
            self.max_tokens = Some(max_tokens);
            self
        }
    }
}

pub mod registry {
    //! Insertion-ordered registry with last-write-wins replacement.
    //!
    //! Re-inserting an existing key replaces the value in its original slot,
    //! so iteration order reflects first registration and no key appears twice.
    //!
    //! ```rust
    //! use rcommon::OrderedRegistry;
    //!
    //! let mut registry = OrderedRegistry::new();
    //! registry.insert("alpha".to_string(), 1_u32);
    //! registry.insert("beta".to_string(), 2_u32);
    //! let previous = registry.insert("alpha".to_string(), 3_u32);
    //!
    //! assert_eq!(previous, Some(1));
    //! assert_eq!(registry.values().copied().collect::<Vec<_>>(), vec![3, 2]);
    //! ```

    use std::borrow::Borrow;
    use std::collections::HashMap;
    use std::hash::Hash;

    #[derive(Debug, Clone)]
    pub struct OrderedRegistry<K, V> {
        index: HashMap<K, usize>,
        entries: Vec<(K, V)>,
    }

    impl<K, V> Default for OrderedRegistry<K, V>
    where
        K: Eq + Hash,
    {
        fn default() -> Self {
            Self {
                index: HashMap::new(),
                entries: Vec::new(),
            }
        }
    }

    impl<K, V> OrderedRegistry<K, V>
    where
        K: Eq + Hash + Clone,
    {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&mut self, key: K, value: V) -> Option<V> {
            if let Some(&slot) = self.index.get(&key) {
                return Some(std::mem::replace(&mut self.entries[slot].1, value));
            }

            self.index.insert(key.clone(), self.entries.len());
            self.entries.push((key, value));
            None
        }

        pub fn get<Q>(&self, key: &Q) -> Option<&V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.index.get(key).map(|&slot| &self.entries[slot].1)
        }

        pub fn contains_key<Q>(&self, key: &Q) -> bool
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.index.contains_key(key)
        }

        pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
            self.entries.iter().map(|(key, value)| (key, value))
        }

        pub fn keys(&self) -> impl Iterator<Item = &K> {
            self.entries.iter().map(|(key, _)| key)
        }

        pub fn values(&self) -> impl Iterator<Item = &V> {
            self.entries.iter().map(|(_, value)| value)
        }

        pub fn len(&self) -> usize {
            self.entries.len()
        }

        pub fn is_empty(&self) -> bool {
            self.entries.is_empty()
        }
    }
}

pub use context::{SessionId, TraceId};
pub use future::BoxFuture;
pub use model::GenerationOptions;
pub use registry::OrderedRegistry;
