use std::any::{Any, TypeId};
use std::collections::HashMap;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{CodecError, RegistryError, Result};
use crate::packet::Packet;
use crate::value::Value;

type EncodeFn = fn(&(dyn Any + Send)) -> serde_json::Result<serde_json::Value>;
type DecodeFn = fn(serde_json::Value) -> serde_json::Result<Value>;

struct Entry {
    name: String,
    rust_name: &'static str,
    encode: EncodeFn,
    decode: DecodeFn,
}

/// Registry of the concrete types allowed to cross a stream.
///
/// Every type must be registered on both ends before it is first sent.
/// The wire name chosen at registration is what the receiving side looks up,
/// so both ends must agree on it.
pub struct TypeRegistry {
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
    by_type: HashMap<TypeId, usize>,
}

impl TypeRegistry {
    /// Create a registry preloaded with primitive and common container types.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.insert::<bool>("bool");
        registry.insert::<i8>("i8");
        registry.insert::<i16>("i16");
        registry.insert::<i32>("i32");
        registry.insert::<i64>("i64");
        registry.insert::<u8>("u8");
        registry.insert::<u16>("u16");
        registry.insert::<u32>("u32");
        registry.insert::<u64>("u64");
        registry.insert::<f32>("f32");
        registry.insert::<f64>("f64");
        registry.insert::<char>("char");
        registry.insert::<()>("unit");
        registry.insert::<String>("string");
        registry.insert::<Vec<u8>>("bytes");
        registry.insert::<Vec<String>>("list<string>");
        registry.insert::<Vec<i64>>("list<i64>");
        registry.insert::<HashMap<String, String>>("map<string,string>");
        registry.insert::<HashMap<String, i64>>("map<string,i64>");
        registry.insert::<serde_json::Value>("json");
        registry
    }

    /// Create a registry with no types at all.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
            by_type: HashMap::new(),
        }
    }

    /// Register `T` under an explicit wire name.
    pub fn register<T>(&mut self, name: &str) -> std::result::Result<(), RegistryError>
    where
        T: Serialize + DeserializeOwned + Any + Send,
    {
        if self.by_name.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        if let Some(&idx) = self.by_type.get(&TypeId::of::<T>()) {
            return Err(RegistryError::DuplicateType {
                type_name: std::any::type_name::<T>(),
                registered_as: self.entries[idx].name.clone(),
            });
        }
        self.insert::<T>(name);
        debug!(name, rust_type = std::any::type_name::<T>(), "registered value type");
        Ok(())
    }

    /// Register `T` under its Rust type name.
    pub fn register_type<T>(&mut self) -> std::result::Result<(), RegistryError>
    where
        T: Serialize + DeserializeOwned + Any + Send,
    {
        self.register::<T>(std::any::type_name::<T>())
    }

    fn insert<T>(&mut self, name: &str)
    where
        T: Serialize + DeserializeOwned + Any + Send,
    {
        let idx = self.entries.len();
        self.entries.push(Entry {
            name: name.to_string(),
            rust_name: std::any::type_name::<T>(),
            encode: encode_as::<T>,
            decode: decode_as::<T>,
        });
        self.by_name.insert(name.to_string(), idx);
        self.by_type.insert(TypeId::of::<T>(), idx);
    }

    /// Check if `T` has been registered.
    pub fn is_registered<T: Any>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    /// Check if a wire name has been registered.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Wire name registered for `T`.
    pub fn name_of<T: Any>(&self) -> Option<&str> {
        self.by_type
            .get(&TypeId::of::<T>())
            .map(|&idx| self.entries[idx].name.as_str())
    }

    /// Registered wire names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.iter().map(|e| e.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Wrap a value in a packet.
    pub fn encode(&self, value: &Value) -> Result<Packet> {
        let entry = self
            .by_type
            .get(&value.type_id())
            .map(|&idx| &self.entries[idx])
            .ok_or(CodecError::UnregisteredType(value.type_name()))?;

        let body = (entry.encode)(value.as_any()).map_err(|source| CodecError::Encode {
            type_name: entry.name.clone(),
            source,
        })?;
        Ok(Packet::new(entry.name.clone(), body))
    }

    /// Unwrap the value carried by a packet.
    pub fn decode(&self, packet: Packet) -> Result<Value> {
        let entry = self
            .by_name
            .get(&packet.type_name)
            .map(|&idx| &self.entries[idx])
            .ok_or_else(|| CodecError::UnknownType(packet.type_name.clone()))?;

        (entry.decode)(packet.value).map_err(CodecError::Decode)
    }

    /// Encode a value straight to a frame body.
    pub fn to_bytes(&self, value: &Value) -> Result<Bytes> {
        self.encode(value)?.to_bytes()
    }

    /// Decode a value straight from a frame body.
    pub fn from_slice(&self, body: &[u8]) -> Result<Value> {
        self.decode(Packet::from_slice(body)?)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|e| (&e.name, e.rust_name)))
            .finish()
    }
}

fn encode_as<T: Serialize + Any>(value: &(dyn Any + Send)) -> serde_json::Result<serde_json::Value> {
    match value.downcast_ref::<T>() {
        Some(value) => serde_json::to_value(value),
        None => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
            "value is not a {}",
            std::any::type_name::<T>()
        ))),
    }
}

fn decode_as<T: DeserializeOwned + Any + Send>(body: serde_json::Value) -> serde_json::Result<Value> {
    serde_json::from_value::<T>(body).map(Value::new)
}
