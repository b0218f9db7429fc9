use std::{
    any::{Any, TypeId},
    collections::HashMap,
    hash::{BuildHasherDefault, Hasher},
};

use trackable_common::rpc::{RpcError, RpcErrorCode};

// `TypeId` hashes through `write_u64` only, so the value is already a hash
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHasher(u64);

impl Hasher for NoOpHasher {
    fn write(&mut self, _bytes: &[u8]) {}

    fn write_u64(&mut self, i: u64) {
        self.0 = i;
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

/// Values a command handler can reach: the application, the caller's role
/// and, on the websocket transport, the caller's subscription.
pub struct Context {
    values: HashMap<TypeId, Box<dyn Any + Send + Sync>, BuildHasherDefault<NoOpHasher>>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            values: HashMap::default(),
        }
    }

    pub fn store<T: Send + Sync + 'static>(&mut self, data: T) {
        self.values.insert(TypeId::of::<T>(), Box::new(data));
    }

    pub fn remove<T: 'static>(&mut self) {
        self.values.remove(&TypeId::of::<T>());
    }

    pub fn has<T: 'static>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }

    pub fn get_optional<T: 'static>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref())
    }

    pub fn get<T: 'static>(&self) -> Result<&T, RpcError> {
        self.get_optional()
            .ok_or_else(|| RpcError::with_message(RpcErrorCode::Internal, "Requested type not found"))
    }

    pub fn get_copy<T: 'static + Copy>(&self) -> Result<T, RpcError> {
        self.get().copied()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
