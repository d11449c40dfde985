//! Sled Persistence - 客户端本地状态

mod local_store;

pub use local_store::{SledLocalStore, SledStoreConfig};
