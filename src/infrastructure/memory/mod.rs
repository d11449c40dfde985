//! Memory Layer - In-Memory State
//!
//! 进程内的令牌与偏好存储

mod token_store;

pub use token_store::InMemoryTokenStore;
