//! Transport Adapter - reqwest 实现与测试用实现

mod fake_transport;
mod reqwest_transport;

pub use fake_transport::{FakeReply, FakeTransport};
pub use reqwest_transport::{ReqwestTransport, ReqwestTransportConfig};
