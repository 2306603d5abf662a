//! Yggdrasil admin socket — JSON-RPC over a Unix domain socket.
//!
//! ```text
//! ┌──────────────┐   connect / request\n / response / close   ┌──────────────┐
//! │ AdminClient  │───────────────────────────────────────────▶│  yggdrasil   │
//! │ (per call)   │         one JSON object each way            │ admin socket │
//! └──────────────┘                                             └──────────────┘
//! ```

pub mod client;
pub mod protocol;
pub mod types;

pub use client::{AdminClient, AdminError, DEFAULT_RPC_TIMEOUT, call};
pub use protocol::{Frame, FrameError, RpcOutcome, RpcRequest, RpcResponse, decode_response};
pub use types::{PeerInfo, SelfInfo};
