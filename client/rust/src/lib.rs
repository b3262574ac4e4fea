//! Software-client library for the cosim bridge.
//!
//! A cosim bridge pairs a hardware simulator with external software over
//! addressed, typed endpoints. This crate is the software side: it defines
//! the wire protocol the bridge serves and provides async and blocking
//! clients over it.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cosim_bridge_client::CosimClient;
//!
//! async fn example() -> cosim_bridge_client::Result<()> {
//!     let mut client = CosimClient::connect("localhost:3789").await?;
//!
//!     for info in client.endpoints().await? {
//!         println!("endpoint {} send_type={:#x}", info.id, info.send_type_id);
//!     }
//!
//!     // Park until the simulator produces a message on endpoint 7.
//!     let message = client.recv(7).await?;
//!
//!     // Queue a message for the simulator to poll.
//!     client.send(7, vec![0x01, 0x02, 0x03, 0x04]).await?;
//!     Ok(())
//! }
//! ```

pub mod blocking;
pub mod client;
pub mod error;
pub mod wire;

// Re-export main types at crate root
pub use blocking::BlockingCosimClient;
pub use client::CosimClient;
pub use error::{ClientError, Result};
pub use wire::EndpointInfo;
