// Copyright 2025 mtrefresh Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! mtrefresh Common Types and Transport
//!
//! Shared building blocks for the mount table refresh system:
//!
//! - **Protocol Layer**: JSON-RPC 2.0 request/response types and the
//!   crate-wide [`RefreshError`]
//! - **Transport Layer**: helpers for carrying JSON-RPC over HTTP/1.1
//! - **Mount Table**: the in-memory mount table a router serves and reloads
//!
//! # Components
//!
//! - [`protocol`] - JSON-RPC types and error handling
//! - [`transport`] - HTTP conversion helpers
//! - [`mount_table`] - mount entries with versioned reloads

pub mod mount_table;
pub mod protocol;
pub mod transport;

pub use mount_table::{MountEntry, MountTable};
pub use protocol::*;
