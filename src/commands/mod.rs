//! Command Dispatch Module
//!
//! This module resolves command names to handlers. Command sets are
//! independent providers composed into an ordered chain; none of them needs
//! to know about the others.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  FrameReader    │  (protocol module)
//! └────────┬────────┘
//!          │  "SET" + [key, value]
//!          ▼
//! ┌─────────────────┐
//! │  HandlerChain   │  (this module)
//! │                 │
//! │  - Resolve      │  first provider that knows the name
//! │  - Validate     │  arguments must be bulk strings
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ Provider        │  CommandTable, bind_methods!, ...
//! └─────────────────┘
//! ```

pub mod builtin;
pub mod chain;
pub mod handler;
pub mod table;

pub use builtin::ServerCommands;
pub use chain::{ChainOrder, DispatchError, HandlerChain};
pub use handler::{Handler, HandlerError, HandlerFn, HandlerResult};
pub use table::{CommandTable, Provider};
