//! Query boundary trait

use crate::decode::Event;
use crate::error::Result;

/// The boundary to a continuous query engine
///
/// The pull engine never inspects query semantics. It feeds events, asks
/// whether the query has finished, signals end of input, and saves or loads
/// the engine's opaque state.
pub trait QueryAdapter: Send {
    /// Replace all in-memory state with `checkpoint`, or reset to a fresh
    /// query when `None`
    fn restore(&mut self, checkpoint: Option<&[u8]>) -> Result<()>;

    /// Feed one event (data or punctuation)
    fn submit(&mut self, event: Event) -> Result<()>;

    /// Signal that no further input will ever arrive
    fn complete(&mut self) -> Result<()>;

    /// Check if the query has produced its final result
    fn is_complete(&self) -> bool;

    /// Serialize the current state
    fn checkpoint(&self) -> Result<Vec<u8>>;
}
