//! Session source trait definition

use crate::model::SessionDocument;
use anyhow::Result;

/// Trait for anything that can materialize a recorded session
///
/// Each source is responsible for:
/// - Locating and parsing its input (file, bytes, generator)
/// - Converting it to the unified [`SessionDocument`]
/// - Rejecting documents that fail [`SessionDocument::validate`]
///
/// Loading is a one-shot operation. A failure here is terminal for the
/// replay that asked for it; nothing retries.
pub trait SessionSource: Send {
    /// Name of this source (e.g. "Demo", a file name)
    fn name(&self) -> &str;

    /// Produce a fully-formed, validated session document
    fn load(&mut self) -> Result<SessionDocument>;
}
