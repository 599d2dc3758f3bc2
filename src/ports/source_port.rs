//! Source export access port trait.

use crate::domain::account::{RawRecord, SourceFormat};
use crate::domain::error::ImportError;
use std::path::Path;

pub trait SourcePort {
    /// Read and normalize one export.
    ///
    /// Fails with [`ImportError::SourceNotFound`] when nothing exists at
    /// `location` and [`ImportError::SourceFormat`] when expected fields are
    /// missing or unparsable.
    fn read_source(
        &self,
        account: &str,
        location: &Path,
        format: SourceFormat,
    ) -> Result<Vec<RawRecord>, ImportError>;
}
