//! Errors surfaced by the machine facade.

use std::path::PathBuf;

use format_spectrum_tap::TapError;
use thiserror::Error;

use crate::config::SpectrumModel;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported machine model {model:?}")]
    Configuration { model: SpectrumModel },

    #[error("invalid tape image: {0}")]
    TapeFormat(#[from] TapError),

    #[error("machine has been destroyed")]
    UseAfterDestroy,

    #[error("no machine selected")]
    NoMachineSelected,

    #[error("failed to read ROM {}: {source}", path.display())]
    Rom {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ROM {index} is {actual} bytes, expected {expected}")]
    RomSize {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
