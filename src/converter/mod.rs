pub mod grayscale;

pub use grayscale::{desaturate, ConversionOutcome, GrayscaleConverter};
