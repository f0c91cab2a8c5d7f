mod raw_nano;

pub use raw_nano::{RawNano, RawNanoConversionError, NANO_CURRENCY_CODE, RAW_PER_NANO};
