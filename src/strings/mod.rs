//! Character classes and string recognizers used by the data analyzer and
//! by inline-data validation.

pub mod charset;
pub mod recognize;

pub use charset::{scan_test, CharTest};
pub use recognize::{
    count_character_bytes, count_high_low_bytes, recognize_dci_strings, recognize_len16_strings,
    recognize_len8_strings, recognize_null_terminated_strings, recognize_reverse_dci_strings,
    recognize_run, verify_fill_data, verify_string_data, HighLowCounts, StringVerifyError,
};
