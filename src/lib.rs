pub mod background;
pub mod commands;
pub mod detect;
pub mod dna;
pub mod errs;
pub mod logging;
pub mod monoid;
pub mod pileup;
pub mod position_filter;
pub mod stream_aligner;
pub mod util;
pub mod writers;

pub(crate) mod parsing_utils;
