//! E2E tests for the decode pass: build synthetic BIFF workbook streams,
//! run them through XlsReader, and assert on the emitted events.

mod common;
mod reading;

pub use common::*;
