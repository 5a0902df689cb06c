#![allow(dead_code)]

pub mod test_context;
pub mod test_util;
