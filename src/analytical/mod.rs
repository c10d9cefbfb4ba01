//! This module contains closed-form solutions for verification

mod ring_with_fibers;
pub use ring_with_fibers::*;
