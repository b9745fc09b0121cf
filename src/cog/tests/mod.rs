//! Tests for the COG rewriting engine

mod field_tests;
mod ifd_tests;
