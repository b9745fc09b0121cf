//! Tests for the TIFF parsing module
