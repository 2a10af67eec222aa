//! Unit tests for the export document and the serializer.
//!
//! These tests verify document encoding, lenient decoding of optional
//! fields, and round-trip conversions through the serializer.

mod roundtrip_tests;
mod serializer_tests;
