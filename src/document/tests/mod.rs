//! Tests for document loading, saving and playback.
//!
//! These cover the whole load path (parse, normalize, typed model) and
//! round-trips through the serializer.

mod load_tests;
