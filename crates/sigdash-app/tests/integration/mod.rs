//! Integration tests for sigdash-app.
//!
//! These tests run the real REST client and push transport against
//! in-process mock servers:
//! - Socket.IO / JSON push lifecycle
//! - Snapshot bootstrap, push dedup and mode toggle end to end

pub mod common;
