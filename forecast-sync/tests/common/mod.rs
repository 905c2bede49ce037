//! Shared fakes and builders for the sync integration tests.

#![allow(dead_code)]

pub mod engine;
pub mod records;
