#![allow(dead_code)]

pub use pollwatch_test_utils::{builders, fake_runner, init_tracing, with_timeout};
