#![allow(dead_code)]

pub use buildgraph_test_utils::builders;
pub use buildgraph_test_utils::fake_launcher::FakeLauncher;
pub use buildgraph_test_utils::{init_tracing, with_timeout};
