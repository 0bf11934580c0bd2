//! Test suites for the driver daemon.

pub(crate) mod support;
