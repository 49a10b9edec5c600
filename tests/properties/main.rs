//! Property test harness.

mod merge_props;
