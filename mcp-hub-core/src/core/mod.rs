pub mod base;
// per-client call rings and the cross-client error log
pub mod stat;
pub mod circuitbreaker;
pub mod dispatch;
// aggregation over recorder snapshots
pub mod metric;
pub mod cache;
pub mod config;
pub mod mq;
// snapshot history, trends and the snapshot ticker
pub mod report;
