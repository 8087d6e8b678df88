//! Structured logging schema.
//!
//! Every crate logs with `tracing` macros using the same field names, so log
//! aggregation can query across subsystems.
//!
//! ## Fields
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `request_id` | UUIDv7 correlation id set by the HTTP layer |
//! | `subsystem` | `api`, `auth`, `crud`, `search`, `database`, `format` |
//! | `component` | part of a subsystem, e.g. `jwt`, `pool`, `memory_store` |
//! | `op` | operation name, e.g. `create`, `import`, `search` |
//! | `anno_id`, `user_id`, `consumer_key` | entities involved |
//! | `duration_ms`, `result_count`, `total`, `failed_count` | measurements |
//! | `error` | failure message |
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), rejected requests |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration (search rows, batch items) |
