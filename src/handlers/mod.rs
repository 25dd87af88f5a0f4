// handlers/mod.rs - route handlers, grouped by the feature or capability they expose
//
// Global:   GET /, GET /health
// Tenant:   api/v1/app, api/v1/auth/*, api/v1/profile(s), api/v1/data/:table,
//           api/v1/storage/:bucket, and the gated products/checkout/courses/schedule
//
// Routing and middleware layering live in `crate::app`.

pub mod auth;
pub mod data;
pub mod domain;
pub mod profile;
pub mod storage;
pub mod system;
