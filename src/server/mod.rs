//! HTTP registration layer.
//!
//! Exposes the conversion as a remotely invokable operation. The registry
//! describes each operation's typed parameters; the router dispatches
//! invocations to the [`crate::convert::Converter`].

pub mod handlers;
pub mod operations;
pub mod routes;

pub use handlers::{
    convert_handler, error_status, health_handler, operations_handler, AppState,
    ConvertResponse, ErrorResponse, HealthResponse, OperationsResponse,
};
pub use operations::{
    convert_operation, OperationDefinition, OperationRegistry, ParamDefinition, ValueKind,
    CONVERT_OPERATION,
};
pub use routes::{create_router, RouterConfig};
