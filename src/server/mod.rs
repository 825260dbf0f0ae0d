mod routes;

pub use routes::{create_router, create_router_with_name, NodeState};
