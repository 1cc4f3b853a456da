pub mod liveness;
