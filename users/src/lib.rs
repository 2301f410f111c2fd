pub mod lost_password_hash;

pub use lost_password_hash::{RecoveryMode, RpcLostPasswordHash};
