/// 通用工具模块
/// Common utilities

pub mod clock;
pub mod encryption;
pub mod random;

// 重新导出主要的公共接口
pub use clock::{Clock, FixedClock, SystemClock};
pub use encryption::{Bcrypter, HashError, Hasher, HasherConfig, Verifier};
pub use random::random_string;
