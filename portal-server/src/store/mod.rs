//! 成员记录存储
//!
//! - [`MembershipStore`] - 存储契约（外部协作者）
//! - [`InMemoryMembershipStore`] - 内存实现

mod membership;

pub use membership::{InMemoryMembershipStore, MembershipStore, validate_upsert};
