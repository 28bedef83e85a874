pub mod comments;
pub mod mongo;
pub mod redis;
pub mod users;

pub use comments::{CommentRepository, MongoCommentStore};
pub use mongo::connect;
pub use self::redis::create_redis_client;
pub use self::redis::Cache;
pub use self::redis::CacheKey;
pub use self::redis::CacheWriterHandle;
pub use users::{MongoUserStore, UserRepository};
