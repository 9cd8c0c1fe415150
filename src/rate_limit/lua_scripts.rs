/// Lua script for atomic increment-and-expire in Redis
///
/// Runs as a single server-side step, so concurrent callers always observe
/// distinct post-increment values.
///
/// KEYS[1] = the window key
/// ARGV[1] = expiry (milliseconds)
///
/// Returns: the post-increment counter value
pub const INCREMENT_AND_EXPIRE_SCRIPT: &str = r#"
local key = KEYS[1]
local ttl_ms = tonumber(ARGV[1])

local current = redis.call('INCR', key)
redis.call('PEXPIRE', key, ttl_ms)

return current
"#;
