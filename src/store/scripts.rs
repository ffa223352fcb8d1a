//! The four atomic server-side scripts (C5), one per [`crate::rule::Strategy`].
//!
//! Each script is wrapped in a [`redis::Script`], which transparently caches
//! the script by its SHA1 digest and issues `EVALSHA`, falling back to a full
//! `EVAL` (and re-caching) on `NOSCRIPT` — this is the "registered and cached
//! by content hash" behavior required by §4.4, provided by the `redis` crate
//! itself rather than hand-rolled here.

use once_cell::sync::Lazy;
use redis::Script;

/// Sliding window: `KEYS[1]` = composite key, `ARGV` = `[now_ms, window_ms,
/// limit, increment]`. See §4.5 "Sliding window".
pub static SLIDING_WINDOW: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
local key = KEYS[1]
local now_ms = tonumber(ARGV[1])
local window_ms = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])
local increment = tonumber(ARGV[4])

local window_start = now_ms - window_ms
redis.call('ZREMRANGEBYSCORE', key, '-inf', window_start)

local current = redis.call('ZCARD', key)

if current + increment <= limit then
    for i = 1, increment do
        redis.call('ZADD', key, now_ms, now_ms .. '-' .. i .. '-' .. redis.sha1hex(tostring(math.random())))
    end
    redis.call('PEXPIRE', key, window_ms)
    return {1, limit - (current + increment), 0}
else
    local earliest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
    local retry_after = 0
    if #earliest > 0 then
        retry_after = math.max(0, math.ceil((tonumber(earliest[2]) + window_ms - now_ms) / 1000))
    end
    return {0, 0, retry_after}
end
"#,
    )
});

/// Fixed window: `KEYS[1]` = composite key, `ARGV` = `[window_s, limit,
/// increment]`. See §4.5 "Fixed window".
pub static FIXED_WINDOW: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
local key = KEYS[1]
local window_s = tonumber(ARGV[1])
local limit = tonumber(ARGV[2])
local increment = tonumber(ARGV[3])

local current = redis.call('GET', key)
if current and (tonumber(current) + increment > limit) then
    local ttl = redis.call('TTL', key)
    if ttl < 0 then ttl = window_s end
    return {0, 0, ttl}
end

local new_value = redis.call('INCRBY', key, increment)
if new_value == increment then
    redis.call('EXPIRE', key, window_s)
end
return {1, limit - new_value, 0}
"#,
    )
});

/// Token bucket: `KEYS[1]` = composite key, `ARGV` = `[now_s, fill_rate,
/// capacity, increment]`. See §4.5 "Token bucket".
pub static TOKEN_BUCKET: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
local key = KEYS[1]
local now_s = tonumber(ARGV[1])
local fill_rate = tonumber(ARGV[2])
local capacity = tonumber(ARGV[3])
local increment = tonumber(ARGV[4])

local state = redis.call('HMGET', key, 'tokens', 'last_refill')
local tokens = tonumber(state[1]) or capacity
local last_refill = tonumber(state[2]) or now_s

local elapsed = math.max(0, now_s - last_refill)
tokens = math.min(capacity, tokens + elapsed * fill_rate)

local allowed = 0
local retry_after = 0

if tokens >= increment then
    tokens = tokens - increment
    allowed = 1
else
    retry_after = math.ceil((increment - tokens) / fill_rate)
end

redis.call('HMSET', key, 'tokens', tokens, 'last_refill', now_s)
redis.call('EXPIRE', key, math.ceil(capacity / fill_rate) + 10)

return {allowed, math.floor(tokens), retry_after}
"#,
    )
});

/// Leaky bucket: `KEYS[1]` = composite key, `ARGV` = `[now_s, leak_rate,
/// capacity, increment]`. See §4.5 "Leaky bucket".
pub static LEAKY_BUCKET: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
local key = KEYS[1]
local now_s = tonumber(ARGV[1])
local leak_rate = tonumber(ARGV[2])
local capacity = tonumber(ARGV[3])
local increment = tonumber(ARGV[4])

local state = redis.call('HMGET', key, 'level', 'last_leak')
local level = tonumber(state[1]) or 0
local last_leak = tonumber(state[2]) or now_s

local elapsed = math.max(0, now_s - last_leak)
level = math.max(0, level - elapsed * leak_rate)

local allowed = 0
local retry_after = 0

if level + increment <= capacity then
    level = level + increment
    allowed = 1
else
    retry_after = math.ceil((level + increment - capacity) / leak_rate)
end

redis.call('HMSET', key, 'level', level, 'last_leak', now_s)
redis.call('EXPIRE', key, math.ceil(capacity / leak_rate) + 10)

return {allowed, math.floor(capacity - level), retry_after}
"#,
    )
});
