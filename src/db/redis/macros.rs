/// Read-through caching for provider calls.
///
/// Returns the cached value when one exists under `$key`. Otherwise awaits
/// `$block`, queues the result for storage with `$ttl` seconds to live, and
/// returns it. Cache read failures count as misses, so an unavailable Redis
/// only costs an upstream call.
///
/// # Example
/// ```rust,ignore
/// cached!(self.cache, CacheKey::Genres, GENRE_CACHE_TTL, async move {
///     fetch_genres().await
/// })
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        if let Some(cached) = $cache.lookup(&key).await {
            tracing::debug!(key = %key, "Cache hit");
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&key, &value, $ttl);
            Ok(value)
        }
    }};
}
