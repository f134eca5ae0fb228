/// Read-through caching for lookups that may find nothing.
///
/// Checks the cache first and returns `Ok(Some(hit))` on a hit. On a miss it
/// awaits `$block` (which must yield `AppResult<Option<T>>`), queues a cache
/// write when the lookup found something, and returns the lookup result.
/// Misses are never cached, so a film or user created later shows up at once.
/// A failing cache read is logged and treated as a miss.
///
/// # Arguments
/// * `$cache`: a `Cache` (needs `get_from_cache` and `set_in_background`).
/// * `$key`: the `CacheKey` to read and write.
/// * `$block`: future computing the value on a miss.
///
/// # Example
/// ```rust,ignore
/// let summary = cached_some!(self.cache, CacheKey::FilmSummary(id.to_string()),
///     self.inner.summarize(id))?;
/// ```
#[macro_export]
macro_rules! cached_some {
    ($cache:expr, $key:expr, $block:expr) => {{
        let key = $key;
        let hit = match $cache.get_from_cache(&key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Cache read failed, falling through");
                None
            }
        };

        match hit {
            Some(cached) => Ok(Some(cached)),
            None => match $block.await {
                Ok(Some(value)) => {
                    $cache.set_in_background(&key, &value);
                    Ok(Some(value))
                }
                other => other,
            },
        }
    }};
}
