/// Read-through caching for catalog lookups.
///
/// Checks Redis for the given key first and returns the cached value on a
/// hit. On a miss, runs the provided async block, hands the result to the
/// background cache writer, and returns it.
///
/// # Arguments
/// * `$cache`: a [`crate::db::Cache`] instance.
/// * `$key`: the [`crate::db::CacheKey`] to store the value under.
/// * `$ttl`: time-to-live for the cached value, in seconds.
/// * `$block`: async block producing the value when not cached.
///
/// # Example
/// ```rust,ignore
/// let page = cached!(self.cache, CacheKey::Popular(page), LIST_CACHE_TTL, async move {
///     self.fetch_popular(page).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        if let Some(cached) = $cache.get_from_cache(&$key).await? {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&$key, &value, $ttl);
            Ok(value)
        }
    }};
}
