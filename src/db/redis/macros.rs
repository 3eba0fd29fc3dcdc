/// Wraps a fallible async computation with an optional Redis cache.
///
/// With `None` the computation always runs. With `Some(cache)` a hit is
/// returned directly; a miss runs the computation and queues the result for
/// writing. A cache read failure is logged and treated as a miss.
///
/// # Arguments
/// * `$cache`: an `Option<Cache>` (or anything with `.as_ref()` to one).
/// * `$key`: the `CacheKey` for the value.
/// * `$ttl`: time-to-live in seconds.
/// * `$fut`: the future computing the value on a miss.
///
/// # Example
/// ```rust,ignore
/// let page = cached!(self.cache, CacheKey::Popular(page), LIST_TTL, self.get_json(url, &[]))?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $fut:expr) => {{
        let key = $key;
        match $cache.as_ref() {
            Some(cache) => {
                let hit = match cache.get_from_cache(&key).await {
                    Ok(hit) => hit,
                    Err(e) => {
                        tracing::warn!(error = %e, key = %key, "Cache read failed, bypassing");
                        None
                    }
                };
                match hit {
                    Some(value) => Ok(value),
                    None => match $fut.await {
                        Ok(value) => {
                            cache.set_in_background(&key, &value, $ttl);
                            Ok(value)
                        }
                        Err(e) => Err(e),
                    },
                }
            }
            None => $fut.await,
        }
    }};
}
