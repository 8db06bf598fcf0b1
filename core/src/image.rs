//! Declarative image-fetch descriptors for the image-loading collaborator.
//!
//! Nothing here touches the network: an `ImageRequest` only tells the loader
//! what to fetch, which cache keys to use and what to show when there is
//! nothing to fetch or the fetch fails.

/// Resource shown when an image is absent or fails to load.
pub const DEFAULT_PLACEHOLDER: &str = "ic_no_image_available";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    Enabled,
    ReadOnly,
    WriteOnly,
    Disabled,
}

/// Base context shared by every request built for one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageContext {
    pub placeholder: String,
}

impl Default for ImageContext {
    fn default() -> Self {
        Self {
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub data: Option<String>,
    pub memory_cache_key: Option<String>,
    pub disk_cache_key: Option<String>,
    /// Shown when the fetch fails.
    pub error_placeholder: String,
    /// Shown when `data` is absent.
    pub fallback_placeholder: String,
    pub crossfade: bool,
    pub memory_cache_policy: CachePolicy,
    pub disk_cache_policy: CachePolicy,
}

/// What the loader should display before any fetch outcome is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource<'a> {
    Url(&'a str),
    Placeholder(&'a str),
}

impl ImageRequest {
    pub fn source(&self) -> ImageSource<'_> {
        match self.data.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => ImageSource::Url(url),
            _ => ImageSource::Placeholder(&self.fallback_placeholder),
        }
    }
}

/// Both cache keys are the URL itself, so the same URL always hits the same
/// memory and disk entries.
pub fn build_image_request(context: &ImageContext, url: Option<&str>) -> ImageRequest {
    let url = url.map(str::to_string);
    ImageRequest {
        memory_cache_key: url.clone(),
        disk_cache_key: url.clone(),
        data: url,
        error_placeholder: context.placeholder.clone(),
        fallback_placeholder: context.placeholder.clone(),
        crossfade: true,
        memory_cache_policy: CachePolicy::Enabled,
        disk_cache_policy: CachePolicy::Enabled,
    }
}
