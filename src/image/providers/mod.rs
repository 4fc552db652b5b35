//! Image generation providers.

mod pollinations;

pub use pollinations::{
    PollinationsProvider, PollinationsProviderBuilder, DEFAULT_BASE_URL, DEFAULT_TIMEOUT,
};
