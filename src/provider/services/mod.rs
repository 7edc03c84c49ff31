//! Provider construction and resolution services.

mod factory;
mod registry;

pub use factory::ProviderFactory;
pub use registry::ProviderRegistry;
