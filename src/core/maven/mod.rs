mod descriptor;
mod meta;
mod resolver;

pub use descriptor::DependencyDescriptor;
pub use meta::{MetaConfig, META_RESOURCE};
pub use resolver::{
    DescriptorOutcome, DescriptorReport, FetchFailure, ReconcileReport, RepositoryResolver,
    ResolverOptions,
};

/// Extension of every artifact fetched and cached.
pub const ARCHIVE_EXTENSION: &str = "jar";
