//! Schema migrations: load the on-disk definition of an index and reconcile
//! the live index with it.

pub mod bundle;
pub mod migrator;
pub mod reconcile;

pub use bundle::SchemaBundle;
pub use migrator::Migrator;
