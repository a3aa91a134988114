//! Repository traits and implementations.

pub mod arch;
pub mod builder;
pub mod job;
pub mod package;
pub mod user;

pub use arch::{ArchRecord, ArchRepo, PgArchRepo};
pub use builder::{BuilderRecord, BuilderRepo, NewBuilder, PgBuilderRepo};
pub use job::{JobRecord, JobRepo, NewJob, PgJobRepo};
pub use package::{
    BinaryRecord, CheckRecord, NewBinary, NewCheck, NewSource, PackageRepo, PgPackageRepo,
    SourceRecord,
};
pub use user::{NewUser, PgUserRepo, UserRecord, UserRepo};
