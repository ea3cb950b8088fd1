//! Liquibase YAML changelog generation from record fixtures.

pub mod changelog;
pub mod fixture;

pub use changelog::{write_changelog, ChangeLog, ChangeSet, ChangeSetEntry, Column, ColumnEntry};
pub use fixture::{
    build_changelog, changeset_id, load_fixture_spec, load_records, ColumnSpec, Encoding,
    FixtureSpec,
};
