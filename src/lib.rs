//! Workspace root package.
//!
//! Carries no code of its own; it exists so shared dev tooling (git hooks via
//! cargo-husky) is installed when any workspace member is built.
