//! Build script for smartspace
//!
//! Migrations are embedded with `sqlx::migrate!`, so the crate has to be
//! rebuilt whenever a migration file is added or edited.

fn main() {
    println!("cargo:rerun-if-changed=migrations");
}
