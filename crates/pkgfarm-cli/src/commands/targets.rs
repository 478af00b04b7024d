//! Target listing

use pkgfarm_core::default_targets;

/// Print the default targets, one per line, in build order
pub fn list_targets() {
    for target in default_targets() {
        println!("{target}");
    }
}
