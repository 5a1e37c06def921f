//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Dotted numeric version, `1` to `1.2.3.4`
    pub fn version_string() -> impl Strategy<Value = String> {
        "[0-9]{1,2}(\\.[0-9]{1,2}){0,3}"
    }

    /// Version with an optional pre-release or vendor suffix
    pub fn index_version() -> impl Strategy<Value = String> {
        (version_string(), prop::option::of("-(arduino|rc|beta)[0-9]"))
            .prop_map(|(v, suffix)| format!("{v}{}", suffix.unwrap_or_default()))
    }

    /// Host triplet as found in tool download entries
    pub fn host_triplet() -> impl Strategy<Value = String> {
        (
            prop_oneof![
                Just("i686"),
                Just("x86_64"),
                Just("arm"),
                Just("aarch64"),
                Just("i386"),
            ],
            prop_oneof![
                Just("pc-linux-gnu"),
                Just("linux-gnueabihf"),
                Just("mingw32"),
                Just("w64-mingw32"),
                Just("apple-darwin"),
                Just("apple-darwin11"),
                Just("unknown-freebsd"),
            ],
        )
            .prop_map(|(arch, rest)| format!("{arch}-{rest}"))
    }

    /// Header file name
    pub fn header_name() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9_]{0,12}\\.(h|hpp)"
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_version_string_generator(version in version_string()) {
            for part in version.split('.') {
                prop_assert!(part.parse::<u32>().is_ok());
            }
        }

        #[test]
        fn test_host_triplet_generator(triplet in host_triplet()) {
            prop_assert!(triplet.split('-').count() >= 2);
        }

        #[test]
        fn test_header_name_generator(name in header_name()) {
            prop_assert!(name.ends_with(".h") || name.ends_with(".hpp"));
        }
    }
}
