//! Recipe command mapping
//!
//! Recipes are the `recipe.*.pattern` entries of a platform's `platform.txt`.
//! Their `{key}` references are resolved against the merged platform, board,
//! programmer and runtime properties. References with no value, such as the
//! per-file `{source_file}`, are left in place for the build planner.

use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::config::defaults::RECIPE_EXPANSION_PASSES;
use crate::core::properties::Properties;

/// C++ compile recipe
pub const CPP_PATTERN: &str = "recipe.cpp.o.pattern";
/// C compile recipe
pub const C_PATTERN: &str = "recipe.c.o.pattern";
/// Assembler recipe
pub const ASM_PATTERN: &str = "recipe.S.o.pattern";
/// Archive recipe
pub const AR_PATTERN: &str = "recipe.ar.pattern";
/// Link recipe
pub const COMBINE_PATTERN: &str = "recipe.c.combine.pattern";
/// EEPROM image recipe
pub const OBJCOPY_EEP_PATTERN: &str = "recipe.objcopy.eep.pattern";
/// HEX image recipe
pub const OBJCOPY_HEX_PATTERN: &str = "recipe.objcopy.hex.pattern";
/// BIN image recipe
pub const OBJCOPY_BIN_PATTERN: &str = "recipe.objcopy.bin.pattern";
/// Size recipe
pub const SIZE_PATTERN: &str = "recipe.size.pattern";
/// Program size regex
pub const SIZE_REGEX: &str = "recipe.size.regex";
/// Data size regex
pub const SIZE_REGEX_DATA: &str = "recipe.size.regex.data";
/// EEPROM size regex
pub const SIZE_REGEX_EEPROM: &str = "recipe.size.regex.eeprom";
/// Upload recipe
pub const UPLOAD_PATTERN: &str = "upload.pattern";
/// Output file naming
pub const OUTPUT_SAVE_FILE: &str = "recipe.output.save_file";

fn placeholder_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^{}\s]+)\}").ok()).as_ref()
}

/// Replace every `{key}` that has a value in `props`; one pass
pub fn expand_once(value: &str, props: &Properties) -> String {
    let Some(re) = placeholder_regex() else {
        return value.to_string();
    };
    re.replace_all(value, |caps: &Captures<'_>| {
        props
            .get(&caps[1])
            .map_or_else(|| caps[0].to_string(), str::to_string)
    })
    .into_owned()
}

/// Fully expanded command mapping of the active toolchain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeCommands {
    props: Properties,
}

impl RecipeCommands {
    /// Merge property layers (later wins) and expand references
    ///
    /// When `upload.tool` names a tool, the `tools.<tool>.` subtree is laid
    /// over the result, which is how `upload.pattern` gets defined.
    pub fn resolve(layers: &[&Properties]) -> Self {
        let mut merged = Properties::new();
        for layer in layers {
            merged.extend(layer);
        }
        if let Some(tool) = merged.get("upload.tool").map(str::to_string) {
            let overlay = merged.subtree(&format!("tools.{tool}"));
            merged.extend(&overlay);
        }

        for pass in 0..RECIPE_EXPANSION_PASSES {
            let mut next = Properties::new();
            let mut changed = false;
            for (key, value) in merged.iter() {
                let expanded = expand_once(value, &merged);
                changed |= expanded != value;
                next.insert(key, expanded);
            }
            merged = next;
            if !changed {
                tracing::trace!("Recipes settled after {pass} pass(es)");
                break;
            }
        }

        Self { props: merged }
    }

    /// Use already expanded properties as-is
    pub fn from_properties(props: Properties) -> Self {
        Self { props }
    }

    /// Look up a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.props.get(key).filter(|v| !v.is_empty())
    }

    /// Underlying properties
    pub fn properties(&self) -> &Properties {
        &self.props
    }
}
