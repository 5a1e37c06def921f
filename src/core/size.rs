//! Program size report
//!
//! Parses the output of `recipe.size.pattern` with the platform's size
//! regexes and formats the familiar storage and memory usage lines.

use regex::Regex;

use crate::config::defaults::{DEFAULT_MAXIMUM_DATA_SIZE, DEFAULT_MAXIMUM_SIZE};
use crate::core::properties::Properties;
use crate::core::recipe::{RecipeCommands, SIZE_REGEX, SIZE_REGEX_DATA, SIZE_REGEX_EEPROM};
use crate::error::PlanError;

/// Format an integer with `,` thousands separators
pub fn thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if n < 0 {
        out.insert(0, '-');
    }
    out
}

fn compile(pattern: &str) -> Result<Regex, PlanError> {
    Regex::new(&format!("(?m){pattern}")).map_err(|e| PlanError::SizePattern {
        pattern: pattern.to_string(),
        error: e.to_string(),
    })
}

fn number(s: Option<regex::Match<'_>>) -> i64 {
    s.and_then(|m| m.as_str().trim().parse().ok()).unwrap_or(0)
}

/// Which capture groups feed a multi-group size regex
#[derive(Clone, Copy)]
enum Groups {
    /// Groups 1 and 2 of the first match
    FirstTwo,
    /// Every group after the first, of the first match
    AfterFirst,
}

/// Sum the numbers a size regex captures
///
/// With at most one capture group every match is summed. With more groups
/// only the first match counts and `groups` picks which of its groups.
fn measure(re: &Regex, text: &str, groups: Groups) -> Option<i64> {
    let group_count = re.captures_len() - 1;
    if group_count <= 1 {
        let mut found = false;
        let total: i64 = re
            .captures_iter(text)
            .map(|caps| {
                found = true;
                number(caps.get(group_count))
            })
            .sum();
        return found.then_some(total);
    }

    let caps = re.captures(text)?;
    let range = match groups {
        Groups::FirstTwo => 1..=2,
        Groups::AfterFirst => 2..=group_count,
    };
    Some(range.map(|i| number(caps.get(i))).sum())
}

fn percent(part: i64, whole: i64) -> String {
    if whole == 0 {
        return "0.0".to_string();
    }
    #[allow(clippy::cast_precision_loss)]
    let pct = part as f64 / whole as f64 * 100.0;
    format!("{pct:.1}")
}

fn maximum(board: &Properties, key: &str, default: u64) -> i64 {
    let value = board
        .get(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default);
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Report lines for the output of the size command
pub fn size_report(
    output: &str,
    recipes: &RecipeCommands,
    board: &Properties,
) -> Result<Vec<String>, PlanError> {
    let mut lines = Vec::new();
    let max_size = maximum(board, "upload.maximum_size", DEFAULT_MAXIMUM_SIZE);
    let max_data = maximum(board, "upload.maximum_data_size", DEFAULT_MAXIMUM_DATA_SIZE);

    if let Some(pattern) = recipes.get(SIZE_REGEX) {
        if let Some(size) = measure(&compile(pattern)?, output, Groups::FirstTwo) {
            lines.push(format!(
                "Sketch uses {} bytes ({}%) of program storage space. Maximum is {} bytes.",
                thousands(size),
                percent(size, max_size),
                thousands(max_size)
            ));
        }
    }

    if let Some(pattern) = recipes.get(SIZE_REGEX_DATA) {
        if let Some(data) = measure(&compile(pattern)?, output, Groups::AfterFirst) {
            lines.push(format!(
                "Global variables use {} bytes ({}%) of dynamic memory, leaving {} bytes for local variables. Maximum is {} bytes.",
                thousands(data),
                percent(data, max_data),
                thousands(max_data - data),
                thousands(max_data)
            ));
        }
    }

    if let Some(pattern) = recipes.get(SIZE_REGEX_EEPROM) {
        if let Some(eeprom) = measure(&compile(pattern)?, output, Groups::AfterFirst) {
            if eeprom > 0 {
                lines.push(format!("EEPROM uses {} bytes.", thousands(eeprom)));
            }
        }
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const AVR_SIZE_OUTPUT: &str = "\
/tmp/build/Blink.elf  :
section                     size      addr
.data                          0   8388864
.text                        924         0
.bss                           9   8388864
.comment                      17         0
Total                       1983
";

    fn avr_recipes() -> RecipeCommands {
        RecipeCommands::from_properties(Properties::parse(
            r"recipe.size.regex=^(?:\.text|\.data|\.bootloader)\s+([0-9]+).*
recipe.size.regex.data=^(?:\.data|\.bss|\.noinit)\s+([0-9]+).*
recipe.size.regex.eeprom=^(?:\.eeprom)\s+([0-9]+).*",
        ))
    }

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(253_952), "253,952");
        assert_eq!(thousands(1_234_567), "1,234,567");
        assert_eq!(thousands(-2048), "-2,048");
    }

    #[test]
    fn test_avr_report_with_board_limits() {
        let board = Properties::parse("upload.maximum_size=32256\nupload.maximum_data_size=2048");
        let lines = size_report(AVR_SIZE_OUTPUT, &avr_recipes(), &board).unwrap();
        assert_eq!(
            lines,
            vec![
                "Sketch uses 924 bytes (2.9%) of program storage space. Maximum is 32,256 bytes.",
                "Global variables use 9 bytes (0.4%) of dynamic memory, leaving 2,039 bytes for local variables. Maximum is 2,048 bytes.",
            ]
        );
    }

    #[test]
    fn test_default_limits() {
        let lines = size_report(AVR_SIZE_OUTPUT, &avr_recipes(), &Properties::new()).unwrap();
        assert!(lines[0].ends_with("Maximum is 253,952 bytes."));
        assert!(lines[1].ends_with("Maximum is 10,000 bytes."));
    }

    #[test]
    fn test_multi_group_regex_uses_first_match() {
        let recipes = RecipeCommands::from_properties(Properties::parse(
            r"recipe.size.regex=\s+([0-9]+)\s+([0-9]+)\s+([0-9]+)\s+[0-9]+\s+[0-9a-f]+\s+
recipe.size.regex.data=\s+([0-9]+)\s+([0-9]+)\s+([0-9]+)\s+[0-9]+\s+[0-9a-f]+\s+",
        ));
        let output = "   text    data     bss     dec     hex filename\n  10000    2000     500   12500    30d4 app.elf\n";
        let lines = size_report(output, &recipes, &Properties::new()).unwrap();
        assert!(lines[0].starts_with("Sketch uses 12,000 bytes"));
        assert!(lines[1].starts_with("Global variables use 2,500 bytes"));
    }

    #[test]
    fn test_no_match_emits_nothing() {
        let lines = size_report("garbage", &avr_recipes(), &Properties::new()).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn test_bad_regex_is_error() {
        let recipes = RecipeCommands::from_properties(Properties::parse("recipe.size.regex=(["));
        assert!(matches!(
            size_report("", &recipes, &Properties::new()),
            Err(PlanError::SizePattern { .. })
        ));
    }

    // ============================================
    // Property-Based Tests
    // ============================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Removing the separators gives back the plain number
        #[test]
        fn prop_thousands_strips_to_number(n in any::<i64>().prop_filter("no MIN", |n| *n != i64::MIN)) {
            let formatted = thousands(n);
            prop_assert_eq!(formatted.replace(',', "").parse::<i64>().unwrap(), n);
            for group in formatted.trim_start_matches('-').split(',').skip(1) {
                prop_assert_eq!(group.len(), 3);
            }
        }
    }
}
