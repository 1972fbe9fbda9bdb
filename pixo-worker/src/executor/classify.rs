//! Maps free-text codec failures onto [`ErrorType`].
//!
//! The codec only reports a message, so the category is inferred from it.
//! Matching is case-sensitive and runtime-initialization indicators win over
//! memory indicators.

use crate::protocol::ErrorType;

/// Substrings that indicate the codec runtime could not start.
const WASM_INIT_MARKERS: [&str; 2] = ["WASM", "module"];

/// Substrings that indicate memory exhaustion.
const OUT_OF_MEMORY_MARKERS: [&str; 2] = ["memory", "allocation"];

/// Classifies a failure message.
///
/// # Example
///
/// ```
/// use pixo_worker::executor::classify;
/// use pixo_worker::protocol::ErrorType;
///
/// assert_eq!(classify("WASM module failed to load"), ErrorType::WasmInit);
/// assert_eq!(classify("allocation of 4 GiB refused"), ErrorType::OutOfMemory);
/// assert_eq!(classify("unexpected end of data"), ErrorType::Unknown);
/// ```
pub fn classify(message: &str) -> ErrorType {
    if contains_any(message, &WASM_INIT_MARKERS) {
        ErrorType::WasmInit
    } else if contains_any(message, &OUT_OF_MEMORY_MARKERS) {
        ErrorType::OutOfMemory
    } else {
        ErrorType::Unknown
    }
}

fn contains_any(message: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| message.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wasm_marker() {
        assert_eq!(classify("WASM module failed to load"), ErrorType::WasmInit);
        assert_eq!(classify("failed to instantiate WASM"), ErrorType::WasmInit);
    }

    #[test]
    fn test_module_marker() {
        assert_eq!(classify("module not found"), ErrorType::WasmInit);
    }

    #[test]
    fn test_memory_markers() {
        assert_eq!(classify("out of memory"), ErrorType::OutOfMemory);
        assert_eq!(classify("allocation failed"), ErrorType::OutOfMemory);
    }

    #[test]
    fn test_wasm_checked_before_memory() {
        assert_eq!(
            classify("module ran out of memory during init"),
            ErrorType::WasmInit
        );
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert_eq!(classify("wasm trap"), ErrorType::Unknown);
        assert_eq!(classify("Memory exhausted"), ErrorType::Unknown);
        assert_eq!(classify("Module missing"), ErrorType::Unknown);
    }

    #[test]
    fn test_unknown() {
        assert_eq!(classify(""), ErrorType::Unknown);
        assert_eq!(classify("invalid quality 0"), ErrorType::Unknown);
    }

    #[test]
    fn test_codec_limit_message_is_out_of_memory() {
        assert_eq!(
            classify("memory limit exceeded: 20000×20000 needs 400000000 pixels"),
            ErrorType::OutOfMemory
        );
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_wasm_marker_always_wins(
                prefix in "[a-z ]{0,16}",
                suffix in "[a-z ]{0,16}",
                marker in prop::sample::select(vec!["WASM", "module"]),
            ) {
                let message = format!("{}{}{}", prefix, marker, suffix);
                prop_assert_eq!(classify(&message), ErrorType::WasmInit);
            }

            #[test]
            fn test_memory_marker_without_wasm_marker(
                prefix in "[A-Z0-9 ]{0,16}",
                suffix in "[A-Z0-9 ]{0,16}",
                marker in prop::sample::select(vec!["memory", "allocation"]),
            ) {
                // Uppercase-and-digit noise cannot spell "module"; "WASM" is excluded below.
                let message = format!("{}{}{}", prefix, marker, suffix);
                prop_assume!(!message.contains("WASM"));
                prop_assert_eq!(classify(&message), ErrorType::OutOfMemory);
            }

            #[test]
            fn test_no_marker_is_unknown(message in "[0-9 ._:-]{0,64}") {
                prop_assert_eq!(classify(&message), ErrorType::Unknown);
            }
        }
    }
}
