//! Final argument list for one registry entry.

use silinspector_shared::CompileOptions;

/// Flag that makes the front end treat the input as a library file.
pub const PARSE_AS_LIBRARY_FLAG: &str = "-parse-as-library";

/// Flag introducing the module name.
pub const MODULE_NAME_FLAG: &str = "-module-name";

/// Single-file optimization flag.
pub const OPTIMIZE_FLAG: &str = "-O";

/// Whole-module optimization flag.
pub const WHOLE_MODULE_FLAG: &str = "-whole-module-optimization";

/// Append option flags to a base template.
///
/// Flags always follow the template, in this order: library parsing
/// (with `module_name`), optimization, whole-module optimization.
pub fn build_args(base: &[String], options: &CompileOptions, module_name: &str) -> Vec<String> {
    let mut args = base.to_vec();
    if options.parse_as_library {
        args.push(PARSE_AS_LIBRARY_FLAG.to_string());
        args.push(MODULE_NAME_FLAG.to_string());
        args.push(module_name.to_string());
    }
    if options.optimize {
        args.push(OPTIMIZE_FLAG.to_string());
    }
    if options.module_optimize {
        args.push(WHOLE_MODULE_FLAG.to_string());
    }
    args
}
