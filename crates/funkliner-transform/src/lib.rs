//! Source-to-source inlining for JavaScript
//!
//! A library script is crawled into a static model of its objects and
//! functions. Call sites in a snippet that resolve against that model are
//! replaced by the callee's body with parameters substituted:
//! - Direct and `.call` invocations are inlined in place
//! - Counting `for` loops with constant bounds are unrolled
//! - Calls through a computed member become a `switch` over the known members
//!
//! Everything that cannot be resolved is copied through byte for byte.
//!
//! ```
//! use funkliner_transform::inline_single;
//!
//! let library = "function add(one, two) { return one + two; }";
//! assert_eq!(inline_single("var x = add(1,2);", library).unwrap(), "var x = (1 + 2);");
//! ```

pub mod env;
pub mod inliner;
pub mod library;
pub mod path;
pub mod rewrite;
mod snippet;
pub mod splice;
pub mod switch;
pub mod unroll;

// Re-export the entry points
pub use inliner::{
    inline_single, InlineError, InlineOptions, InlineOutput, InlineStats, Inliner, SourceRole,
    SourceText, DEFAULT_MAX_EXPANSIONS, DEFAULT_MAX_UNROLL,
};
