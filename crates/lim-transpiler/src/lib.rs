//! LIM transpiler: converts a document of literal text interleaved with
//! `<?lua ... ?>` blocks into one Lua program.
//!
//! ```text
//! Hello <?lua for i = 1, 2 do ?>x<?lua end ?>
//! ```
//! becomes
//! ```text
//! __lim_text([[
//! Hello ]]); for i = 1, 2 do
//! __lim_text([[
//! x]]); end
//! ```
//!
//! Literal text turns into calls to [`TEXT_PRIMITIVE`], so script control
//! flow spans the text between blocks. A [`LineMap`] built alongside the
//! program translates engine line numbers back to the document.

pub mod escape;
pub mod line_map;
pub mod scanner;

pub use line_map::LineMap;
pub use scanner::{transpile, Transpiled};

/// Opens a script block.
pub const OPEN_MARKER: &[u8] = b"<?lua";

/// Closes a script block.
pub const CLOSE_MARKER: &[u8] = b"?>";

/// Name of the primitive generated programs call for literal text.
///
/// It receives the escaped text and decodes it with [`escape::decode`].
pub const TEXT_PRIMITIVE: &str = "__lim_text";
