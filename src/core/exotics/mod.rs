//! Objects whose essential internal methods deviate from the ordinary ones.

mod arguments;
pub use arguments::*;

mod array;
pub use array::*;

mod namespace;
pub use namespace::*;

mod string;
pub use string::*;
