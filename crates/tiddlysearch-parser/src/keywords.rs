//! Reserved, case-sensitive operator keywords.
//!
//! Unlike a general-purpose SQL lexer, the query language here has exactly
//! four reserved words, and all of them are infix/prefix boolean operators
//! or range connectives. They are kept in one place, declared with a small
//! macro, so the set stays exhaustive and is not rediscovered by grepping
//! match arms.
//!
//! Operator keywords are case-sensitive: `and` and `And` are ordinary
//! search words, only `AND` is the infix operator — `consume_bounded_literal`
//! is what enforces that at the call site.

macro_rules! kw_def {
    ($ident:ident) => {
        pub const $ident: &str = stringify!($ident);
    };
}

macro_rules! define_keywords {
    ($($ident:ident),* $(,)?) => {
        $(kw_def!($ident);)*
    };
}

define_keywords!(AND, OR, NOT, TO);
