/// C++ front-end: parsing, the symbol model, name lookup and expression
/// typing.
///
/// Documents are parsed with tree-sitter into an arena of symbols and a
/// tree of scopes ([`document`], [`symbols`]).  Qt's dialect (`signals:`,
/// `Q_OBJECT`, `SIGNAL(...)`) is masked before parsing and its annotations
/// re-attached afterwards ([`qt`]).  Parsed documents are published in an
/// immutable [`snapshot::Snapshot`]; a completion cycle builds a
/// [`lookup::LookupContext`] over the current document and its include
/// chain and asks it for the types of expressions ([`expression`]).
pub mod document;
pub mod expression;
pub mod lookup;
pub mod overview;
pub mod parser;
pub mod qt;
pub mod snapshot;
pub mod symbols;
